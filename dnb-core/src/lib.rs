pub mod output;
pub mod phase;
pub mod result;
pub mod stimulus;
pub mod trial;

pub use output::{AudioOutput, SessionStore, SilentAudio};
pub use phase::{Phase, SessionState, TrialPhase};
pub use result::{Adaptation, DetectionCounts, Mode, RunningStats, SessionResult, StoredSession};
pub use stimulus::{Letter, Modality, Position, Stimulus};
pub use trial::{Outcome, TrialCue, TrialDetail, TrialResponse};
