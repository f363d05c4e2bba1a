use crate::result::{SessionResult, StoredSession};
use crate::stimulus::Letter;

/// Sound side of the presentation. Calls are fire-and-forget.
pub trait AudioOutput {
    fn speak_letter(&self, letter: Letter);
    fn play_feedback(&self, correct: bool);
    fn play_session_end(&self) {}
}

/// Audio sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

impl AudioOutput for SilentAudio {
    fn speak_letter(&self, _letter: Letter) {}
    fn play_feedback(&self, _correct: bool) {}
}

/// Persistence of finished sessions
pub trait SessionStore: Send + Sync {
    /// Stores `result`, assigning it an id and timestamp
    fn save_session(&self, result: &SessionResult) -> anyhow::Result<StoredSession>;
}
