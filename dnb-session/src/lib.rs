pub mod aggregate;
pub mod config;
pub mod scoring;
pub mod sequence;
pub mod state;

pub use aggregate::{adapt, summarize};
pub use config::{SessionConfig, StartError};
pub use scoring::{SessionStats, combine_d_prime, d_prime, inverse_normal_cdf};
pub use sequence::{TARGET_RATE, TrialPlan};
pub use state::{NBackSession, SessionEvent, SessionSummary};
