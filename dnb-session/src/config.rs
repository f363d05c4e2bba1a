use dnb_core::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_N_LEVEL: u32 = 1;
pub const MAX_N_LEVEL: u32 = 15;
/// Blank tail of every trial interval
pub const INTER_TRIAL_GAP_MS: u64 = 350;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub n_level: u32,
    pub total_trials: usize,
    pub interval_ms: u64,
    pub mode: Mode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n_level: 2,
            total_trials: 25,
            interval_ms: 3000,
            mode: Mode::Adaptive,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), StartError> {
        if !is_valid_n_level(self.n_level) {
            return Err(StartError::NLevelOutOfRange(self.n_level));
        }
        if self.total_trials == 0 {
            return Err(StartError::NoTrials);
        }
        if self.interval_ms <= INTER_TRIAL_GAP_MS {
            return Err(StartError::IntervalTooShort(self.interval_ms));
        }
        Ok(())
    }

    /// How long the stimulus stays up, i.e. the response window
    pub fn display_ms(&self) -> u64 {
        self.interval_ms.saturating_sub(INTER_TRIAL_GAP_MS)
    }
}

pub fn is_valid_n_level(n: u32) -> bool {
    (MIN_N_LEVEL..=MAX_N_LEVEL).contains(&n)
}

/// Why a session refused to start. The scheduler is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    AlreadyRunning,
    NLevelOutOfRange(u32),
    NoTrials,
    IntervalTooShort(u64),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::AlreadyRunning => f.write_str("a session is already running"),
            StartError::NLevelOutOfRange(n) => write!(
                f,
                "n level {n} outside {MIN_N_LEVEL}..={MAX_N_LEVEL}"
            ),
            StartError::NoTrials => f.write_str("a session needs at least one trial"),
            StartError::IntervalTooShort(ms) => write!(
                f,
                "interval of {ms} ms leaves no display time after the {INTER_TRIAL_GAP_MS} ms gap"
            ),
        }
    }
}

impl std::error::Error for StartError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.display_ms(), 2650);
    }

    #[test]
    fn rejects_n_level_outside_range() {
        for n in [0, 16] {
            let config = SessionConfig {
                n_level: n,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(StartError::NLevelOutOfRange(n)));
        }
    }

    #[test]
    fn rejects_interval_without_display_time() {
        let config = SessionConfig {
            interval_ms: 350,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(StartError::IntervalTooShort(350)));
    }
}
