use dnb_core::{Mode, StoredSession};
use dnb_session::SessionConfig;
use dnb_session::config::is_valid_n_level;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAILY_GOAL: u32 = 5;

/// User preferences. Unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub n_level: Option<u32>,
    pub trials: Option<usize>,
    pub interval_ms: Option<u64>,
    pub mode: Option<Mode>,
    pub daily_goal: Option<u32>,
}

impl Settings {
    pub fn daily_goal(&self) -> u32 {
        self.daily_goal.unwrap_or(DEFAULT_DAILY_GOAL)
    }

    /// Session config with the stored preferences applied
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            n_level: self
                .n_level
                .filter(|n| is_valid_n_level(*n))
                .unwrap_or(defaults.n_level),
            total_trials: self.trials.unwrap_or(defaults.total_trials),
            interval_ms: self.interval_ms.unwrap_or(defaults.interval_ms),
            mode: self.mode.unwrap_or(defaults.mode),
        }
    }
}

/// Level to resume at: where the most recent session left it
pub fn resume_n_level(sessions: &[StoredSession]) -> Option<u32> {
    sessions
        .iter()
        .max_by_key(|s| s.timestamp_ms)
        .map(|s| s.result.new_n_level)
        .filter(|n| is_valid_n_level(*n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_give_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.session_config(), SessionConfig::default());
        assert_eq!(settings.daily_goal(), 5);
    }

    #[test]
    fn out_of_range_level_is_ignored() {
        let settings = Settings {
            n_level: Some(40),
            interval_ms: Some(2500),
            ..Default::default()
        };
        let config = settings.session_config();
        assert_eq!(config.n_level, 2);
        assert_eq!(config.interval_ms, 2500);
    }

    #[test]
    fn partial_json_deserializes() {
        let settings: Settings = serde_json::from_str(r#"{"daily_goal": 3}"#).unwrap();
        assert_eq!(settings.daily_goal(), 3);
        assert_eq!(settings.mode, None);
    }
}
