use crate::config::{MAX_N_LEVEL, MIN_N_LEVEL, SessionConfig};
use crate::scoring::SessionStats;
use dnb_core::{Adaptation, Mode, SessionResult};

/// Overall accuracy at or above which N goes up
pub const LEVEL_UP_ACCURACY: u32 = 80;
/// Overall accuracy below which N goes down
pub const LEVEL_DOWN_ACCURACY: u32 = 50;

/// Next N level given the session's overall accuracy.
///
/// Manual mode and sessions without a measurable accuracy keep the level.
pub fn adapt(mode: Mode, n_level: u32, overall_accuracy: Option<u32>) -> (Adaptation, u32) {
    let Some(acc) = overall_accuracy else {
        return (Adaptation::Stay, n_level);
    };
    match mode {
        Mode::Manual => (Adaptation::Stay, n_level),
        Mode::Adaptive if acc >= LEVEL_UP_ACCURACY => {
            (Adaptation::Up, (n_level + 1).min(MAX_N_LEVEL))
        }
        Mode::Adaptive if acc < LEVEL_DOWN_ACCURACY => (
            Adaptation::Down,
            n_level.saturating_sub(1).max(MIN_N_LEVEL),
        ),
        Mode::Adaptive => (Adaptation::Stay, n_level),
    }
}

/// Freezes the running tallies into the session's result
pub fn summarize(config: &SessionConfig, stats: &SessionStats) -> SessionResult {
    let running = stats.running_stats();
    let (adaptation, new_n_level) = adapt(config.mode, config.n_level, running.overall_accuracy);
    SessionResult {
        n_level: config.n_level,
        trials: config.total_trials,
        interval_ms: config.interval_ms,
        mode: config.mode,
        position_accuracy: running.position_accuracy,
        audio_accuracy: running.audio_accuracy,
        overall_accuracy: running.overall_accuracy,
        avg_reaction_time_ms: running.avg_reaction_time_ms,
        position: running.position,
        audio: running.audio,
        position_d_prime: running.position_d_prime,
        audio_d_prime: running.audio_d_prime,
        overall_d_prime: running.overall_d_prime,
        adaptation,
        new_n_level,
    }
}
