//! Synthetic history for trying out the statistics views.

use crate::calendar::Day;
use crate::store::stamp;
use dnb_core::{DetectionCounts, Mode, SessionResult, StoredSession};
use dnb_session::scoring::accuracy;
use dnb_session::{adapt, combine_d_prime, d_prime};
use rand::Rng;

const DEMO_TRIALS: usize = 25;
const DEMO_INTERVAL_MS: u64 = 3000;
const DEMO_MAX_N: u32 = 8;

fn demo_counts<R: Rng + ?Sized>(rng: &mut R, scoreable: u32) -> DetectionCounts {
    let target_accuracy = rng.random_range(40..95u32);
    let matches = rng.random_range(5..=8u32).min(scoreable);
    let hits = ((matches * target_accuracy) as f64 / 100.0).round() as u32;
    let false_alarms = rng.random_range(0..3u32).min(scoreable - matches);
    DetectionCounts {
        hits,
        misses: matches - hits,
        false_alarms,
        correct_rejects: scoreable - matches - false_alarms,
    }
}

fn demo_result<R: Rng + ?Sized>(rng: &mut R, n_level: u32) -> SessionResult {
    let scoreable = DEMO_TRIALS as u32 - n_level;
    let position = demo_counts(rng, scoreable);
    let audio = demo_counts(rng, scoreable);
    let overall_accuracy = accuracy(&position.merged(&audio));
    let (adaptation, new_n_level) = adapt(Mode::Adaptive, n_level, overall_accuracy);
    let position_d_prime = d_prime(&position);
    let audio_d_prime = d_prime(&audio);

    SessionResult {
        n_level,
        trials: DEMO_TRIALS,
        interval_ms: DEMO_INTERVAL_MS,
        mode: Mode::Adaptive,
        position_accuracy: accuracy(&position),
        audio_accuracy: accuracy(&audio),
        overall_accuracy,
        avg_reaction_time_ms: Some(rng.random_range(400..1200)),
        position,
        audio,
        position_d_prime,
        audio_d_prime,
        overall_d_prime: combine_d_prime(position_d_prime, audio_d_prime),
        adaptation,
        new_n_level: new_n_level.min(DEMO_MAX_N),
    }
}

/// One to three sessions a day over the `days` days ending at `today`,
/// with N following the adaptive rule from 2.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, days: u32, today: Day) -> Vec<StoredSession> {
    let mut sessions = Vec::new();
    let mut n_level = 2;

    for back in (0..days as i64).rev() {
        let day = today.offset(-back);
        let mut minutes: Vec<u64> = (0..rng.random_range(1..=3))
            .map(|_| rng.random_range(9 * 60..21 * 60))
            .collect();
        minutes.sort_unstable();

        for minute in minutes {
            let result = demo_result(rng, n_level);
            n_level = result.new_n_level;
            sessions.push(stamp(&result, day.start_ms() + minute * 60_000));
        }
    }
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn demo_history_is_plausible() {
        let mut rng = StdRng::seed_from_u64(11);
        let today = Day::from_civil(2026, 5, 1);
        let sessions = generate(&mut rng, 14, today);

        assert!(sessions.len() >= 14 && sessions.len() <= 42);
        assert!(sessions.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
        assert_eq!(Day::parse(&sessions[0].date), Some(today.offset(-13)));

        for pair in sessions.windows(2) {
            assert_eq!(pair[1].result.n_level, pair[0].result.new_n_level);
        }
        for s in &sessions {
            let r = &s.result;
            assert!((1..=DEMO_MAX_N).contains(&r.n_level));
            assert_eq!(r.position.signal_total() + r.position.noise_total(), 25 - r.n_level);
            assert!(r.position_d_prime.is_some());
        }
    }
}
