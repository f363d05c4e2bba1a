//! Signal-detection scoring.
//!
//! Accuracy ignores correct rejects: they dominate a typical session and would
//! push every score towards 100%. Sensitivity is reported as d′ with the
//! 1/(2N) boundary correction.

use crate::sequence::TrialPlan;
use dnb_core::{DetectionCounts, Modality, Outcome, RunningStats, TrialDetail, TrialResponse};

// Acklam's rational approximation of the standard normal quantile
const A: [f64; 6] = [
    -3.969683028665376e1,
    2.209460984245205e2,
    -2.759285104469687e2,
    1.383577518672690e2,
    -3.066479806614716e1,
    2.506628277459239e0,
];
const B: [f64; 5] = [
    -5.447609879822406e1,
    1.615858368580409e2,
    -1.556989798598866e2,
    6.680131188771972e1,
    -1.328068155288572e1,
];
const C: [f64; 6] = [
    -7.784894002430293e-3,
    -3.223964580411365e-1,
    -2.400758277161838e0,
    -2.549732539343734e0,
    4.374664141464968e0,
    2.938163982698783e0,
];
const D: [f64; 4] = [
    7.784695709041462e-3,
    3.224671290700398e-1,
    2.445134137142996e0,
    3.754408661907416e0,
];
const P_LOW: f64 = 0.02425;
const P_HIGH: f64 = 1.0 - P_LOW;
/// Returned for p outside (0, 1)
const Z_SATURATION: f64 = 3.5;

/// Inverse of the standard normal CDF on the open interval (0, 1).
///
/// Inputs at or beyond the bounds saturate at ±3.5 instead of diverging.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p <= 0.0 {
        return -Z_SATURATION;
    }
    if p >= 1.0 {
        return Z_SATURATION;
    }
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        tail(q)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -tail(q)
    }
}

fn tail(q: f64) -> f64 {
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
        / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
}

fn clamp_rate(rate: f64, total: u32) -> f64 {
    let edge = 1.0 / (2.0 * total as f64);
    rate.clamp(edge, 1.0 - edge)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Sensitivity index, or `None` without both signal and noise trials
pub fn d_prime(counts: &DetectionCounts) -> Option<f64> {
    let signal = counts.signal_total();
    let noise = counts.noise_total();
    if signal == 0 || noise == 0 {
        return None;
    }
    let hit_rate = clamp_rate(counts.hits as f64 / signal as f64, signal);
    let fa_rate = clamp_rate(counts.false_alarms as f64 / noise as f64, noise);
    Some(round2(
        inverse_normal_cdf(hit_rate) - inverse_normal_cdf(fa_rate),
    ))
}

/// Mean of whichever values are available
pub fn combine_d_prime(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(round2((a + b) / 2.0)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// Rounded percentage of hits over hits, misses and false alarms
pub fn accuracy(counts: &DetectionCounts) -> Option<u32> {
    let total = counts.strict_total();
    (total > 0).then(|| (counts.hits as f64 / total as f64 * 100.0).round() as u32)
}

pub fn mean_reaction_time(times: &[f64]) -> Option<u32> {
    if times.is_empty() {
        return None;
    }
    Some((times.iter().sum::<f64>() / times.len() as f64).round() as u32)
}

/// Running tallies of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub position: DetectionCounts,
    pub audio: DetectionCounts,
    /// Reaction times of hits only, both modalities pooled
    pub reaction_times: Vec<f64>,
    pub details: Vec<TrialDetail>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts_mut(&mut self, modality: Modality) -> &mut DetectionCounts {
        match modality {
            Modality::Position => &mut self.position,
            Modality::Audio => &mut self.audio,
        }
    }

    /// Scores trial `index` of `plan`. Unscoreable trials are skipped.
    pub fn score_trial(
        &mut self,
        plan: &TrialPlan,
        index: usize,
        response: &TrialResponse,
    ) -> Option<&TrialDetail> {
        let position_match = plan.is_match(Modality::Position, index)?;
        let audio_match = plan.is_match(Modality::Audio, index)?;

        for (modality, is_match) in [
            (Modality::Position, position_match),
            (Modality::Audio, audio_match),
        ] {
            let outcome = Outcome::classify(is_match, response.pressed(modality));
            self.counts_mut(modality).record(outcome);
            if outcome == Outcome::Hit {
                if let Some(rt) = response.reaction_time_ms(modality) {
                    self.reaction_times.push(rt);
                }
            }
        }

        self.details.push(TrialDetail {
            index,
            position_match,
            position_pressed: response.position_pressed,
            audio_match,
            audio_pressed: response.audio_pressed,
            position_rt_ms: response.position_rt_ms,
            audio_rt_ms: response.audio_rt_ms,
        });
        self.details.last()
    }

    pub fn running_stats(&self) -> RunningStats {
        let position_d_prime = d_prime(&self.position);
        let audio_d_prime = d_prime(&self.audio);
        RunningStats {
            position: self.position,
            audio: self.audio,
            position_accuracy: accuracy(&self.position),
            audio_accuracy: accuracy(&self.audio),
            overall_accuracy: accuracy(&self.position.merged(&self.audio)),
            avg_reaction_time_ms: mean_reaction_time(&self.reaction_times),
            position_d_prime,
            audio_d_prime,
            overall_d_prime: combine_d_prime(position_d_prime, audio_d_prime),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use statrs::distribution::{ContinuousCDF, Normal};

    fn counts(hits: u32, misses: u32, false_alarms: u32, correct_rejects: u32) -> DetectionCounts {
        DetectionCounts {
            hits,
            misses,
            false_alarms,
            correct_rejects,
        }
    }

    #[test]
    fn inverse_cdf_agrees_with_statrs() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        for p in [1e-6, 0.001, 0.02, 0.02425, 0.1, 0.3, 0.5, 0.8, 0.97, 0.999, 1.0 - 1e-6] {
            let expected = normal.inverse_cdf(p);
            let got = inverse_normal_cdf(p);
            assert!(
                (got - expected).abs() < 1e-8 * expected.abs().max(1.0),
                "p={p}: {got} vs {expected}"
            );
        }
    }

    #[test]
    fn inverse_cdf_is_odd_around_half() {
        assert_eq!(inverse_normal_cdf(0.5), 0.0);
        assert!((inverse_normal_cdf(0.9) + inverse_normal_cdf(0.1)).abs() < 1e-12);
    }

    #[test]
    fn inverse_cdf_saturates_outside_open_interval() {
        assert_eq!(inverse_normal_cdf(0.0), -3.5);
        assert_eq!(inverse_normal_cdf(1.0), 3.5);
    }

    #[test]
    fn d_prime_reference_value() {
        let d = d_prime(&counts(8, 2, 1, 14)).unwrap();
        assert!((d - 2.34).abs() <= 0.05, "d' = {d}");
    }

    #[test]
    fn d_prime_unavailable_without_signal_or_noise() {
        assert_eq!(d_prime(&counts(0, 0, 3, 10)), None);
        assert_eq!(d_prime(&counts(4, 1, 0, 0)), None);
    }

    #[test]
    fn d_prime_finite_at_perfect_and_zero_rates() {
        let perfect = d_prime(&counts(10, 0, 0, 20)).unwrap();
        let worst = d_prime(&counts(0, 10, 20, 0)).unwrap();
        assert!(perfect.is_finite() && perfect > 0.0);
        assert!(worst.is_finite() && worst < 0.0);
    }

    #[test]
    fn d_prime_rises_with_hit_rate() {
        let mut last = f64::NEG_INFINITY;
        for hits in 1..10 {
            let d = d_prime(&counts(hits, 10 - hits, 3, 17)).unwrap();
            assert!(d > last, "hits={hits}");
            last = d;
        }
    }

    #[test]
    fn d_prime_falls_with_false_alarm_rate() {
        let mut last = f64::INFINITY;
        for fa in 1..20 {
            let d = d_prime(&counts(7, 3, fa, 20 - fa)).unwrap();
            assert!(d < last, "fa={fa}");
            last = d;
        }
    }

    #[test]
    fn combine_uses_available_values_only() {
        assert_eq!(combine_d_prime(Some(1.0), Some(2.0)), Some(1.5));
        assert_eq!(combine_d_prime(None, Some(0.0)), Some(0.0));
        assert_eq!(combine_d_prime(Some(-0.4), None), Some(-0.4));
        assert_eq!(combine_d_prime(None, None), None);
    }

    #[test]
    fn accuracy_excludes_correct_rejects() {
        assert_eq!(accuracy(&counts(6, 1, 1, 40)), Some(75));
        assert_eq!(accuracy(&counts(0, 0, 0, 12)), None);
    }

    #[test]
    fn mean_reaction_time_rounds() {
        assert_eq!(mean_reaction_time(&[400.4, 500.0]), Some(450));
        assert_eq!(mean_reaction_time(&[]), None);
    }

    #[test]
    fn only_hits_contribute_reaction_times() {
        let always = TrialPlan::generate_with_rate(&mut StdRng::seed_from_u64(3), 4, 1, 1.0);
        let never = TrialPlan::generate_with_rate(&mut StdRng::seed_from_u64(3), 4, 1, 0.0);
        let mut stats = SessionStats::new();

        let mut false_alarm = TrialResponse::default();
        false_alarm.press(Modality::Position, 300.0);
        let detail = stats.score_trial(&never, 1, &false_alarm).unwrap();
        assert!(detail.position_pressed && !detail.position_match);
        assert_eq!(detail.position_rt_ms, Some(300.0));

        let mut hit = TrialResponse::default();
        hit.press(Modality::Position, 420.0);
        let detail = stats.score_trial(&always, 2, &hit).unwrap();
        assert!(detail.position_pressed && detail.position_match);

        assert_eq!(stats.reaction_times, vec![420.0]);
        assert_eq!(stats.position.hits, 1);
        assert_eq!(stats.position.false_alarms, 1);
        assert_eq!(stats.details.len(), 2);
        assert!(stats.details.iter().all(|d| d.position_pressed));
        assert_eq!(stats.running_stats().avg_reaction_time_ms, Some(420));
    }
}
