use dnb_core::{Letter, Modality, Position, Stimulus};
use rand::Rng;

/// Probability that a scoreable trial repeats the value N back
pub const TARGET_RATE: f64 = 0.30;

/// Pre-generated stimuli for a whole session
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPlan {
    n_level: usize,
    positions: Vec<Position>,
    letters: Vec<Letter>,
}

impl TrialPlan {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, total_trials: usize, n_level: usize) -> Self {
        Self::generate_with_rate(rng, total_trials, n_level, TARGET_RATE)
    }

    /// Position and letter streams are drawn independently, so a trial can
    /// match on either, both or neither.
    pub fn generate_with_rate<R: Rng + ?Sized>(
        rng: &mut R,
        total_trials: usize,
        n_level: usize,
        target_rate: f64,
    ) -> Self {
        let positions = draw_stream(rng, total_trials, n_level, target_rate);
        let letters = draw_stream(rng, total_trials, n_level, target_rate);
        Self {
            n_level,
            positions,
            letters,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn n_level(&self) -> usize {
        self.n_level
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }

    pub fn get(&self, index: usize) -> Option<(Position, Letter)> {
        Some((*self.positions.get(index)?, *self.letters.get(index)?))
    }

    /// Trials before index N have no partner and are never scored
    pub fn is_scoreable(&self, index: usize) -> bool {
        index >= self.n_level && index < self.len()
    }

    /// Whether trial `index` repeats the value N back. `None` if unscoreable.
    pub fn is_match(&self, modality: Modality, index: usize) -> Option<bool> {
        if !self.is_scoreable(index) {
            return None;
        }
        let back = index - self.n_level;
        Some(match modality {
            Modality::Position => self.positions[index] == self.positions[back],
            Modality::Audio => self.letters[index] == self.letters[back],
        })
    }
}

/// One stream of the plan.
///
/// A non-match is drawn from the alphabet minus the value N back, so the match
/// rate is exactly `target_rate` and never inflated by chance repeats.
fn draw_stream<S: Stimulus, R: Rng + ?Sized>(
    rng: &mut R,
    total: usize,
    n: usize,
    target_rate: f64,
) -> Vec<S> {
    let mut out: Vec<S> = Vec::with_capacity(total);
    for i in 0..total {
        let value = if i < n {
            S::from_index(rng.random_range(0..S::CARDINALITY))
        } else {
            let back = out[i - n];
            if rng.random_bool(target_rate) {
                back
            } else {
                let drawn = rng.random_range(0..S::CARDINALITY - 1);
                let skip = back.index();
                S::from_index(if drawn >= skip { drawn + 1 } else { drawn })
            }
        };
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn plan_has_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = TrialPlan::generate(&mut rng, 25, 2);
        assert_eq!(plan.len(), 25);
        assert_eq!(plan.letters().len(), 25);
    }

    #[test]
    fn same_seed_same_plan() {
        let a = TrialPlan::generate(&mut StdRng::seed_from_u64(42), 40, 3);
        let b = TrialPlan::generate(&mut StdRng::seed_from_u64(42), 40, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn first_n_trials_are_unscoreable() {
        let plan = TrialPlan::generate(&mut StdRng::seed_from_u64(1), 10, 3);
        for i in 0..3 {
            assert_eq!(plan.is_match(Modality::Position, i), None);
            assert_eq!(plan.is_match(Modality::Audio, i), None);
        }
        assert!(plan.is_match(Modality::Position, 3).is_some());
        assert_eq!(plan.is_match(Modality::Position, 10), None);
    }

    #[test]
    fn rate_zero_never_matches_and_rate_one_always_matches() {
        let mut rng = StdRng::seed_from_u64(9);
        let never = TrialPlan::generate_with_rate(&mut rng, 500, 2, 0.0);
        let always = TrialPlan::generate_with_rate(&mut rng, 500, 2, 1.0);
        for i in 2..500 {
            assert_eq!(never.is_match(Modality::Position, i), Some(false));
            assert_eq!(never.is_match(Modality::Audio, i), Some(false));
            assert_eq!(always.is_match(Modality::Position, i), Some(true));
            assert_eq!(always.is_match(Modality::Audio, i), Some(true));
        }
    }

    #[test]
    fn non_match_draw_covers_whole_alphabet() {
        let mut rng = StdRng::seed_from_u64(3);
        let plan = TrialPlan::generate_with_rate(&mut rng, 2000, 1, 0.0);
        let mut seen = [false; 9];
        for p in plan.positions() {
            seen[p.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
