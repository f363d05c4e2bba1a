use dnb_core::Modality;
use dnb_session::{TARGET_RATE, TrialPlan};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn match_rate(plan: &TrialPlan, modality: Modality) -> f64 {
    let n = plan.n_level();
    let scoreable = plan.len() - n;
    let matches = (n..plan.len())
        .filter(|&i| plan.is_match(modality, i) == Some(true))
        .count();
    matches as f64 / scoreable as f64
}

#[test]
fn match_rate_close_to_target_over_many_trials() {
    for (seed, n) in [(1u64, 1usize), (2, 2), (3, 4), (4, 9)] {
        let mut rng = StdRng::seed_from_u64(seed);
        let plan = TrialPlan::generate(&mut rng, 20_000, n);
        for modality in Modality::BOTH {
            let rate = match_rate(&plan, modality);
            assert!(
                (rate - TARGET_RATE).abs() <= 0.05,
                "n={n} {modality}: rate {rate:.3}"
            );
        }
    }
}

#[test]
fn forced_non_matches_never_repeat_by_chance() {
    // rate 0 forces a non-match on every scoreable trial
    let mut rng = StdRng::seed_from_u64(99);
    let plan = TrialPlan::generate_with_rate(&mut rng, 10_000, 3, 0.0);
    for i in 3..plan.len() {
        assert_ne!(plan.positions()[i], plan.positions()[i - 3]);
        assert_ne!(plan.letters()[i], plan.letters()[i - 3]);
    }
}

#[test]
fn streams_are_independent() {
    let mut rng = StdRng::seed_from_u64(5);
    let plan = TrialPlan::generate(&mut rng, 20_000, 2);
    let both = (2..plan.len())
        .filter(|&i| {
            plan.is_match(Modality::Position, i) == Some(true)
                && plan.is_match(Modality::Audio, i) == Some(true)
        })
        .count() as f64
        / (plan.len() - 2) as f64;
    let expected = TARGET_RATE * TARGET_RATE;
    assert!((both - expected).abs() <= 0.03, "joint rate {both:.3}");
}
