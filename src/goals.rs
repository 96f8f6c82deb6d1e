use rand::Rng;

use crate::model::MAX_GOALS;

const MOMENTUM_BONUS_BELOW: f64 = 0.10;
const MOMENTUM_PENALTY_ABOVE: f64 = 0.90;
const SURGE_CHANCE: f64 = 0.005;
const LOW_SCORE_LAMBDA: f64 = 1.0;
const LOW_SCORE_CHANCE: f64 = 0.15;
const LOW_SCORE_ZERO_CHANCE: f64 = 0.5;

/// Below this lambda the bulk sampler skips the draw entirely.
const FAST_ZERO_LAMBDA: f64 = 0.1;

pub fn poisson_knuth<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> u32 {
    if lambda.is_nan() || lambda <= 0.0 {
        return 0;
    }
    let limit = (-lambda).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        k += 1;
        p *= rng.gen_range(0.0..1.0);
        if p <= limit {
            break;
        }
    }
    k - 1
}

/// Goal count for one side with the football realism adjustments applied
/// after the Poisson draw. Adjustment order is part of the contract:
/// momentum, rare surge, low-score bias, then the cap.
pub fn sample_goals<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> u32 {
    let mut goals = poisson_knuth(lambda, rng);

    let momentum = rng.gen_range(0.0..1.0);
    if momentum < MOMENTUM_BONUS_BELOW {
        goals += 1;
    } else if momentum > MOMENTUM_PENALTY_ABOVE {
        goals = goals.saturating_sub(1);
    }

    if rng.gen_range(0.0..1.0) < SURGE_CHANCE {
        goals += rng.gen_range(1..=3);
    }

    if lambda < LOW_SCORE_LAMBDA
        && rng.gen_range(0.0..1.0) < LOW_SCORE_CHANCE
        && goals > 0
        && rng.gen_range(0.0..1.0) < LOW_SCORE_ZERO_CHANCE
    {
        goals = 0;
    }

    goals.min(MAX_GOALS)
}

pub fn bucket_cap(lambda: f64) -> u32 {
    if lambda < 1.0 {
        3
    } else if lambda < 2.0 {
        5
    } else {
        7
    }
}

/// Bulk-trial sampler: the realism sampler capped per lambda bucket, with
/// near-zero lambdas short-circuited to a clean sheet.
pub fn sample_goals_bucketed<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> u32 {
    if lambda < FAST_ZERO_LAMBDA {
        return 0;
    }
    sample_goals(lambda, rng).min(bucket_cap(lambda))
}
