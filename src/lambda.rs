use rand::Rng;

use crate::model::{LEAGUE_AVERAGE, MAX_LAMBDA, MIN_LAMBDA, TeamStrength};

const HOME_ADV_MAX: f64 = 0.15;
const FORM_MIN: f64 = 0.8;
const FORM_MAX: f64 = 1.2;

pub const FAST_HOME_ADVANTAGE: f64 = 1.1;

/// Expected goals for both sides of a fixture.
///
/// Draw order is fixed (home advantage, home form, away form) so a seeded
/// generator reproduces the same pair.
pub fn compute_lambdas<R: Rng + ?Sized>(
    home: &TeamStrength,
    away: &TeamStrength,
    rng: &mut R,
) -> (f64, f64) {
    let base_home = home.attack_strength * away.defense_strength * LEAGUE_AVERAGE;
    let base_away = away.attack_strength * home.defense_strength * LEAGUE_AVERAGE;

    let home_advantage = 1.0 + rng.gen_range(0.0..HOME_ADV_MAX);
    let home_form = rng.gen_range(FORM_MIN..FORM_MAX);
    let away_form = rng.gen_range(FORM_MIN..FORM_MAX);

    let home_lambda = base_home * home_advantage * home_form;
    let away_lambda = base_away * away_form;

    (clamp_lambda(home_lambda), clamp_lambda(away_lambda))
}

/// Deterministic lambdas for bulk trials: a flat home boost, no form noise and
/// no clamping. Callers cap the sampled goals per lambda bucket instead.
pub fn fast_lambdas(home: &TeamStrength, away: &TeamStrength) -> (f64, f64) {
    let home_lambda =
        home.attack_strength * away.defense_strength * LEAGUE_AVERAGE * FAST_HOME_ADVANTAGE;
    let away_lambda = away.attack_strength * home.defense_strength * LEAGUE_AVERAGE;
    (home_lambda, away_lambda)
}

fn clamp_lambda(v: f64) -> f64 {
    v.max(MIN_LAMBDA).min(MAX_LAMBDA)
}
