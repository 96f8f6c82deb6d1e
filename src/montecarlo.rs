//! Championship probabilities by repeatedly playing out the rest of the season.
//!
//! Each worker owns a private ChaCha stream derived from one run seed and keeps
//! its own champion tally; tallies are only summed once every worker has
//! finished. Fixture lambdas are computed once up front with the cheap
//! [`fast_lambdas`] model and reused by every trial.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::goals::sample_goals_bucketed;
use crate::lambda::fast_lambdas;
use crate::model::{ChampionshipEstimate, Fixture, TeamId, TeamStrength};
use crate::simulator::load_strengths;
use crate::standings::{StandingsSnapshot, apply_result, current_champion};
use crate::store::{
    PredictionSink, RemainingFixtureProvider, StandingsProvider, TeamStrengthProvider,
};

pub const MIN_ITERATIONS: u32 = 1000;
pub const MAX_ITERATIONS: u32 = 5000;
pub const DEFAULT_ITERATIONS: u32 = 2000;

pub fn clamp_iterations(requested: u32) -> u32 {
    requested.clamp(MIN_ITERATIONS, MAX_ITERATIONS)
}

#[derive(Debug, Clone, Copy)]
struct PreparedFixture {
    home: TeamId,
    away: TeamId,
    home_lambda: f64,
    away_lambda: f64,
}

type Tally = BTreeMap<TeamId, u32>;

pub struct MonteCarloEngine {
    workers: usize,
    pool: Option<rayon::ThreadPool>,
}

impl MonteCarloEngine {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .ok();
        Self { workers, pool }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// `rng` is only used to draw the run seed, so a seeded generator and a
    /// fixed worker count give identical estimates.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        current: &StandingsSnapshot,
        remaining: &[Fixture],
        strengths: &HashMap<TeamId, TeamStrength>,
        iterations: u32,
        rng: &mut R,
    ) -> SimResult<ChampionshipEstimate> {
        if remaining.is_empty() {
            return Err(SimError::SeasonComplete);
        }
        let iterations = clamp_iterations(iterations);
        let prepared = prepare_fixtures(remaining, strengths)?;

        let mut teams: BTreeSet<TeamId> = current.keys().copied().collect();
        for f in &prepared {
            teams.insert(f.home);
            teams.insert(f.away);
        }

        info!(
            iterations,
            remaining = prepared.len(),
            workers = self.workers,
            "starting monte carlo run"
        );

        let run_seed = rng.next_u64();
        let shares = split_iterations(iterations, self.workers);
        let run = || {
            shares
                .par_iter()
                .enumerate()
                .map(|(worker, trials)| {
                    let mut rng = ChaCha8Rng::seed_from_u64(run_seed);
                    rng.set_stream(worker as u64);
                    run_trials(current, &prepared, *trials, &mut rng)
                })
                .reduce(Tally::new, merge_tallies)
        };
        let tally = match self.pool.as_ref() {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let probabilities = normalize(&tally, &teams, iterations);
        debug!(?probabilities, "monte carlo run finished");
        Ok(ChampionshipEstimate {
            iterations,
            probabilities,
        })
    }
}

fn prepare_fixtures(
    remaining: &[Fixture],
    strengths: &HashMap<TeamId, TeamStrength>,
) -> SimResult<Vec<PreparedFixture>> {
    remaining
        .iter()
        .map(|f| {
            let home = strengths
                .get(&f.home_team_id)
                .ok_or(SimError::StatsUnavailable {
                    team_id: f.home_team_id,
                })?;
            let away = strengths
                .get(&f.away_team_id)
                .ok_or(SimError::StatsUnavailable {
                    team_id: f.away_team_id,
                })?;
            let (home_lambda, away_lambda) = fast_lambdas(home, away);
            Ok(PreparedFixture {
                home: f.home_team_id,
                away: f.away_team_id,
                home_lambda,
                away_lambda,
            })
        })
        .collect()
}

fn split_iterations(iterations: u32, workers: usize) -> Vec<u32> {
    let workers = (workers.max(1) as u32).min(iterations.max(1));
    let base = iterations / workers;
    let extra = iterations % workers;
    (0..workers)
        .map(|i| base + u32::from(i < extra))
        .collect()
}

fn run_trials<R: Rng + ?Sized>(
    current: &StandingsSnapshot,
    fixtures: &[PreparedFixture],
    trials: u32,
    rng: &mut R,
) -> Tally {
    let mut tally = Tally::new();
    for _ in 0..trials {
        let mut table = current.clone();
        for f in fixtures {
            let home_goals = sample_goals_bucketed(f.home_lambda, rng);
            let away_goals = sample_goals_bucketed(f.away_lambda, rng);
            apply_result(&mut table, f.home, f.away, home_goals, away_goals);
        }
        if let Some(champion) = current_champion(&table) {
            *tally.entry(champion).or_insert(0) += 1;
        }
    }
    tally
}

fn merge_tallies(mut a: Tally, b: Tally) -> Tally {
    for (team, count) in b {
        *a.entry(team).or_insert(0) += count;
    }
    a
}

/// Percentages of `iterations`, every known team listed. If the total drifts
/// from 100 only the non-zero entries are rescaled, so a team that never won a
/// trial stays at exactly 0.
pub fn normalize(
    tally: &Tally,
    teams: &BTreeSet<TeamId>,
    iterations: u32,
) -> BTreeMap<TeamId, f64> {
    let mut out: BTreeMap<TeamId, f64> = teams.iter().map(|id| (*id, 0.0)).collect();
    if iterations == 0 {
        return out;
    }
    for (team, count) in tally {
        out.insert(*team, *count as f64 / iterations as f64 * 100.0);
    }

    let total: f64 = out.values().sum();
    if total > 0.0 && total != 100.0 {
        let factor = 100.0 / total;
        for p in out.values_mut() {
            if *p > 0.0 {
                *p *= factor;
            }
        }
    }
    out
}

pub fn predict_week<S, R>(
    store: &S,
    engine: &MonteCarloEngine,
    week: u32,
    iterations: u32,
    rng: &mut R,
) -> SimResult<ChampionshipEstimate>
where
    S: TeamStrengthProvider
        + RemainingFixtureProvider
        + StandingsProvider
        + PredictionSink
        + ?Sized,
    R: Rng + ?Sized,
{
    let remaining = store.list_unplayed(None)?;
    if remaining.is_empty() {
        return Err(SimError::SeasonComplete);
    }
    let current = store.current_standings()?;
    let strengths = load_strengths(store, &remaining)?;

    let estimate = engine.estimate(&current, &remaining, &strengths, iterations, rng)?;
    store.replace_week_predictions(week, &estimate.probabilities)?;
    info!(week, iterations = estimate.iterations, "predictions stored");
    Ok(estimate)
}
