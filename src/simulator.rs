//! Single-match simulation and the week-by-week season driver.

use std::collections::HashMap;

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::goals::sample_goals;
use crate::lambda::compute_lambdas;
use crate::model::{Fixture, MatchId, SimulationOutcome, TeamId, TeamStrength};
use crate::store::{MatchResultSink, RemainingFixtureProvider, TeamStrengthProvider};

/// Two independent lambda -> goals evaluations sharing the same strengths.
pub fn simulate_match<R: Rng + ?Sized>(
    home: &TeamStrength,
    away: &TeamStrength,
    rng: &mut R,
) -> SimulationOutcome {
    let (home_lambda, away_lambda) = compute_lambdas(home, away, rng);
    let home_goals = sample_goals(home_lambda, rng);
    let away_goals = sample_goals(away_lambda, rng);

    debug!(
        home = home.team_id,
        away = away.team_id,
        home_goals,
        away_goals,
        home_lambda,
        away_lambda,
        "simulated match"
    );

    SimulationOutcome {
        home_goals,
        away_goals,
    }
}

/// Private random stream for one match, keyed by the session seed and the
/// match id so matches in the same week never share draws.
pub fn match_rng(seed: u64, match_id: MatchId) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(match_id as u64);
    rng
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayedMatch {
    pub match_id: MatchId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub outcome: SimulationOutcome,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekReport {
    pub week: u32,
    pub matches: Vec<PlayedMatch>,
}

impl WeekReport {
    pub fn failed_saves(&self) -> Vec<MatchId> {
        self.matches
            .iter()
            .filter(|m| !m.saved)
            .map(|m| m.match_id)
            .collect()
    }
}

pub struct SeasonDriver<'a, S: ?Sized> {
    store: &'a S,
    seed: u64,
}

impl<'a, S> SeasonDriver<'a, S>
where
    S: TeamStrengthProvider + RemainingFixtureProvider + MatchResultSink + ?Sized,
{
    pub fn new(store: &'a S, seed: u64) -> Self {
        Self { store, seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulate the earliest week that still has unplayed fixtures.
    ///
    /// Strengths for every team in the week are loaded before anything is
    /// simulated; a missing team aborts the week with nothing written. Save
    /// failures are logged per match and do not stop the rest of the week.
    pub fn play_next_week(&self) -> SimResult<WeekReport> {
        let unplayed = self.store.list_unplayed(None)?;
        let Some(week) = unplayed.iter().map(|f| f.week).min() else {
            return Err(SimError::NoUnplayedMatches);
        };
        let fixtures = unplayed
            .into_iter()
            .filter(|f| f.week == week)
            .collect::<Vec<_>>();

        let strengths = load_strengths(self.store, &fixtures)?;
        let seed = self.seed;

        let outcomes = fixtures
            .par_iter()
            .map(|f| {
                let home = &strengths[&f.home_team_id];
                let away = &strengths[&f.away_team_id];
                let mut rng = match_rng(seed, f.id);
                simulate_match(home, away, &mut rng)
            })
            .collect::<Vec<_>>();

        let mut matches = Vec::with_capacity(fixtures.len());
        for (f, outcome) in fixtures.iter().zip(outcomes) {
            let saved = match self.store.record_result(
                f.id,
                outcome.home_goals,
                outcome.away_goals,
                Utc::now(),
            ) {
                Ok(()) => true,
                Err(err) => {
                    warn!(match_id = f.id, week, error = %err, "failed to save match result");
                    false
                }
            };
            matches.push(PlayedMatch {
                match_id: f.id,
                home_team_id: f.home_team_id,
                away_team_id: f.away_team_id,
                outcome,
                saved,
            });
        }

        info!(week, matches = matches.len(), "week simulated");
        Ok(WeekReport { week, matches })
    }

    /// Play weeks until the store reports nothing left. Each pass must shrink
    /// the unplayed count, otherwise the store is considered stuck.
    pub fn play_all_remaining_weeks(&self) -> SimResult<Vec<WeekReport>> {
        let mut reports = Vec::new();
        let mut remaining = self.store.count_unplayed()?;
        while remaining > 0 {
            let report = self.play_next_week()?;
            let after = self.store.count_unplayed()?;
            if after >= remaining {
                return Err(SimError::ProgressStall {
                    week: report.week,
                    unplayed: after,
                });
            }
            remaining = after;
            reports.push(report);
        }
        info!(weeks = reports.len(), "all remaining weeks simulated");
        Ok(reports)
    }
}

pub fn load_strengths<S>(
    store: &S,
    fixtures: &[Fixture],
) -> SimResult<HashMap<TeamId, TeamStrength>>
where
    S: TeamStrengthProvider + ?Sized,
{
    let mut out = HashMap::new();
    for f in fixtures {
        for team_id in [f.home_team_id, f.away_team_id] {
            if out.contains_key(&team_id) {
                continue;
            }
            let strength = store.strength(team_id).map_err(|err| {
                warn!(team_id, error = %err, "team strength lookup failed");
                SimError::StatsUnavailable { team_id }
            })?;
            out.insert(team_id, strength);
        }
    }
    Ok(out)
}
