//! Collaborator traits the engine reads from and writes to, plus an in-memory
//! implementation used by tests and dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::league_table::standings_from_fixtures;
use crate::model::{Fixture, MatchId, Team, TeamId, TeamStrength};
use crate::schedule::double_round_robin;
use crate::standings::StandingsSnapshot;

pub trait TeamStrengthProvider {
    fn strength(&self, team_id: TeamId) -> Result<TeamStrength, StoreError>;
}

pub trait RemainingFixtureProvider {
    /// Unplayed fixtures ordered by (week, id), optionally for one week only.
    fn list_unplayed(&self, week: Option<u32>) -> Result<Vec<Fixture>, StoreError>;

    fn count_unplayed(&self) -> Result<usize, StoreError> {
        Ok(self.list_unplayed(None)?.len())
    }
}

pub trait StandingsProvider {
    /// Table derived from played matches only; every known team is present.
    fn current_standings(&self) -> Result<StandingsSnapshot, StoreError>;
}

pub trait MatchResultSink {
    fn record_result(
        &self,
        match_id: MatchId,
        home_goals: u32,
        away_goals: u32,
        played_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

pub trait PredictionSink {
    /// Atomically replace every stored probability for `week`.
    fn replace_week_predictions(
        &self,
        week: u32,
        probabilities: &BTreeMap<TeamId, f64>,
    ) -> Result<(), StoreError>;
}

pub trait LeagueStore:
    TeamStrengthProvider
    + RemainingFixtureProvider
    + StandingsProvider
    + MatchResultSink
    + PredictionSink
{
}

impl<T> LeagueStore for T where
    T: TeamStrengthProvider
        + RemainingFixtureProvider
        + StandingsProvider
        + MatchResultSink
        + PredictionSink
{
}

#[derive(Debug, Default)]
struct MemoryState {
    teams: Vec<Team>,
    strengths: HashMap<TeamId, TeamStrength>,
    fixtures: Vec<Fixture>,
    predictions: BTreeMap<u32, BTreeMap<TeamId, f64>>,
    failing_matches: HashSet<MatchId>,
    failing_predictions: bool,
    frozen: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new(teams: Vec<Team>, strengths: Vec<TeamStrength>, fixtures: Vec<Fixture>) -> Self {
        let strengths = strengths.into_iter().map(|s| (s.team_id, s)).collect();
        Self {
            state: Mutex::new(MemoryState {
                teams,
                strengths,
                fixtures,
                ..MemoryState::default()
            }),
        }
    }

    pub fn with_league(teams: Vec<Team>) -> Result<Self> {
        let ids = teams.iter().map(|t| t.id).collect::<Vec<_>>();
        let fixtures = double_round_robin(&ids, 1)?;
        let strengths = teams.iter().map(TeamStrength::from_ratings).collect();
        Ok(Self::new(teams, strengths, fixtures))
    }

    /// Writes for this match fail with [`StoreError::WriteRejected`].
    pub fn fail_writes_for(&self, match_id: MatchId) {
        if let Ok(mut state) = self.lock() {
            state.failing_matches.insert(match_id);
        }
    }

    pub fn fail_prediction_writes(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.failing_predictions = fail;
        }
    }

    /// Accept result writes without storing them.
    pub fn freeze_results(&self) {
        if let Ok(mut state) = self.lock() {
            state.frozen = true;
        }
    }

    pub fn remove_strength(&self, team_id: TeamId) {
        if let Ok(mut state) = self.lock() {
            state.strengths.remove(&team_id);
        }
    }

    pub fn teams(&self) -> Result<Vec<Team>, StoreError> {
        Ok(self.lock()?.teams.clone())
    }

    pub fn fixtures(&self) -> Result<Vec<Fixture>, StoreError> {
        Ok(self.lock()?.fixtures.clone())
    }

    pub fn predictions(&self, week: u32) -> Result<Option<BTreeMap<TeamId, f64>>, StoreError> {
        Ok(self.lock()?.predictions.get(&week).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl TeamStrengthProvider for InMemoryStore {
    fn strength(&self, team_id: TeamId) -> Result<TeamStrength, StoreError> {
        self.lock()?
            .strengths
            .get(&team_id)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("team stats for team {team_id}")))
    }
}

impl RemainingFixtureProvider for InMemoryStore {
    fn list_unplayed(&self, week: Option<u32>) -> Result<Vec<Fixture>, StoreError> {
        let state = self.lock()?;
        let mut out = state
            .fixtures
            .iter()
            .filter(|f| f.is_unplayed())
            .filter(|f| week.is_none_or(|w| f.week == w))
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|f| (f.week, f.id));
        Ok(out)
    }
}

impl StandingsProvider for InMemoryStore {
    fn current_standings(&self) -> Result<StandingsSnapshot, StoreError> {
        let state = self.lock()?;
        let ids = state.teams.iter().map(|t| t.id);
        Ok(standings_from_fixtures(ids, &state.fixtures))
    }
}

impl MatchResultSink for InMemoryStore {
    fn record_result(
        &self,
        match_id: MatchId,
        home_goals: u32,
        away_goals: u32,
        played_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.failing_matches.contains(&match_id) {
            return Err(StoreError::WriteRejected { match_id });
        }
        if state.frozen {
            return Ok(());
        }
        let fixture = state
            .fixtures
            .iter_mut()
            .find(|f| f.id == match_id)
            .ok_or_else(|| StoreError::NotFound(format!("match {match_id}")))?;
        fixture.home_goals = Some(home_goals);
        fixture.away_goals = Some(away_goals);
        fixture.played_at = Some(played_at);
        Ok(())
    }
}

impl PredictionSink for InMemoryStore {
    fn replace_week_predictions(
        &self,
        week: u32,
        probabilities: &BTreeMap<TeamId, f64>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.failing_predictions {
            return Err(StoreError::Unavailable(format!(
                "prediction writes disabled (week {week})"
            )));
        }
        state.predictions.insert(week, probabilities.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn league() -> InMemoryStore {
        let teams = (1..=4)
            .map(|id| Team {
                id,
                name: format!("Club {id}"),
                attack: 60,
                defense: 60,
            })
            .collect();
        InMemoryStore::with_league(teams).unwrap()
    }

    #[test]
    fn unplayed_listing_is_ordered_and_filterable() {
        let store = league();
        let all = store.list_unplayed(None).unwrap();
        assert_eq!(all.len(), 12);
        assert!(all.windows(2).all(|w| (w[0].week, w[0].id) < (w[1].week, w[1].id)));
        let week2 = store.list_unplayed(Some(2)).unwrap();
        assert_eq!(week2.len(), 2);
        assert!(week2.iter().all(|f| f.week == 2));
    }

    #[test]
    fn recording_a_result_removes_it_from_unplayed() {
        let store = league();
        store.record_result(1, 2, 0, Utc::now()).unwrap();
        assert_eq!(store.count_unplayed().unwrap(), 11);
        let standings = store.current_standings().unwrap();
        assert_eq!(standings[&1].points, 3);
        assert_eq!(standings[&3].points, 0);
        assert_eq!(standings.len(), 4);
    }

    #[test]
    fn injected_failures_and_missing_rows() {
        let store = league();
        store.fail_writes_for(2);
        assert!(matches!(
            store.record_result(2, 1, 1, Utc::now()),
            Err(StoreError::WriteRejected { match_id: 2 })
        ));
        assert!(matches!(
            store.record_result(999, 1, 1, Utc::now()),
            Err(StoreError::NotFound(_))
        ));
        store.remove_strength(3);
        assert!(matches!(store.strength(3), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn frozen_store_accepts_but_drops_results() {
        let store = league();
        store.freeze_results();
        store.record_result(1, 1, 0, Utc::now()).unwrap();
        assert_eq!(store.count_unplayed().unwrap(), 12);
    }
}
