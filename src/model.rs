use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TeamId = u32;
pub type MatchId = u32;

/// Expected goals per team per match across the league.
pub const LEAGUE_AVERAGE: f64 = 1.5;
pub const MIN_LAMBDA: f64 = 0.1;
pub const MAX_LAMBDA: f64 = 4.0;
/// Hard ceiling for a single side's score.
pub const MAX_GOALS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub attack: i32,
    pub defense: i32,
}

/// Attack/defense ratios against [`LEAGUE_AVERAGE`]; 1.0 is an average side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamStrength {
    pub team_id: TeamId,
    pub attack_strength: f64,
    pub defense_strength: f64,
    pub avg_scored: f64,
    pub avg_conceded: f64,
}

impl TeamStrength {
    pub fn neutral(team_id: TeamId) -> Self {
        Self {
            team_id,
            attack_strength: 1.0,
            defense_strength: 1.0,
            avg_scored: LEAGUE_AVERAGE,
            avg_conceded: LEAGUE_AVERAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: MatchId,
    pub week: u32,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    #[serde(default)]
    pub played_at: Option<DateTime<Utc>>,
}

impl Fixture {
    pub fn new(id: MatchId, week: u32, home_team_id: TeamId, away_team_id: TeamId) -> Self {
        Self {
            id,
            week,
            home_team_id,
            away_team_id,
            home_goals: None,
            away_goals: None,
            played_at: None,
        }
    }

    pub fn is_unplayed(&self) -> bool {
        self.home_goals.is_none() && self.away_goals.is_none()
    }

    pub fn outcome(&self) -> Option<SimulationOutcome> {
        let (Some(home_goals), Some(away_goals)) = (self.home_goals, self.away_goals) else {
            return None;
        };
        Some(SimulationOutcome {
            home_goals,
            away_goals,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub home_goals: u32,
    pub away_goals: u32,
}

impl SimulationOutcome {
    pub fn result(&self) -> MatchResult {
        if self.home_goals > self.away_goals {
            MatchResult::HomeWin
        } else if self.home_goals < self.away_goals {
            MatchResult::AwayWin
        } else {
            MatchResult::Draw
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    HomeWin,
    Draw,
    AwayWin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionshipEstimate {
    pub iterations: u32,
    pub probabilities: BTreeMap<TeamId, f64>,
}

impl ChampionshipEstimate {
    pub fn probability(&self, team_id: TeamId) -> f64 {
        self.probabilities.get(&team_id).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.probabilities.values().sum()
    }

    /// Highest probability first, team id ascending on equal values.
    pub fn ranked(&self) -> Vec<(TeamId, f64)> {
        let mut rows = self
            .probabilities
            .iter()
            .map(|(id, p)| (*id, *p))
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        rows
    }
}
