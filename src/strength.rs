use serde::{Deserialize, Serialize};

use crate::model::{LEAGUE_AVERAGE, Team, TeamId, TeamStrength};

/// Rating that maps to an average (1.0) strength.
const RATING_BASELINE: f64 = 75.0;
const RATING_SCALE: f64 = 100.0;

impl TeamStrength {
    /// Seed strengths from 0-100 club ratings before any match is played.
    pub fn from_ratings(team: &Team) -> Self {
        let attack = team.attack as f64;
        let defense = team.defense as f64;
        Self {
            team_id: team.id,
            attack_strength: (attack / RATING_BASELINE).max(0.0),
            defense_strength: (defense / RATING_BASELINE).max(0.0),
            avg_scored: (attack / RATING_SCALE).max(0.0),
            avg_conceded: ((RATING_SCALE - defense) / RATING_SCALE).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_id: TeamId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
    pub avg_scored: f64,
    pub avg_conceded: f64,
}

impl TeamRecord {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            ..Self::default()
        }
    }

    pub fn record(&mut self, goals_for: u32, goals_against: u32) {
        self.played += 1;
        self.goals_for += goals_for;
        self.goals_against += goals_against;

        if goals_for > goals_against {
            self.won += 1;
            self.points += 3;
        } else if goals_for == goals_against {
            self.drawn += 1;
            self.points += 1;
        } else {
            self.lost += 1;
        }

        self.avg_scored = self.goals_for as f64 / self.played as f64;
        self.avg_conceded = self.goals_against as f64 / self.played as f64;
    }

    /// Strengths relative to `league_average`; a team with no matches is neutral.
    pub fn strengths(&self, league_average: f64) -> TeamStrength {
        let league = if league_average > 0.0 {
            league_average
        } else {
            LEAGUE_AVERAGE
        };
        if self.played == 0 {
            return TeamStrength::neutral(self.team_id);
        }
        TeamStrength {
            team_id: self.team_id,
            attack_strength: self.avg_scored / league,
            defense_strength: self.avg_conceded / league,
            avg_scored: self.avg_scored,
            avg_conceded: self.avg_conceded,
        }
    }

    pub fn win_percentage(&self) -> f64 {
        percentage(self.won, self.played)
    }

    pub fn draw_percentage(&self) -> f64 {
        percentage(self.drawn, self.played)
    }

    pub fn loss_percentage(&self) -> f64 {
        percentage(self.lost, self.played)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.team_id);
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u32, attack: i32, defense: i32) -> Team {
        Team {
            id,
            name: format!("T{id}"),
            attack,
            defense,
        }
    }

    #[test]
    fn ratings_map_to_strength_ratios() {
        let s = TeamStrength::from_ratings(&team(1, 75, 60));
        assert!((s.attack_strength - 1.0).abs() < 1e-12);
        assert!((s.defense_strength - 0.8).abs() < 1e-12);
        assert!((s.avg_scored - 0.75).abs() < 1e-12);
        assert!((s.avg_conceded - 0.4).abs() < 1e-12);
    }

    #[test]
    fn negative_ratings_floor_at_zero() {
        let s = TeamStrength::from_ratings(&team(1, -10, 140));
        assert_eq!(s.attack_strength, 0.0);
        assert_eq!(s.avg_scored, 0.0);
        assert_eq!(s.avg_conceded, 0.0);
    }

    #[test]
    fn record_tracks_results_and_averages() {
        let mut r = TeamRecord::new(4);
        r.record(3, 1);
        r.record(0, 0);
        r.record(1, 2);
        assert_eq!((r.played, r.won, r.drawn, r.lost), (3, 1, 1, 1));
        assert_eq!(r.points, 4);
        assert!((r.avg_scored - 4.0 / 3.0).abs() < 1e-12);
        assert!((r.avg_conceded - 1.0).abs() < 1e-12);
        assert!((r.win_percentage() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn strengths_fall_back_to_neutral_and_default_average() {
        let r = TeamRecord::new(2);
        assert_eq!(r.strengths(1.5), TeamStrength::neutral(2));

        let mut r = TeamRecord::new(2);
        r.record(3, 0);
        let s = r.strengths(0.0);
        assert!((s.attack_strength - 2.0).abs() < 1e-12);
        assert_eq!(s.defense_strength, 0.0);
    }

    #[test]
    fn reset_keeps_team_id() {
        let mut r = TeamRecord::new(9);
        r.record(1, 0);
        r.reset();
        assert_eq!(r, TeamRecord::new(9));
        assert_eq!(r.loss_percentage(), 0.0);
    }
}
