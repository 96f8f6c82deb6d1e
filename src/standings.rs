//! In-memory points table used by the season projection.
//!
//! A snapshot is owned by exactly one trial: it is cloned from the persisted
//! standings, mutated with simulated results and dropped once the champion
//! has been read off.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{MatchResult, SimulationOutcome, TeamId};

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub points: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl TableEntry {
    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }
}

pub type StandingsSnapshot = BTreeMap<TeamId, TableEntry>;

pub fn empty_snapshot(team_ids: impl IntoIterator<Item = TeamId>) -> StandingsSnapshot {
    team_ids
        .into_iter()
        .map(|id| (id, TableEntry::default()))
        .collect()
}

pub fn points_of(snapshot: &StandingsSnapshot) -> BTreeMap<TeamId, u32> {
    snapshot.iter().map(|(id, e)| (*id, e.points)).collect()
}

/// Win 3, draw 1 each, loss 0. Teams missing from the snapshot are added.
pub fn apply_result(
    snapshot: &mut StandingsSnapshot,
    home_team_id: TeamId,
    away_team_id: TeamId,
    home_goals: u32,
    away_goals: u32,
) {
    let outcome = SimulationOutcome {
        home_goals,
        away_goals,
    };
    let (home_pts, away_pts) = match outcome.result() {
        MatchResult::HomeWin => (WIN_POINTS, 0),
        MatchResult::AwayWin => (0, WIN_POINTS),
        MatchResult::Draw => (DRAW_POINTS, DRAW_POINTS),
    };

    let home = snapshot.entry(home_team_id).or_default();
    home.points += home_pts;
    home.goals_for += home_goals;
    home.goals_against += away_goals;

    let away = snapshot.entry(away_team_id).or_default();
    away.points += away_pts;
    away.goals_for += away_goals;
    away.goals_against += home_goals;
}

/// Display ordering for the league table: points, goal difference, goals
/// scored, then lowest id. The champion pick uses points alone.
pub fn compare_entries(a: (TeamId, &TableEntry), b: (TeamId, &TableEntry)) -> Ordering {
    b.1.points
        .cmp(&a.1.points)
        .then(b.1.goal_difference().cmp(&a.1.goal_difference()))
        .then(b.1.goals_for.cmp(&a.1.goals_for))
        .then(a.0.cmp(&b.0))
}

/// Most points wins; level teams go to the lowest id. `None` only when empty.
pub fn current_champion(snapshot: &StandingsSnapshot) -> Option<TeamId> {
    let mut best: Option<(TeamId, u32)> = None;
    for (id, entry) in snapshot {
        match best {
            Some((best_id, best_points))
                if best_points > entry.points
                    || (best_points == entry.points && best_id < *id) => {}
            _ => best = Some((*id, entry.points)),
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_draw_loss_points() {
        let mut s = empty_snapshot([1, 2, 3]);
        apply_result(&mut s, 1, 2, 2, 0);
        apply_result(&mut s, 2, 3, 1, 1);
        apply_result(&mut s, 3, 1, 0, 4);

        let pts = points_of(&s);
        assert_eq!(pts[&1], 6);
        assert_eq!(pts[&2], 1);
        assert_eq!(pts[&3], 1);
        assert_eq!(s[&1].goals_for, 6);
        assert_eq!(s[&1].goals_against, 0);
        assert_eq!(s[&3].goal_difference(), -4);
    }

    #[test]
    fn unknown_teams_are_inserted() {
        let mut s = StandingsSnapshot::new();
        apply_result(&mut s, 7, 8, 0, 1);
        assert_eq!(s[&7].points, 0);
        assert_eq!(s[&8].points, 3);
    }

    #[test]
    fn champion_is_points_leader() {
        let mut s = empty_snapshot([1, 2, 3]);
        apply_result(&mut s, 3, 1, 1, 0);
        assert_eq!(current_champion(&s), Some(3));
    }

    #[test]
    fn level_points_go_to_lowest_id_regardless_of_goals() {
        let mut s = empty_snapshot([1, 2, 3, 4]);
        apply_result(&mut s, 1, 3, 1, 0);
        apply_result(&mut s, 2, 4, 5, 0);
        assert_eq!(s[&1].points, s[&2].points);
        assert!(s[&2].goal_difference() > s[&1].goal_difference());
        assert_eq!(current_champion(&s), Some(1));
    }

    #[test]
    fn table_order_still_uses_goal_difference() {
        let mut s = empty_snapshot([1, 2]);
        apply_result(&mut s, 1, 2, 1, 0);
        apply_result(&mut s, 2, 1, 3, 0);
        let one = (1, &s[&1]);
        let two = (2, &s[&2]);
        assert_eq!(compare_entries(two, one), Ordering::Less);
    }

    #[test]
    fn fully_level_goes_to_lowest_id() {
        let s = empty_snapshot([4, 2, 9]);
        assert_eq!(current_champion(&s), Some(2));

        let mut s = empty_snapshot([5, 6]);
        apply_result(&mut s, 6, 5, 2, 2);
        assert_eq!(current_champion(&s), Some(5));
    }

    #[test]
    fn empty_snapshot_has_no_champion() {
        assert_eq!(current_champion(&StandingsSnapshot::new()), None);
    }
}
