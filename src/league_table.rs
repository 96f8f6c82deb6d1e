use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Fixture, Team, TeamId};
use crate::standings::{
    StandingsSnapshot, TableEntry, apply_result, compare_entries, empty_snapshot,
};
use crate::strength::TeamRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team_id: TeamId,
    pub team_name: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: u32,
}

pub fn standings_from_fixtures(
    team_ids: impl IntoIterator<Item = TeamId>,
    fixtures: &[Fixture],
) -> StandingsSnapshot {
    let mut snapshot = empty_snapshot(team_ids);
    for f in fixtures {
        let Some(outcome) = f.outcome() else {
            continue;
        };
        apply_result(
            &mut snapshot,
            f.home_team_id,
            f.away_team_id,
            outcome.home_goals,
            outcome.away_goals,
        );
    }
    snapshot
}

/// Display table: points, goal difference, goals scored, then lowest id.
pub fn league_table(teams: &[Team], fixtures: &[Fixture]) -> Vec<StandingRow> {
    let mut records: BTreeMap<TeamId, TeamRecord> = teams
        .iter()
        .map(|t| (t.id, TeamRecord::new(t.id)))
        .collect();

    for f in fixtures {
        let Some(outcome) = f.outcome() else {
            continue;
        };
        if let Some(home) = records.get_mut(&f.home_team_id) {
            home.record(outcome.home_goals, outcome.away_goals);
        }
        if let Some(away) = records.get_mut(&f.away_team_id) {
            away.record(outcome.away_goals, outcome.home_goals);
        }
    }

    let mut rows = teams
        .iter()
        .filter_map(|t| {
            let r = records.get(&t.id)?;
            Some(StandingRow {
                team_id: t.id,
                team_name: t.name.clone(),
                played: r.played,
                won: r.won,
                drawn: r.drawn,
                lost: r.lost,
                goals_for: r.goals_for,
                goals_against: r.goals_against,
                goal_difference: r.goals_for as i64 - r.goals_against as i64,
                points: r.points,
            })
        })
        .collect::<Vec<_>>();

    rows.sort_by(|a, b| compare_entries((a.team_id, &entry(a)), (b.team_id, &entry(b))));
    rows
}

fn entry(row: &StandingRow) -> TableEntry {
    TableEntry {
        points: row.points,
        goals_for: row.goals_for,
        goals_against: row.goals_against,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u32, name: &str) -> Team {
        Team {
            id,
            name: name.to_string(),
            attack: 60,
            defense: 60,
        }
    }

    fn played(id: u32, home: u32, away: u32, hg: u32, ag: u32) -> Fixture {
        let mut f = Fixture::new(id, 1, home, away);
        f.home_goals = Some(hg);
        f.away_goals = Some(ag);
        f
    }

    #[test]
    fn table_orders_by_points_then_goal_difference() {
        let teams = vec![team(1, "A"), team(2, "B"), team(3, "C"), team(4, "D")];
        let fixtures = vec![
            played(1, 1, 2, 1, 0),
            played(2, 3, 4, 4, 0),
            Fixture::new(3, 2, 1, 3),
        ];
        let table = league_table(&teams, &fixtures);
        let order = table.iter().map(|r| r.team_id).collect::<Vec<_>>();
        assert_eq!(order, vec![3, 1, 2, 4]);
        assert_eq!(table[0].goal_difference, 4);
        assert_eq!(table[0].played, 1);
        assert_eq!(table[3].lost, 1);
        assert_eq!(table[3].team_name, "D");
    }

    #[test]
    fn snapshot_includes_idle_teams() {
        let fixtures = vec![played(1, 1, 2, 2, 2)];
        let s = standings_from_fixtures([1, 2, 3], &fixtures);
        assert_eq!(s[&1].points, 1);
        assert_eq!(s[&2].points, 1);
        assert_eq!(s[&3].points, 0);
    }
}
