use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::error::StoreError;
use crate::league_table::standings_from_fixtures;
use crate::model::{Fixture, MatchId, Team, TeamId, TeamStrength};
use crate::schedule::double_round_robin;
use crate::standings::StandingsSnapshot;
use crate::store::{
    MatchResultSink, PredictionSink, RemainingFixtureProvider, StandingsProvider,
    TeamStrengthProvider,
};

pub struct SqliteStore {
    conn: Connection,
}

pub fn default_teams() -> Vec<Team> {
    [
        (1, "Manchester City", 80, 75),
        (2, "Liverpool", 70, 70),
        (3, "Chelsea", 60, 60),
        (4, "Arsenal", 50, 50),
    ]
    .into_iter()
    .map(|(id, name, attack, defense)| Team {
        id,
        name: name.to_string(),
        attack,
        defense,
    })
    .collect()
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Wipe the league and start a new season for `teams`: rating-derived
    /// strengths plus a double round-robin schedule, all in one transaction.
    pub fn seed_league(&mut self, teams: &[Team]) -> Result<()> {
        let ids = teams.iter().map(|t| t.id).collect::<Vec<_>>();
        let fixtures = double_round_robin(&ids, 1)?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction().context("begin seed transaction")?;
        tx.execute_batch(
            r#"
            DELETE FROM predictions;
            DELETE FROM team_stats;
            DELETE FROM matches;
            DELETE FROM teams;
            "#,
        )
        .context("clear league tables")?;

        for team in teams {
            tx.execute(
                "INSERT INTO teams(id, name, attack, defense) VALUES (?1, ?2, ?3, ?4)",
                params![team.id as i64, team.name, team.attack, team.defense],
            )
            .with_context(|| format!("insert team {}", team.id))?;

            let s = TeamStrength::from_ratings(team);
            tx.execute(
                "INSERT INTO team_stats(team_id, attack_strength, defense_strength, avg_scored, avg_conceded, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    s.team_id as i64,
                    s.attack_strength,
                    s.defense_strength,
                    s.avg_scored,
                    s.avg_conceded,
                    now
                ],
            )
            .with_context(|| format!("insert team stats {}", team.id))?;
        }

        for f in &fixtures {
            tx.execute(
                "INSERT INTO matches(id, week, home_team_id, away_team_id, home_goals, away_goals, played_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, NULL, NULL)",
                params![
                    f.id as i64,
                    f.week as i64,
                    f.home_team_id as i64,
                    f.away_team_id as i64
                ],
            )
            .with_context(|| format!("insert match {}", f.id))?;
        }
        tx.commit().context("commit seed transaction")?;

        info!(teams = teams.len(), matches = fixtures.len(), "league seeded");
        Ok(())
    }

    pub fn teams(&self) -> Result<Vec<Team>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, attack, defense FROM teams ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Team {
                id: row.get::<_, u32>(0)?,
                name: row.get(1)?,
                attack: row.get(2)?,
                defense: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn team_count(&self) -> Result<usize, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get::<_, i64>(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Every fixture, played or not, ordered by (week, id).
    pub fn fixtures(&self, week: Option<u32>) -> Result<Vec<Fixture>, StoreError> {
        self.load_fixtures(week, false)
    }

    /// Stored probabilities for `week`, `None` when nothing has been saved.
    pub fn predictions(&self, week: u32) -> Result<Option<BTreeMap<TeamId, f64>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT team_id, probability FROM predictions WHERE week = ?1 ORDER BY team_id ASC",
        )?;
        let rows = stmt.query_map(params![week as i64], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (team_id, probability) = row?;
            out.insert(team_id, probability);
        }
        Ok((!out.is_empty()).then_some(out))
    }

    fn load_fixtures(
        &self,
        week: Option<u32>,
        unplayed_only: bool,
    ) -> Result<Vec<Fixture>, StoreError> {
        let mut sql = String::from(
            "SELECT id, week, home_team_id, away_team_id, home_goals, away_goals, played_at
             FROM matches WHERE (?1 IS NULL OR week = ?1)",
        );
        if unplayed_only {
            sql.push_str(" AND home_goals IS NULL AND away_goals IS NULL");
        }
        sql.push_str(" ORDER BY week ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![week.map(|w| w as i64)], |row| {
            Ok(Fixture {
                id: row.get::<_, u32>(0)?,
                week: row.get::<_, u32>(1)?,
                home_team_id: row.get::<_, u32>(2)?,
                away_team_id: row.get::<_, u32>(3)?,
                home_goals: row.get::<_, Option<u32>>(4)?,
                away_goals: row.get::<_, Option<u32>>(5)?,
                played_at: parse_timestamp(6, row.get::<_, Option<String>>(6)?)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            attack INTEGER NOT NULL,
            defense INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS team_stats (
            team_id INTEGER PRIMARY KEY REFERENCES teams(id),
            attack_strength REAL NOT NULL,
            defense_strength REAL NOT NULL,
            avg_scored REAL NOT NULL,
            avg_conceded REAL NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY,
            week INTEGER NOT NULL,
            home_team_id INTEGER NOT NULL REFERENCES teams(id),
            away_team_id INTEGER NOT NULL REFERENCES teams(id),
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            played_at TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_week ON matches(week);
        CREATE TABLE IF NOT EXISTS predictions (
            week INTEGER NOT NULL,
            team_id INTEGER NOT NULL REFERENCES teams(id),
            probability REAL NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (week, team_id)
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn parse_timestamp(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
            })
    })
    .transpose()
}

impl TeamStrengthProvider for SqliteStore {
    fn strength(&self, team_id: TeamId) -> Result<TeamStrength, StoreError> {
        self.conn
            .query_row(
                "SELECT attack_strength, defense_strength, avg_scored, avg_conceded
                 FROM team_stats WHERE team_id = ?1",
                params![team_id as i64],
                |row| {
                    Ok(TeamStrength {
                        team_id,
                        attack_strength: row.get(0)?,
                        defense_strength: row.get(1)?,
                        avg_scored: row.get(2)?,
                        avg_conceded: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("team stats for team {team_id}")))
    }
}

impl RemainingFixtureProvider for SqliteStore {
    fn list_unplayed(&self, week: Option<u32>) -> Result<Vec<Fixture>, StoreError> {
        self.load_fixtures(week, true)
    }

    fn count_unplayed(&self) -> Result<usize, StoreError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM matches WHERE home_goals IS NULL AND away_goals IS NULL",
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl StandingsProvider for SqliteStore {
    fn current_standings(&self) -> Result<StandingsSnapshot, StoreError> {
        let ids = self.teams()?.into_iter().map(|t| t.id).collect::<Vec<_>>();
        let fixtures = self.load_fixtures(None, false)?;
        Ok(standings_from_fixtures(ids, &fixtures))
    }
}

impl MatchResultSink for SqliteStore {
    fn record_result(
        &self,
        match_id: MatchId,
        home_goals: u32,
        away_goals: u32,
        played_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE matches SET home_goals = ?1, away_goals = ?2, played_at = ?3 WHERE id = ?4",
            params![
                home_goals as i64,
                away_goals as i64,
                played_at.to_rfc3339(),
                match_id as i64
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("match {match_id}")));
        }
        Ok(())
    }
}

impl PredictionSink for SqliteStore {
    fn replace_week_predictions(
        &self,
        week: u32,
        probabilities: &BTreeMap<TeamId, f64>,
    ) -> Result<(), StoreError> {
        let created_at = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM predictions WHERE week = ?1", params![week as i64])?;
        for (team_id, probability) in probabilities {
            tx.execute(
                "INSERT INTO predictions(week, team_id, probability, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![week as i64, *team_id as i64, probability, created_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

pub fn ensure_seeded(store: &SqliteStore) -> Result<()> {
    if store.team_count()? == 0 {
        return Err(anyhow!("league not initialised, run `league_sim init` first"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.seed_league(&default_teams()).unwrap();
        store
    }

    #[test]
    fn seeding_creates_schedule_and_stats() {
        let store = seeded();
        assert_eq!(store.team_count().unwrap(), 4);
        assert_eq!(store.fixtures(None).unwrap().len(), 12);
        assert_eq!(store.count_unplayed().unwrap(), 12);
        let s = store.strength(1).unwrap();
        assert!((s.attack_strength - 80.0 / 75.0).abs() < 1e-12);
        assert!((s.defense_strength - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_stats_are_not_found() {
        let store = seeded();
        assert!(matches!(store.strength(99), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn recorded_result_round_trips() {
        let store = seeded();
        let at = Utc::now();
        store.record_result(1, 3, 1, at).unwrap();
        let week1 = store.fixtures(Some(1)).unwrap();
        let played = week1.iter().find(|f| f.id == 1).unwrap();
        assert_eq!(played.home_goals, Some(3));
        assert_eq!(played.away_goals, Some(1));
        assert_eq!(
            played.played_at.map(|t| t.timestamp()),
            Some(at.timestamp())
        );
        assert_eq!(store.list_unplayed(Some(1)).unwrap().len(), 1);
        assert!(matches!(
            store.record_result(500, 0, 0, at),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn reseeding_clears_previous_season() {
        let mut store = seeded();
        store.record_result(1, 1, 0, Utc::now()).unwrap();
        store
            .replace_week_predictions(4, &BTreeMap::from([(1, 100.0)]))
            .unwrap();
        store.seed_league(&default_teams()).unwrap();
        assert_eq!(store.count_unplayed().unwrap(), 12);
        assert!(store.predictions(4).unwrap().is_none());
    }

    #[test]
    fn half_recorded_match_is_not_unplayed() {
        let store = seeded();
        store
            .conn
            .execute("UPDATE matches SET home_goals = 1 WHERE id = 1", [])
            .unwrap();
        assert_eq!(store.count_unplayed().unwrap(), 11);
        let week1 = store.list_unplayed(Some(1)).unwrap();
        assert_eq!(week1.iter().map(|f| f.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn empty_database_is_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(ensure_seeded(&store).is_err());
        assert!(ensure_seeded(&seeded()).is_ok());
    }
}
