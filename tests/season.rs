use league_sim::error::SimError;
use league_sim::model::{Fixture, Team};
use league_sim::simulator::SeasonDriver;
use league_sim::sqlite_store::{SqliteStore, default_teams};
use league_sim::store::{InMemoryStore, LeagueStore, RemainingFixtureProvider, StandingsProvider};

fn four_clubs() -> Vec<Team> {
    [("A", 80, 75), ("B", 70, 70), ("C", 60, 60), ("D", 50, 50)]
        .into_iter()
        .zip(1..)
        .map(|((name, attack, defense), id)| Team {
            id,
            name: name.to_string(),
            attack,
            defense,
        })
        .collect()
}

fn assert_full_season<S: LeagueStore + ?Sized>(store: &S, fixtures: &[Fixture]) {
    assert_eq!(store.count_unplayed().unwrap(), 0);
    assert_eq!(fixtures.len(), 12);
    for team in 1..=4 {
        let played = fixtures
            .iter()
            .filter(|f| f.home_team_id == team || f.away_team_id == team)
            .filter(|f| f.outcome().is_some())
            .count();
        assert_eq!(played, 6, "team {team}");
    }

    let standings = store.current_standings().unwrap();
    let scored: u32 = standings.values().map(|e| e.goals_for).sum();
    let conceded: u32 = standings.values().map(|e| e.goals_against).sum();
    assert_eq!(scored, conceded);
    assert!(fixtures.iter().all(|f| f.played_at.is_some()));
    assert!(
        fixtures
            .iter()
            .filter_map(|f| f.outcome())
            .all(|o| o.home_goals <= 8 && o.away_goals <= 8)
    );
}

#[test]
fn full_season_in_memory() {
    let store = InMemoryStore::with_league(four_clubs()).unwrap();
    let reports = SeasonDriver::new(&store, 2024).play_all_remaining_weeks().unwrap();
    assert_eq!(reports.len(), 6);
    assert_eq!(
        reports.iter().map(|r| r.week).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6]
    );
    assert_full_season(&store, &store.fixtures().unwrap());
}

#[test]
fn full_season_in_sqlite() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.seed_league(&default_teams()).unwrap();
    let reports = SeasonDriver::new(&store, 7).play_all_remaining_weeks().unwrap();
    assert_eq!(reports.len(), 6);
    assert!(reports.iter().all(|r| r.failed_saves().is_empty()));
    assert_full_season(&store, &store.fixtures(None).unwrap());
}

#[test]
fn finished_season_has_nothing_to_play() {
    let store = InMemoryStore::with_league(four_clubs()).unwrap();
    let driver = SeasonDriver::new(&store, 1);
    driver.play_all_remaining_weeks().unwrap();
    assert!(matches!(
        driver.play_next_week(),
        Err(SimError::NoUnplayedMatches)
    ));
    // A second full run is a no-op rather than an error.
    assert!(driver.play_all_remaining_weeks().unwrap().is_empty());
}

#[test]
fn store_that_never_records_stalls() {
    let store = InMemoryStore::with_league(four_clubs()).unwrap();
    store.freeze_results();
    let err = SeasonDriver::new(&store, 3)
        .play_all_remaining_weeks()
        .unwrap_err();
    match err {
        SimError::ProgressStall { week, unplayed } => {
            assert_eq!(week, 1);
            assert_eq!(unplayed, 12);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn one_failed_save_does_not_abort_the_week() {
    let store = InMemoryStore::with_league(four_clubs()).unwrap();
    store.fail_writes_for(1);
    let report = SeasonDriver::new(&store, 5).play_next_week().unwrap();
    assert_eq!(report.week, 1);
    assert_eq!(report.matches.len(), 2);
    assert_eq!(report.failed_saves(), vec![1]);

    let week1 = store.list_unplayed(Some(1)).unwrap();
    assert_eq!(week1.len(), 1);
    assert_eq!(week1[0].id, 1);
    assert_eq!(store.count_unplayed().unwrap(), 11);
}

#[test]
fn persistently_failing_match_eventually_stalls() {
    let store = InMemoryStore::with_league(four_clubs()).unwrap();
    store.fail_writes_for(1);
    let err = SeasonDriver::new(&store, 5)
        .play_all_remaining_weeks()
        .unwrap_err();
    // Week 1 keeps coming back with match 1 unsaved: first pass saves the
    // other fixture, the second pass makes no progress.
    assert!(matches!(
        err,
        SimError::ProgressStall {
            week: 1,
            unplayed: 11
        }
    ));
}
