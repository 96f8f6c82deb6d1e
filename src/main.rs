use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use league_sim::config::SimConfig;
use league_sim::league_table::{StandingRow, league_table};
use league_sim::logging::init_tracing;
use league_sim::model::{ChampionshipEstimate, Fixture, TeamId};
use league_sim::montecarlo::{MonteCarloEngine, clamp_iterations, predict_week};
use league_sim::schedule::prediction_week_bounds;
use league_sim::simulator::{SeasonDriver, WeekReport};
use league_sim::sqlite_store::{SqliteStore, default_teams, ensure_seeded};

const USAGE: &str = "usage: league_sim <init|next|all|predict|standings|matches> \
[--db=PATH] [--week N] [--iterations N] [--seed N] [--json] [--refresh]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Init,
    Next,
    All,
    Predict,
    Standings,
    Matches,
}

#[derive(Debug, Default)]
struct CliArgs {
    command: Option<Command>,
    db_path: Option<PathBuf>,
    week: Option<u32>,
    iterations: Option<u32>,
    seed: Option<u64>,
    json: bool,
    refresh: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cli = parse_args(&args)?;
    let Some(command) = cli.command else {
        return Err(anyhow!("missing command\n{USAGE}"));
    };

    let mut config = SimConfig::from_env();
    if let Some(iterations) = cli.iterations {
        config = config.with_iterations(iterations);
    }
    let db_path = cli
        .db_path
        .clone()
        .or_else(|| config.db_path.clone())
        .context("unable to resolve sqlite path")?;
    let seed = cli
        .seed
        .or(config.seed)
        .unwrap_or_else(|| rand::thread_rng().next_u64());

    let mut store = SqliteStore::open(&db_path)?;
    if command == Command::Init {
        store.seed_league(&default_teams())?;
        if !cli.json {
            println!("League initialised");
            println!("DB: {}", db_path.display());
        }
        return print_standings(&store, cli.json);
    }
    ensure_seeded(&store)?;

    match command {
        Command::Init => Ok(()),
        Command::Next => {
            let report = SeasonDriver::new(&store, seed).play_next_week()?;
            print_reports(&store, &[report], cli.json)
        }
        Command::All => {
            let reports = SeasonDriver::new(&store, seed).play_all_remaining_weeks()?;
            print_reports(&store, &reports, cli.json)
        }
        Command::Predict => {
            let week = cli.week.context("predict needs --week N")?;
            let teams = store.teams()?;
            let (first, last) = prediction_week_bounds(teams.len());
            if week < first || week > last {
                return Err(anyhow!(
                    "predictions are only available for weeks {first}..={last}, got {week}"
                ));
            }

            let stored = if cli.refresh {
                None
            } else {
                store.predictions(week)?
            };
            let estimate = match stored {
                Some(probabilities) => ChampionshipEstimate {
                    iterations: 0,
                    probabilities,
                },
                None => {
                    let engine = MonteCarloEngine::new(config.parallelism);
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    predict_week(
                        &store,
                        &engine,
                        week,
                        clamp_iterations(config.iterations),
                        &mut rng,
                    )?
                }
            };
            print_prediction(&store, week, &estimate, cli.json)
        }
        Command::Standings => print_standings(&store, cli.json),
        Command::Matches => print_matches(&store, cli.week, cli.json),
    }
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        let (key, inline) = match arg.split_once('=') {
            Some((k, v)) => (k, Some(v.to_string())),
            None => (arg, None),
        };
        let mut value = |name: &str| -> Result<String> {
            if let Some(v) = inline.clone() {
                return Ok(v);
            }
            idx += 1;
            args.get(idx)
                .cloned()
                .with_context(|| format!("{name} needs a value"))
        };
        match key {
            "--db" => {
                let raw = value("--db")?;
                if !raw.trim().is_empty() {
                    cli.db_path = Some(PathBuf::from(raw.trim()));
                }
            }
            "--week" => cli.week = Some(parse_number(&value("--week")?, "--week")?),
            "--iterations" => {
                cli.iterations = Some(parse_number(&value("--iterations")?, "--iterations")?)
            }
            "--seed" => cli.seed = Some(parse_number(&value("--seed")?, "--seed")?),
            "--json" => cli.json = true,
            "--refresh" => cli.refresh = true,
            "-h" | "--help" => return Err(anyhow!("{USAGE}")),
            other if other.starts_with("--") => {
                return Err(anyhow!("unknown flag {other}\n{USAGE}"));
            }
            other => {
                if cli.command.is_some() {
                    return Err(anyhow!("unexpected argument {other}\n{USAGE}"));
                }
                cli.command = Some(parse_command(other)?);
            }
        }
        idx += 1;
    }
    Ok(cli)
}

fn parse_command(raw: &str) -> Result<Command> {
    match raw {
        "init" => Ok(Command::Init),
        "next" => Ok(Command::Next),
        "all" => Ok(Command::All),
        "predict" => Ok(Command::Predict),
        "standings" => Ok(Command::Standings),
        "matches" => Ok(Command::Matches),
        other => Err(anyhow!("unknown command {other}\n{USAGE}")),
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| anyhow!("{flag} expects a number, got {raw:?}"))
}

fn team_names(store: &SqliteStore) -> Result<HashMap<TeamId, String>> {
    Ok(store
        .teams()?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect())
}

fn name_of(names: &HashMap<TeamId, String>, id: TeamId) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("team {id}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}

fn print_reports(store: &SqliteStore, reports: &[WeekReport], json: bool) -> Result<()> {
    if json {
        return print_json(&reports);
    }
    let names = team_names(store)?;
    for report in reports {
        println!("Week {}", report.week);
        for m in &report.matches {
            let flag = if m.saved { "" } else { "  (not saved)" };
            println!(
                "  {:<18} {} - {} {:<18}{}",
                name_of(&names, m.home_team_id),
                m.outcome.home_goals,
                m.outcome.away_goals,
                name_of(&names, m.away_team_id),
                flag
            );
        }
    }
    Ok(())
}

fn print_standings(store: &SqliteStore, json: bool) -> Result<()> {
    let teams = store.teams()?;
    let fixtures = store.fixtures(None)?;
    let rows: Vec<StandingRow> = league_table(&teams, &fixtures);
    if json {
        return print_json(&rows);
    }
    println!(
        "{:<3} {:<18} {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>4} {:>4}",
        "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    );
    for (pos, r) in rows.iter().enumerate() {
        println!(
            "{:<3} {:<18} {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>4} {:>4}",
            pos + 1,
            r.team_name,
            r.played,
            r.won,
            r.drawn,
            r.lost,
            r.goals_for,
            r.goals_against,
            r.goal_difference,
            r.points
        );
    }
    Ok(())
}

fn print_matches(store: &SqliteStore, week: Option<u32>, json: bool) -> Result<()> {
    let fixtures: Vec<Fixture> = store.fixtures(week)?;
    if json {
        return print_json(&fixtures);
    }
    let names = team_names(store)?;
    let mut current_week = None;
    for f in &fixtures {
        if current_week != Some(f.week) {
            println!("Week {}", f.week);
            current_week = Some(f.week);
        }
        let score = match f.outcome() {
            Some(o) => format!("{} - {}", o.home_goals, o.away_goals),
            None => "v".to_string(),
        };
        println!(
            "  {:<18} {:^7} {:<18}",
            name_of(&names, f.home_team_id),
            score,
            name_of(&names, f.away_team_id)
        );
    }
    Ok(())
}

fn print_prediction(
    store: &SqliteStore,
    week: u32,
    estimate: &ChampionshipEstimate,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(estimate);
    }
    let names = team_names(store)?;
    if estimate.iterations > 0 {
        println!("Championship odds after week {week} ({} runs)", estimate.iterations);
    } else {
        println!("Championship odds after week {week} (stored)");
    }
    for (team_id, pct) in estimate.ranked() {
        println!("  {:<18} {:>6.2}%", name_of(&names, team_id), pct);
    }
    Ok(())
}
