use std::env;
use std::path::PathBuf;

use crate::montecarlo::{DEFAULT_ITERATIONS, clamp_iterations};

const CACHE_DIR: &str = "league_sim";
const DB_FILE: &str = "league.sqlite";

/// Runtime settings read from the environment. The binary loads `.env.local`
/// and `.env` through dotenvy before calling [`SimConfig::from_env`]; command
/// line flags are applied on top afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub db_path: Option<PathBuf>,
    pub iterations: u32,
    pub seed: Option<u64>,
    pub parallelism: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            parallelism: default_parallelism(),
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        let db_path = env::var("LEAGUE_SIM_DB")
            .ok()
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .map(PathBuf::from)
            .or_else(default_db_path);
        let iterations = env_parse::<u32>("LEAGUE_SIM_ITERATIONS")
            .map(clamp_iterations)
            .unwrap_or(DEFAULT_ITERATIONS);
        let seed = env_parse::<u64>("LEAGUE_SIM_SEED");
        let parallelism = env_parse::<usize>("SIM_PARALLELISM")
            .map(clamp_parallelism)
            .unwrap_or_else(default_parallelism);
        Self {
            db_path,
            iterations,
            seed,
            parallelism,
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = clamp_iterations(iterations);
        self
    }
}

/// `$XDG_CACHE_HOME/league_sim/league.sqlite`, else under `~/.cache`.
pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR).join(DB_FILE));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(DB_FILE))
}

pub fn clamp_parallelism(workers: usize) -> usize {
    workers.clamp(1, 64)
}

fn default_parallelism() -> usize {
    clamp_parallelism(rayon::current_num_threads())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallelism_is_bounded() {
        assert_eq!(clamp_parallelism(0), 1);
        assert_eq!(clamp_parallelism(8), 8);
        assert_eq!(clamp_parallelism(500), 64);
    }

    #[test]
    fn builder_clamps_iterations() {
        let cfg = SimConfig::default().with_iterations(50);
        assert_eq!(cfg.iterations, 1000);
        let cfg = SimConfig::default().with_iterations(9000);
        assert_eq!(cfg.iterations, 5000);
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.iterations, DEFAULT_ITERATIONS);
        assert!(cfg.seed.is_none());
        assert!((1..=64).contains(&cfg.parallelism));
    }
}
