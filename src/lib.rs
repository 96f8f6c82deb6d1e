pub mod config;
pub mod error;
pub mod goals;
pub mod lambda;
pub mod league_table;
pub mod logging;
pub mod model;
pub mod montecarlo;
pub mod schedule;
pub mod simulator;
pub mod sqlite_store;
pub mod standings;
pub mod store;
pub mod strength;
