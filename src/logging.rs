use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Install the global subscriber once. Filter comes from `LEAGUE_SIM_LOG`
/// (e.g. `league_sim=debug`), falling back to `league_sim=info`.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("LEAGUE_SIM_LOG")
            .unwrap_or_else(|_| EnvFilter::new("league_sim=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
