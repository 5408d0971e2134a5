//! Logging setup
//!
//! Diagnostics go to stderr so command output on stdout stays clean.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter, e.g. `memotrack=debug`
pub const LOG_ENV: &str = "MEMOTRACK_LOG";

static INITIALIZED: OnceLock<()> = OnceLock::new();

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Later calls do nothing.
pub fn init(verbosity: u8) {
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

        let result = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(verbosity > 1)
            .try_init();

        // Another subscriber (e.g. a test harness) already owns the global slot
        if let Err(e) = result {
            eprintln!("logging already initialized: {}", e);
        }
    });
}
