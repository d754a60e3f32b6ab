//! Logging initialization, grounded in the teacher's layered
//! `tracing_subscriber` setup in `main.rs`. The teacher builds a
//! colorized stdout layer plus a rolling file layer for a benchmark run
//! that starts, prints a report, and exits; `rsm`/`ccu` are long-running
//! daemons instead, so this keeps the teacher's verbosity-to-level
//! mapping and registry-based init but drops the `colored`/
//! `tracing-appender` dependencies in favor of one `fmt` layer on stderr
//! driven by an `EnvFilter`, as documented in the ambient-stack notes.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber. `verbose` follows the same
/// `-v` counting convention as the teacher's CLI:
/// - 0: INFO
/// - 1: DEBUG
/// - 2+: TRACE
///
/// `RUST_LOG`, if set, overrides this default entirely.
pub fn init(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
