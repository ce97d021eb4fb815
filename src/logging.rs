//! Subscriber setup for the command-line binary.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbosity` (the number of `-v`
/// flags) picks the level for this crate.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pbxproj_fix={level}")));

    let result = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .without_time()
        .try_init();

    if let Err(err) = result {
        eprintln!("Warning: logger initialization failed: {err}");
    }
}
