//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Environment variable that turns on debug logging.
pub const NETCUT_DEBUG_ENV: &str = "NETCUT_DEBUG";

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence when set; otherwise debug output is enabled by
/// `force_debug` or the `NETCUT_DEBUG` environment variable.
pub fn init_logging(force_debug: bool) {
    let debug_enabled = force_debug || std::env::var_os(NETCUT_DEBUG_ENV).is_some();

    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(default_directives(debug_enabled)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(debug_enabled)
        .without_time()
        .try_init()
        .ok();
}

fn default_directives(debug: bool) -> &'static str {
    if debug {
        "netcut=debug,warn"
    } else {
        "netcut=info,warn"
    }
}
