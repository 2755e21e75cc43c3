use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "SVGAPP_LOG";

/// Install the stderr subscriber. Stdout is left to the build summary.
///
/// Filter directives come from `SVGAPP_LOG` (e.g. `debug`,
/// `coordinator=debug,warn`); the default is `info`. Calling this twice is a
/// no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
