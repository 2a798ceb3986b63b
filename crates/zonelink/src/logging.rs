//! Subscriber setup for applications.

use tracing_subscriber::EnvFilter;
use zonelink_session::SessionConfig;

/// Targets raised to `debug` when the config's `debug` flag is set.
const CRATE_TARGETS: [&str; 4] = [
    "zonelink",
    "zonelink_protocol",
    "zonelink_transport",
    "zonelink_session",
];

/// Builds the filter `init_logging` installs.
///
/// `RUST_LOG` wins when set and valid. Otherwise the config's log level
/// is the default, with the Zonelink crates at `debug` if `debug` is on.
pub fn env_filter(config: &SessionConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(config)))
}

fn directives(config: &SessionConfig) -> String {
    let mut directives = vec![config.log_level.as_directive().to_string()];
    if config.debug {
        directives.extend(CRATE_TARGETS.iter().map(|target| format!("{target}=debug")));
    }
    directives.join(",")
}

/// Installs a `fmt` subscriber filtered per [`env_filter`].
///
/// Does nothing if a global subscriber is already set, so calling it
/// more than once is harmless.
pub fn init_logging(config: &SessionConfig) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .try_init();
    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
