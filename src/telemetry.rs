//! Log output via `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

use crate::config::DispatchConfig;

/// Install a formatting subscriber filtered by `config.log_filter`.
///
/// Returns `false` if a global subscriber was already installed (the
/// existing one is kept). An unparsable filter falls back to `info`.
pub fn init(config: &DispatchConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {}", config.log_filter, err);
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
