//! Tracing setup: structured logging with span definitions and event types.

pub mod events;
pub mod spans;

use std::sync::Once;

use tracing_subscriber::EnvFilter;
use warden_core::config::ObservabilityConfig;

/// Environment variable holding the log filter, e.g.
/// `WARDEN_LOG=warden_engine=debug,warden_tuning=info`.
pub const LOG_ENV_VAR: &str = "WARDEN_LOG";

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// `WARDEN_LOG` wins over `config.log_level` when set and valid. Output is
/// JSON unless `config.json` is false. Calling this more than once is a
/// no-op, and an already-installed global subscriber is left in place.
pub fn init_tracing(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let installed = if config.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if installed.is_err() {
            tracing::debug!("global tracing subscriber already installed");
        }
    });
}

/// Initialize tracing with an explicit filter string (tests, embedding).
pub fn init_tracing_with_filter(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .json()
        .try_init();
}
