// role-assistant/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset: our crate at info, HTTP internals quieter.
const DEFAULT_FILTER: &str = "info,role_assistant=info,hyper=warn,reqwest=warn";

/// Install the global fmt subscriber. Returns `false` if one was already set.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
