use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{DataSourceError, Result};

/// Sets up the logging subscriber for the application.
///
/// `RUST_LOG` takes precedence; otherwise `service` logs at INFO.
///
/// # Arguments
/// * `service` - Target name of the binary, usually its crate name
/// * `json` - Emit JSON lines instead of the compact human format
pub fn init_logger(service: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", service, Level::INFO)));

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = if json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_names(true)
                    .with_level(true)
                    .with_ansi(true)
                    .compact(),
            )
            .try_init()
    };

    initialized.map_err(|e| DataSourceError::Internal(format!("Failed to initialize logger: {}", e)))
}
