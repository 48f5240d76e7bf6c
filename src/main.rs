use std::sync::Arc;
use tracing::{error, info};

use sample_datasource::{api, config::Config, logging, metrics, DataSource, Result};

async fn run(config: Config) -> Result<()> {
    info!(?config, "Loaded configuration");

    let datasource = Arc::new(DataSource::from_config(&config)?);
    api::serve(&config.bind_address, datasource).await
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    if let Err(e) = logging::init_logger(env!("CARGO_CRATE_NAME"), config.json_logs) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Initialize metrics
    metrics::init_metrics();

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
