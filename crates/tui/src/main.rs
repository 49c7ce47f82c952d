mod app;

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use anyhow::Result;
use gamedex_core::{
    config::{self, AppConfig},
    GraphQlClient,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    // One client for the whole process, like the browser app's client singleton.
    let client = Arc::new(GraphQlClient::new(config.endpoint.clone()));
    tracing::info!(endpoint = %client.endpoint(), "starting gamedex");

    let mut app = app::GamedexApp::new(client);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("gamedex.log");

    let env_filter = EnvFilter::from_default_env();

    // The terminal owns stdout while the UI is up, so logs go to file only.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
