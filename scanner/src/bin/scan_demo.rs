//! Scan demo
//!
//! Feeds QR texts read from stdin (one per line) through the scan flow
//! against the configured backend and prints every result route as JSON.
//!
//! # Usage
//!
//! ```bash
//! echo 'idEntrada:E123|mdQr:QR456' | PUERTA_API_BASE_URL=http://localhost:8080/api \
//!     cargo run --bin scan-demo
//! ```

use anyhow::Context;
use puerta_core::environment::SystemClock;
use puerta_runtime::Store;
use puerta_scanner::environment::StaticPermissions;
use puerta_scanner::types::{CameraPhase, PermissionStatus};
use puerta_scanner::{
    HttpEntradaApi, Navigator, ResultRoute, ScanAction, ScanEnvironment, ScanReducer, ScanState,
    ScannerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints each route as one JSON line on stdout
struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn navigate(&self, route: ResultRoute) {
        match serde_json::to_string(&route) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::warn!(%error, "Could not serialize result route"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = ScannerConfig::from_env();
    config.validate().context("invalid scanner configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(base_url = %config.api.base_url, "Configuration loaded");

    let api = HttpEntradaApi::from_config(&config.api).context("building backend client")?;
    let env = ScanEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(api),
        Arc::new(StaticPermissions(PermissionStatus::Granted)),
        Arc::new(StdoutNavigator),
    )
    .with_currency(config.currency.format()?)
    .with_settings(config.scan);

    let store = Store::new(ScanState::from_settings(&config.scan), ScanReducer::new(), env);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(raw) = lines.next_line().await? {
        store.send(ScanAction::OpenCamera).await?;
        store.send(ScanAction::StartReading).await?;

        let mut handle = store.send(ScanAction::CodeScanned { raw }).await?;
        handle.wait().await;

        // Navigation runs as its own effect once the result is reduced
        while store.pending_effects() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        if store.state(|s| s.camera != CameraPhase::Closed).await {
            tracing::info!("Frame ignored (duplicate or blank)");
            store.send(ScanAction::CloseCamera).await?;
        }
    }

    let scanned = store.state(|s| s.history.len()).await;
    tracing::info!(scanned, "Input exhausted, shutting down");
    store.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
