// ABOUTME: Server binary for the Gatewarden credential core
// ABOUTME: Loads configuration, wires resources, and serves the HTTP API with a periodic sweep
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Gatewarden Server Binary
//!
//! Starts the credential core HTTP API with validated configuration and a
//! background sweep that purges expired OTP challenges and reset tokens.
//! Correctness never depends on the sweep; expiry is enforced at
//! verification time.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use gatewarden::config::ServerConfig;
use gatewarden::database::Database;
use gatewarden::delivery::{DeliveryChannel, EmailChannel, SmsChannel};
use gatewarden::logging;
use gatewarden::resources::ServerResources;
use gatewarden::routes;

/// Interval between expired-credential sweeps
const SWEEP_INTERVAL_SECS: u64 = 600;

#[derive(Parser)]
#[command(name = "gatewarden-server")]
#[command(about = "Gatewarden - credential and PII-protection core for admin portals")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Gatewarden credential core");
    info!("{}", config.summary());

    // Fail startup loudly on missing production secrets rather than
    // silently degrading to generated keys
    config.validate()?;

    let database = Arc::new(
        Database::new(&config.database_url.to_connection_string()).await?,
    );
    info!("Database initialized and migrated");

    let email: Arc<dyn DeliveryChannel> =
        Arc::new(EmailChannel::new(config.delivery.email.clone()));
    let sms: Arc<dyn DeliveryChannel> = Arc::new(SmsChannel::new(config.delivery.sms.clone()));

    let resources = Arc::new(ServerResources::new(config, database.clone(), email, sms)?);

    spawn_expiry_sweep(database);

    let addr = SocketAddr::from(([0, 0, 0, 0], resources.config.http_port));
    let app = routes::router(resources);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Periodically remove expired OTP challenges and reset tokens
fn spawn_expiry_sweep(database: Arc<Database>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let now = Utc::now();

            match database.purge_expired_challenges(now).await {
                Ok(purged) if purged > 0 => info!(purged, "swept expired otp challenges"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "otp challenge sweep failed"),
            }

            match database.purge_expired_reset_tokens(now).await {
                Ok(purged) if purged > 0 => info!(purged, "swept expired reset tokens"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "reset token sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
