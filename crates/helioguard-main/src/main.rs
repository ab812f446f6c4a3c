// Copyright (c) 2026 SOLARE S.R.O.
//
// This file is part of HelioGuard.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! HelioGuard entry point: wires the engine to the web surface

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use helioguard_core::{
    AlertTransport, DeviceDataSource, Engine, ForecastDataSource, OpenMeteoClient, SharedState,
    SmtpAlertTransport, VendorApiClient,
};
use helioguard_types::AppConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_CONFIG_PATH: &str = "./helioguard.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Handle command line arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("HelioGuard - Solar Site Monitor");
                println!("Version: {VERSION}");
                println!();
                println!("Usage: helioguard [CONFIG_PATH]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{VERSION}");
                return Ok(());
            }
            _ => {}
        }
    }

    // Initialize tracing with env filter support
    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config_path = args
        .get(1)
        .cloned()
        .or_else(|| std::env::var("HELIOGUARD_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = AppConfig::from_file(&config_path)?;
    let tz = config.tz()?;

    info!("🚀 Starting HelioGuard v{VERSION}");
    info!("📋 Configuration Summary:");
    info!("   Site: {} ({}, {})", config.site.name, config.site.latitude, config.site.longitude);
    info!("   Timezone: {}", config.site.timezone);
    info!("   Devices: {}", config.devices.len());
    for device in &config.devices {
        info!(
            "     - {} ({}) [{}]",
            device.label, device.serial, device.role
        );
    }
    info!("   Poll interval: {}min", config.poll.interval_minutes);
    info!(
        "   Alerts: email {}",
        if config.email.is_some() { "configured" } else { "disabled" }
    );

    // Collaborators
    let devices: Arc<dyn DeviceDataSource> = Arc::new(VendorApiClient::new(&config.vendor)?);
    let weather: Arc<dyn ForecastDataSource> = Arc::new(OpenMeteoClient::new(
        config.site.latitude,
        config.site.longitude,
        tz,
    )?);
    let transport: Option<Arc<dyn AlertTransport>> = match config.email {
        Some(ref settings) => match SmtpAlertTransport::from_settings(settings) {
            Ok(mailer) => Some(Arc::new(mailer)),
            Err(e) => {
                warn!("Email delivery disabled: {e}");
                None
            }
        },
        None => None,
    };

    // Shared state and the command channel into the engine loop
    let shared = SharedState::new(Utc::now());
    let (command_tx, command_rx) = mpsc::channel(16);

    let engine = Engine::new(
        config.clone(),
        devices,
        weather,
        transport,
        shared.clone(),
    )?;
    let engine_task = tokio::spawn(engine.run(command_rx));

    let web_state = helioguard_web::AppState {
        shared,
        commands: command_tx,
        site_name: config.site.name.clone(),
        tz,
    };

    tokio::select! {
        result = helioguard_web::start_web_server(
            web_state,
            &config.web.bind_address,
            config.web.port,
        ) => {
            if let Err(e) = result {
                error!("Web server failed: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    engine_task.abort();
    info!("Shutting down");
    Ok(())
}
