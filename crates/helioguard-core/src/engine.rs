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

//! Polling orchestrator
//!
//! One cycle: refresh the forecast when due, poll every configured device
//! concurrently (each fetch individually timed out), aggregate, publish the
//! snapshot and history, analyze the outlook, evaluate and dispatch alerts,
//! sleep until the next tick. A cycle that errors is logged and the loop
//! carries on; process shutdown is the only way out.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::alerts::{self, AlertDispatcher};
use crate::error::{EngineError, Result};
use crate::history::RollingHistory;
use crate::normalize;
use crate::outlook;
use crate::state::{HistoryView, SharedState, WeatherView};
use crate::traits::{AlertTransport, DeviceDataSource, ForecastDataSource};
use crate::vendor::RawDeviceSnapshot;
use helioguard_types::{
    AggregateTotals, AppConfig, BackupTier, DeviceReading, DeviceRole, ForecastDiagnostics,
    ForecastStatus, Snapshot,
};

/// Refresh the forecast when the last success is older than this
fn forecast_refresh_interval() -> TimeDelta {
    TimeDelta::minutes(30)
}

/// Requests the web surface sends into the single-writer loop
#[derive(Debug)]
pub enum EngineCommand {
    /// Out-of-band forecast refresh; replies with the resulting diagnostics
    RefreshForecast {
        reply: oneshot::Sender<ForecastDiagnostics>,
    },
}

pub struct Engine {
    config: AppConfig,
    tz: Tz,
    devices: Arc<dyn DeviceDataSource>,
    weather: Arc<dyn ForecastDataSource>,
    dispatcher: AlertDispatcher,
    shared: SharedState,
    history: RollingHistory,
    /// Last successful contact per serial, for communication-loss detection
    last_contact: HashMap<String, DateTime<Utc>>,
    forecast: Option<helioguard_types::Forecast>,
    diagnostics: ForecastDiagnostics,
    last_forecast_success: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("devices", &self.config.devices.len())
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        config: AppConfig,
        devices: Arc<dyn DeviceDataSource>,
        weather: Arc<dyn ForecastDataSource>,
        transport: Option<Arc<dyn AlertTransport>>,
        shared: SharedState,
    ) -> anyhow::Result<Self> {
        let tz = config.tz()?;
        Ok(Self {
            config,
            tz,
            devices,
            weather,
            dispatcher: AlertDispatcher::new(transport),
            shared,
            history: RollingHistory::new(),
            last_contact: HashMap::new(),
            forecast: None,
            diagnostics: ForecastDiagnostics::never(),
            last_forecast_success: None,
        })
    }

    /// Run forever: poll on the configured interval, serve commands between
    /// ticks. The first tick fires immediately on startup.
    pub async fn run(mut self, mut commands: mpsc::Receiver<EngineCommand>) {
        let period = Duration::from_secs(self.config.poll.interval_minutes * 60);
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "Engine started: {} devices, {}min poll interval",
            self.config.devices.len(),
            self.config.poll.interval_minutes
        );

        loop {
            tokio::select! {
                Some(command) = commands.recv() => {
                    self.handle_command(command).await;
                }
                _ = tick.tick() => {
                    let now = Utc::now();
                    if let Err(e) = self.run_cycle(now).await {
                        error!("Poll cycle error: {e}");
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::RefreshForecast { reply } => {
                info!("Manual forecast refresh requested");
                let now = Utc::now();
                self.refresh_forecast(now).await;
                self.publish_weather(now);
                let _ = reply.send(self.diagnostics.clone());
            }
        }
    }

    /// One full poll cycle. Public so integration tests can drive the engine
    /// with synthetic clocks.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.maybe_refresh_forecast(now).await;

        let readings = self.poll_devices(now).await;
        let snapshot = self.aggregate(now, readings);

        self.history.load.append(now, snapshot.totals.load_w);
        self.history
            .discharge
            .append(now, snapshot.totals.discharge_w);

        // publish before alerting so readers see fresh data even if
        // delivery stalls on a slow SMTP server
        self.shared.publish_snapshot(snapshot.clone());
        self.shared.publish_history(HistoryView::from(&self.history));
        self.publish_weather(now);

        let outlook = self.current_outlook(now);
        let candidates = alerts::evaluate(
            &snapshot,
            outlook.as_ref(),
            &self.config.thresholds,
            &self.config.site.name,
        );
        if !candidates.is_empty() {
            debug!("{} alert candidate(s) this cycle", candidates.len());
            self.dispatcher.dispatch(candidates, now).await;
            self.shared
                .publish_alerts(self.dispatcher.ledger.recent_alerts());
        }

        Ok(())
    }

    fn current_outlook(&self, now: DateTime<Utc>) -> Option<helioguard_types::SolarOutlook> {
        self.forecast
            .as_ref()
            .and_then(|f| outlook::analyze(f, now, self.tz))
    }

    // ============= Weather =============

    async fn maybe_refresh_forecast(&mut self, now: DateTime<Utc>) {
        let due = match (&self.forecast, self.last_forecast_success) {
            (None, _) | (_, None) => true,
            (Some(_), Some(last)) => now - last > forecast_refresh_interval(),
        };
        if due {
            self.refresh_forecast(now).await;
        }
    }

    /// Failure leaves the prior forecast untouched; only diagnostics change
    async fn refresh_forecast(&mut self, now: DateTime<Utc>) {
        self.diagnostics.last_attempt = Some(now);
        self.diagnostics.source_url = self.weather.source_url();

        match self.weather.fetch_forecast().await {
            Ok(forecast) => {
                info!(
                    "Forecast refreshed from {} ({} samples)",
                    forecast.source,
                    forecast.hours.len()
                );
                self.forecast = Some(forecast);
                self.last_forecast_success = Some(now);
                self.diagnostics.status = ForecastStatus::Ok;
                self.diagnostics.last_error = None;
                self.diagnostics.last_success = Some(now);
            }
            Err(e) => {
                warn!("Forecast refresh failed: {e}");
                self.diagnostics.last_error = Some(e.to_string());
                self.diagnostics.status = if self.forecast.is_some() {
                    ForecastStatus::Stale
                } else {
                    ForecastStatus::Failed
                };
            }
        }
    }

    fn publish_weather(&self, now: DateTime<Utc>) {
        self.shared.publish_weather(WeatherView {
            outlook: self.current_outlook(now),
            forecast: self.forecast.clone(),
            diagnostics: self.diagnostics.clone(),
        });
    }

    // ============= Device polling =============

    /// Fan out one fetch per device, each with its own timeout, so a stalled
    /// device cannot starve the rest of the cycle
    async fn poll_devices(&mut self, now: DateTime<Utc>) -> Vec<DeviceReading> {
        let timeout = Duration::from_secs(self.config.vendor.request_timeout_secs);
        let mut fetches = JoinSet::new();
        for (index, device) in self.config.devices.iter().enumerate() {
            let source = Arc::clone(&self.devices);
            let serial = device.serial.clone();
            fetches.spawn(async move {
                let result = tokio::time::timeout(timeout, source.fetch_snapshot(&serial)).await;
                (index, result)
            });
        }

        let mut raw: Vec<Option<Result<RawDeviceSnapshot>>> =
            self.config.devices.iter().map(|_| None).collect();
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((index, Ok(result))) => raw[index] = Some(result),
                Ok((index, Err(_elapsed))) => {
                    raw[index] = Some(Err(EngineError::Timeout(timeout.as_secs())));
                }
                Err(e) => error!("Device fetch task failed: {e}"),
            }
        }

        let comm_timeout = TimeDelta::minutes(self.config.poll.comm_timeout_minutes);
        let mut readings = Vec::with_capacity(self.config.devices.len());
        for (device, result) in self.config.devices.iter().zip(raw) {
            match result {
                Some(Ok(payload)) => {
                    self.last_contact.insert(device.serial.clone(), now);
                    readings.push(normalize::normalize_reading(&payload, device, now));
                }
                Some(Err(e)) => {
                    warn!("Poll failed for {}: {e}", device.serial);
                    match self.last_contact.get(&device.serial) {
                        Some(&last_seen) if now - last_seen > comm_timeout => {
                            readings.push(normalize::comm_lost_reading(device, last_seen));
                        }
                        Some(_) => {
                            debug!("{}: transient failure, not yet alertable", device.serial);
                        }
                        None => {
                            debug!("{}: no prior contact, omitting", device.serial);
                        }
                    }
                }
                None => error!("No fetch result for {}", device.serial),
            }
        }
        readings
    }

    // ============= Aggregation =============

    fn aggregate(&self, now: DateTime<Utc>, mut readings: Vec<DeviceReading>) -> Snapshot {
        readings.sort_by_key(|r| r.display_order);

        let mut totals = AggregateTotals::default();
        for reading in &readings {
            totals.load_w += reading.output_power_w;
            totals.solar_w += reading.solar_input_w;
            if reading.battery_power_w > 0.0 {
                totals.discharge_w += reading.battery_power_w;
            }
        }

        let primary_min_capacity_pct = readings
            .iter()
            .filter(|r| r.role == DeviceRole::Primary && !r.comm_lost)
            .filter_map(|r| r.battery_capacity_pct)
            .filter(|c| *c > 0.0)
            .reduce(f64::min);

        let thresholds = &self.config.thresholds;
        let backup = readings
            .iter()
            .find(|r| r.role == DeviceRole::Backup && !r.comm_lost);
        let backup_voltage_v = backup.map(|b| b.battery_voltage_v);
        let backup_tier = backup_voltage_v.map(|v| {
            BackupTier::from_voltage(
                v,
                thresholds.backup_voltage_low_v,
                thresholds.backup_voltage_critical_v,
            )
        });
        let backup_active =
            backup.is_some_and(|b| b.output_power_w > thresholds.backup_active_power_w);
        let generator_running = backup.is_some_and(|b| {
            b.ac_input_voltage_v > thresholds.generator_voltage_v
                || b.ac_input_power_w > thresholds.generator_power_w
        });

        Snapshot {
            taken_at: now,
            readings,
            totals,
            primary_min_capacity_pct,
            backup_voltage_v,
            backup_tier,
            backup_active,
            generator_running,
        }
    }
}
