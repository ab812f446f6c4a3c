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

//! Full poll cycles against scripted collaborators

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use helioguard_core::error::{EngineError, Result};
use helioguard_core::{
    AlertTransport, DeviceDataSource, Engine, ForecastDataSource, RawDeviceSnapshot, SharedState,
};
use helioguard_types::{
    AlertCategory, AlertThresholds, AppConfig, DeviceConfig, DeviceRole, Forecast, ForecastStatus,
    PollSettings, SiteSettings, config::VendorSettings, config::WebSettings,
};

// ============= Scripted collaborators =============

#[derive(Default)]
struct ScriptedDeviceSource {
    payloads: Mutex<HashMap<String, RawDeviceSnapshot>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedDeviceSource {
    fn set_payload(&self, serial: &str, payload: RawDeviceSnapshot) {
        self.failing.lock().remove(serial);
        self.payloads.lock().insert(serial.to_owned(), payload);
    }

    fn set_failing(&self, serial: &str) {
        self.failing.lock().insert(serial.to_owned());
    }
}

#[async_trait]
impl DeviceDataSource for ScriptedDeviceSource {
    async fn fetch_snapshot(&self, serial: &str) -> Result<RawDeviceSnapshot> {
        if self.failing.lock().contains(serial) {
            return Err(EngineError::Transport(format!("{serial} unreachable")));
        }
        Ok(self.payloads.lock().get(serial).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct ScriptedForecastSource {
    forecast: Mutex<Option<Forecast>>,
}

#[async_trait]
impl ForecastDataSource for ScriptedForecastSource {
    async fn fetch_forecast(&self) -> Result<Forecast> {
        self.forecast
            .lock()
            .clone()
            .ok_or_else(|| EngineError::Transport("forecast offline".to_owned()))
    }

    fn source_url(&self) -> String {
        "http://scripted.test/forecast".to_owned()
    }
}

#[derive(Default)]
struct RecordingTransport {
    delivered: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn subjects(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    async fn deliver(&self, subject: &str, _html_body: &str) -> Result<bool> {
        self.delivered.lock().push(subject.to_owned());
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// ============= Fixtures =============

fn test_config() -> AppConfig {
    AppConfig {
        site: SiteSettings {
            name: "Test Site".to_owned(),
            latitude: -1.29,
            longitude: 36.82,
            timezone: "Africa/Nairobi".to_owned(),
        },
        poll: PollSettings::default(),
        devices: vec![
            DeviceConfig {
                serial: "SN100".to_owned(),
                label: "Inverter 1".to_owned(),
                role: DeviceRole::Primary,
                display_order: 1,
            },
            DeviceConfig {
                serial: "SN200".to_owned(),
                label: "Inverter 2".to_owned(),
                role: DeviceRole::Primary,
                display_order: 2,
            },
            DeviceConfig {
                serial: "SN300".to_owned(),
                label: "Inverter 3 (Backup)".to_owned(),
                role: DeviceRole::Backup,
                display_order: 3,
            },
        ],
        vendor: VendorSettings {
            api_base_url: "http://scripted.test".to_owned(),
            api_token: "token".to_owned(),
            request_timeout_secs: 2,
        },
        thresholds: AlertThresholds::default(),
        email: None,
        web: WebSettings::default(),
    }
}

fn primary_payload(soc: f64, output_w: f64, discharge_w: f64) -> RawDeviceSnapshot {
    RawDeviceSnapshot {
        ac_power: Some(output_w),
        soc: Some(soc),
        battery_voltage: Some(52.2),
        battery_power: Some(discharge_w),
        pv1_power: Some(0.0),
        inverter_temperature: Some(25.0),
        ..Default::default()
    }
}

fn backup_payload(voltage: f64, output_w: f64) -> RawDeviceSnapshot {
    RawDeviceSnapshot {
        ac_power: Some(output_w),
        battery_voltage: Some(voltage),
        battery_power: Some(0.0),
        inverter_temperature: Some(25.0),
        ac_input_voltage: Some(0.0),
        ac_input_power: Some(0.0),
        ..Default::default()
    }
}

struct Harness {
    engine: Engine,
    devices: Arc<ScriptedDeviceSource>,
    forecast: Arc<ScriptedForecastSource>,
    transport: Arc<RecordingTransport>,
    shared: SharedState,
}

fn harness() -> Harness {
    let devices = Arc::new(ScriptedDeviceSource::default());
    let forecast = Arc::new(ScriptedForecastSource::default());
    let transport = Arc::new(RecordingTransport::default());
    let shared = SharedState::new(Utc::now());

    devices.set_payload("SN100", primary_payload(35.0, 409.0, 0.0));
    devices.set_payload("SN200", primary_payload(45.0, 270.0, 0.0));
    devices.set_payload("SN300", backup_payload(53.2, 0.0));

    let device_source: Arc<dyn DeviceDataSource> = devices.clone();
    let forecast_source: Arc<dyn ForecastDataSource> = forecast.clone();
    let alert_transport: Arc<dyn AlertTransport> = transport.clone();
    let engine = Engine::new(
        test_config(),
        device_source,
        forecast_source,
        Some(alert_transport),
        shared.clone(),
    )
    .unwrap();

    Harness {
        engine,
        devices,
        forecast,
        transport,
        shared,
    }
}

// ============= Tests =============

#[tokio::test]
async fn test_quiet_cycle_publishes_snapshot_and_history() {
    let mut h = harness();
    let now = Utc::now();

    h.engine.run_cycle(now).await.unwrap();

    let snapshot = h.shared.snapshot();
    assert_eq!(snapshot.taken_at, now);
    assert_eq!(snapshot.readings.len(), 3);
    // readings come out in display order
    assert_eq!(snapshot.readings[0].label, "Inverter 1");
    assert_eq!(snapshot.readings[2].role, DeviceRole::Backup);
    assert_eq!(snapshot.totals.load_w, 679.0);
    assert_eq!(snapshot.primary_min_capacity_pct, Some(35.0));
    assert_eq!(snapshot.backup_voltage_v, Some(53.2));
    assert!(!snapshot.backup_active);
    assert!(!snapshot.generator_running);

    let history = h.shared.history();
    assert_eq!(history.load.len(), 1);
    assert_eq!(history.load[0].1, 679.0);

    // primary min at 35% alone does not breach anything
    assert!(h.transport.subjects().is_empty());
}

#[tokio::test]
async fn test_backup_supplying_load_fires_backup_active() {
    let mut h = harness();
    h.devices.set_payload("SN300", backup_payload(53.2, 100.0));

    h.engine.run_cycle(Utc::now()).await.unwrap();

    let subjects = h.transport.subjects();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains("Backup battery supplying load"));

    let alerts = h.shared.recent_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, AlertCategory::BackupActive);
}

#[tokio::test]
async fn test_failure_without_prior_contact_omits_device() {
    let mut h = harness();
    h.devices.set_failing("SN200");

    h.engine.run_cycle(Utc::now()).await.unwrap();

    let snapshot = h.shared.snapshot();
    assert_eq!(snapshot.readings.len(), 2);
    assert!(snapshot.readings.iter().all(|r| r.serial != "SN200"));
    assert!(snapshot.readings.iter().all(|r| !r.comm_lost));
    assert!(h.transport.subjects().is_empty());
}

#[tokio::test]
async fn test_comm_lost_after_timeout_with_prior_contact() {
    let mut h = harness();
    let t0 = Utc::now();

    // contact recorded at t0
    h.engine.run_cycle(t0).await.unwrap();

    // transient blip 5 minutes in: omitted, not alertable yet
    h.devices.set_failing("SN200");
    h.engine.run_cycle(t0 + TimeDelta::minutes(5)).await.unwrap();
    let snapshot = h.shared.snapshot();
    assert_eq!(snapshot.readings.len(), 2);
    assert!(h.transport.subjects().is_empty());

    // still failing 11 minutes after the last contact: placeholder + alert
    h.engine.run_cycle(t0 + TimeDelta::minutes(11)).await.unwrap();
    let snapshot = h.shared.snapshot();
    assert_eq!(snapshot.readings.len(), 3);
    let lost = snapshot
        .readings
        .iter()
        .find(|r| r.serial == "SN200")
        .unwrap();
    assert!(lost.comm_lost);
    assert_eq!(lost.last_seen, Some(t0));

    let subjects = h.transport.subjects();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains("Communication lost: Inverter 2"));
}

#[tokio::test]
async fn test_cooldown_spans_cycles() {
    let mut h = harness();
    // discharge of 800W on each primary: 1600W aggregate, high_load band
    h.devices.set_payload("SN100", primary_payload(35.0, 409.0, 800.0));
    h.devices.set_payload("SN200", primary_payload(45.0, 270.0, 800.0));
    let t0 = Utc::now();

    h.engine.run_cycle(t0).await.unwrap();
    h.engine.run_cycle(t0 + TimeDelta::minutes(5)).await.unwrap();
    h.engine.run_cycle(t0 + TimeDelta::minutes(10)).await.unwrap();
    assert_eq!(h.transport.subjects().len(), 1);

    // high_load cooldown is 60 minutes
    h.engine.run_cycle(t0 + TimeDelta::minutes(61)).await.unwrap();
    assert_eq!(h.transport.subjects().len(), 2);
}

#[tokio::test]
async fn test_generator_running_supersedes_discharge_rules() {
    let mut h = harness();
    h.devices.set_payload("SN100", primary_payload(35.0, 409.0, 1600.0));
    h.devices.set_payload("SN200", primary_payload(45.0, 270.0, 1600.0));
    let mut generator_on = backup_payload(53.2, 100.0);
    generator_on.ac_input_voltage = Some(230.0);
    generator_on.ac_input_power = Some(900.0);
    h.devices.set_payload("SN300", generator_on);

    h.engine.run_cycle(Utc::now()).await.unwrap();

    let snapshot = h.shared.snapshot();
    assert!(snapshot.generator_running);

    let subjects = h.transport.subjects();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains("CRITICAL"));
}

#[tokio::test]
async fn test_forecast_failure_keeps_polling_and_reports_diagnostics() {
    let mut h = harness();

    h.engine.run_cycle(Utc::now()).await.unwrap();

    let weather = h.shared.weather();
    assert_eq!(weather.diagnostics.status, ForecastStatus::Failed);
    assert!(weather.diagnostics.last_error.is_some());
    assert!(weather.forecast.is_none());
    // the snapshot still went out
    assert_eq!(h.shared.snapshot().readings.len(), 3);
}

#[tokio::test]
async fn test_forecast_retained_when_refresh_fails_later() {
    let mut h = harness();
    let t0 = Utc::now();
    *h.forecast.forecast.lock() = Some(Forecast {
        fetched_at: t0,
        source: helioguard_types::ForecastSource::OpenMeteo,
        hours: Vec::new(),
    });

    h.engine.run_cycle(t0).await.unwrap();
    assert_eq!(h.shared.weather().diagnostics.status, ForecastStatus::Ok);

    // refresh due after 30 minutes, and the source is now offline
    *h.forecast.forecast.lock() = None;
    h.engine.run_cycle(t0 + TimeDelta::minutes(31)).await.unwrap();

    let weather = h.shared.weather();
    assert_eq!(weather.diagnostics.status, ForecastStatus::Stale);
    assert!(weather.forecast.is_some(), "stale forecast must be retained");
}
