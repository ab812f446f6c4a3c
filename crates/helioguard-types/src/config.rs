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

//! Configuration loading and validation

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use crate::device::{DeviceConfig, DeviceRole};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub site: SiteSettings,
    #[serde(default)]
    pub poll: PollSettings,
    pub devices: Vec<DeviceConfig>,
    pub vendor: VendorSettings,
    #[serde(default)]
    pub thresholds: AlertThresholds,
    /// Absent email settings disable delivery; alerts are still evaluated
    /// and logged
    #[serde(default)]
    pub email: Option<EmailSettings>,
    #[serde(default)]
    pub web: WebSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name the site operates in (e.g., "Africa/Nairobi")
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_interval_minutes")]
    pub interval_minutes: u64,
    /// Minutes without contact before a failing device counts as
    /// communication-lost
    #[serde(default = "default_comm_timeout_minutes")]
    pub comm_timeout_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorSettings {
    pub api_base_url: String,
    /// Overridden by HELIOGUARD_VENDOR_TOKEN when set
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertThresholds {
    /// Primary battery minimum below which backup activity alerts (%)
    #[serde(default = "default_primary_battery_low_pct")]
    pub primary_battery_low_pct: f64,
    /// Backup voltage below which the site is critical (V)
    #[serde(default = "default_backup_voltage_critical_v")]
    pub backup_voltage_critical_v: f64,
    /// Backup voltage below which the display tier drops to Low (V)
    #[serde(default = "default_backup_voltage_low_v")]
    pub backup_voltage_low_v: f64,
    /// Backup output power above which the backup counts as supplying load (W)
    #[serde(default = "default_backup_active_power_w")]
    pub backup_active_power_w: f64,
    /// Aggregate discharge band lower bound (W)
    #[serde(default = "default_discharge_high_w")]
    pub discharge_high_w: f64,
    /// Aggregate discharge band upper bound (W)
    #[serde(default = "default_discharge_very_high_w")]
    pub discharge_very_high_w: f64,
    /// Per-device temperature alert bound (°C)
    #[serde(default = "default_temperature_high_c")]
    pub temperature_high_c: f64,
    /// Backup AC-input voltage above which the generator counts as running (V)
    #[serde(default = "default_generator_voltage_v")]
    pub generator_voltage_v: f64,
    /// Backup AC-input power above which the generator counts as running (W)
    #[serde(default = "default_generator_power_w")]
    pub generator_power_w: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    /// Overridden by HELIOGUARD_SMTP_PASSWORD when set
    #[serde(default)]
    pub smtp_password: String,
    pub from_address: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_timezone() -> String {
    "Africa/Nairobi".to_owned()
}

fn default_poll_interval_minutes() -> u64 {
    5
}

fn default_comm_timeout_minutes() -> i64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_primary_battery_low_pct() -> f64 {
    40.0
}

fn default_backup_voltage_critical_v() -> f64 {
    51.2
}

fn default_backup_voltage_low_v() -> f64 {
    52.0
}

fn default_backup_active_power_w() -> f64 {
    50.0
}

fn default_discharge_high_w() -> f64 {
    1500.0
}

fn default_discharge_very_high_w() -> f64 {
    2500.0
}

fn default_temperature_high_c() -> f64 {
    60.0
}

fn default_generator_voltage_v() -> f64 {
    100.0
}

fn default_generator_power_w() -> f64 {
    50.0
}

fn default_smtp_port() -> u16 {
    587
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8099
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_minutes: default_poll_interval_minutes(),
            comm_timeout_minutes: default_comm_timeout_minutes(),
        }
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            primary_battery_low_pct: default_primary_battery_low_pct(),
            backup_voltage_critical_v: default_backup_voltage_critical_v(),
            backup_voltage_low_v: default_backup_voltage_low_v(),
            backup_active_power_w: default_backup_active_power_w(),
            discharge_high_w: default_discharge_high_w(),
            discharge_very_high_w: default_discharge_very_high_w(),
            temperature_high_c: default_temperature_high_c(),
            generator_voltage_v: default_generator_voltage_v(),
            generator_power_w: default_generator_power_w(),
        }
    }
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let mut config: Self =
            toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Secrets may come from the environment instead of the config file
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("HELIOGUARD_VENDOR_TOKEN") {
            self.vendor.api_token = token;
        }
        if let Some(ref mut email) = self.email
            && let Ok(password) = std::env::var("HELIOGUARD_SMTP_PASSWORD")
        {
            email.smtp_password = password;
        }
    }

    /// Parse the configured site timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.site
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown timezone: {}", self.site.timezone))
    }

    fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            bail!("at least one device must be configured");
        }
        let backups = self
            .devices
            .iter()
            .filter(|d| d.role == DeviceRole::Backup)
            .count();
        if backups > 1 {
            bail!("at most one backup device is supported, found {backups}");
        }
        if self.poll.interval_minutes == 0 {
            bail!("poll.interval_minutes must be at least 1");
        }
        if self.vendor.api_base_url.is_empty() {
            bail!("vendor.api_base_url must be set");
        }
        if self.thresholds.discharge_very_high_w <= self.thresholds.discharge_high_w {
            bail!("thresholds.discharge_very_high_w must exceed discharge_high_w");
        }
        self.tz()?;
        if let Some(ref email) = self.email {
            if email.smtp_host.is_empty() {
                bail!("email.smtp_host must be set");
            }
            if email.recipients.is_empty() {
                bail!("email.recipients must contain at least one address");
            }
        }
        Ok(())
    }
}
