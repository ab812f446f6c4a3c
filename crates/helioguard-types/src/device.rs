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

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= Device Role =============

/// Role a device plays in the site topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceRole {
    /// Inverter whose battery reports a charge percentage and that carries
    /// the load under normal conditions
    Primary,
    /// Inverter whose battery reports a voltage and that only supplies load
    /// when primary capacity is low
    Backup,
    /// Role not configured; metrics are aggregated but role-specific rules
    /// do not apply
    #[default]
    Unknown,
}

impl DeviceRole {
    /// Get human-readable name for the role
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Backup => "Backup",
            Self::Unknown => "Unknown",
        }
    }

    /// Get config string value (kebab-case)
    pub fn to_config_value(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
            Self::Unknown => "unknown",
        }
    }

    /// List all supported roles
    pub fn all() -> &'static [DeviceRole] {
        &[Self::Primary, Self::Backup, Self::Unknown]
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DeviceRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "backup" => Ok(Self::Backup),
            "unknown" => Ok(Self::Unknown),
            _ => Err(anyhow::anyhow!(
                "Unknown device role: '{}'. Supported roles: {}",
                s,
                Self::all()
                    .iter()
                    .map(|r| r.to_config_value())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

// ============= Device Configuration =============

/// Static per-device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Vendor serial number used to address the device on the cloud API
    pub serial: String,
    /// Display label (e.g., "Inverter 1")
    pub label: String,
    #[serde(default)]
    pub role: DeviceRole,
    /// Stable ordering for UI rendering, lowest first
    #[serde(default)]
    pub display_order: u32,
}

// ============= Device Reading =============

/// One device, one poll cycle.
///
/// Constructed fresh each cycle from a vendor payload, or synthesized as a
/// communication-lost placeholder when polling has failed for longer than
/// the communication timeout. Exactly one of the battery fields is
/// authoritative per role: `battery_capacity_pct` for primary devices,
/// `battery_voltage_v` for the backup device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReading {
    pub serial: String,
    pub label: String,
    pub role: DeviceRole,
    pub display_order: u32,

    /// AC output power (W)
    pub output_power_w: f64,
    /// Battery state of charge, 0-100; `None` for voltage-reporting devices
    pub battery_capacity_pct: Option<f64>,
    /// Raw battery voltage (V)
    pub battery_voltage_v: f64,
    /// Battery charge/discharge power (W, positive = discharging)
    pub battery_power_w: f64,
    /// Solar input power (W), summed across MPPT channels
    pub solar_input_w: f64,
    /// Hottest of the available temperature sensors (°C)
    pub temperature_c: f64,
    /// AC input (generator side) voltage (V)
    pub ac_input_voltage_v: f64,
    /// AC input power (W)
    pub ac_input_power_w: f64,

    pub fault: bool,
    pub fault_codes: Vec<u32>,
    /// Set only on placeholder readings synthesized by the orchestrator
    pub comm_lost: bool,
    /// Last successful contact with the device
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceReading {
    /// Whether the battery is currently supplying power
    pub fn is_discharging(&self) -> bool {
        self.battery_power_w > 0.0
    }
}

// ============= Backup Battery Tier =============

/// Voltage tier of the backup battery, for display and the critical rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupTier {
    Good,
    Low,
    Critical,
}

impl BackupTier {
    /// Classify a backup battery voltage against the configured bounds
    pub fn from_voltage(voltage_v: f64, low_v: f64, critical_v: f64) -> Self {
        if voltage_v < critical_v {
            Self::Critical
        } else if voltage_v < low_v {
            Self::Low
        } else {
            Self::Good
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Low => "Low",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for BackupTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
