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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::{BackupTier, DeviceReading};

/// Power totals across all devices that reported this cycle
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregateTotals {
    /// Sum of AC output power (W)
    pub load_w: f64,
    /// Sum of solar input power (W)
    pub solar_w: f64,
    /// Sum of battery power over devices that are discharging (W)
    pub discharge_w: f64,
}

/// Overall site state, for the dashboard status hero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Critical,
    Warning,
    Normal,
    Good,
}

impl SystemStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Normal => "NORMAL",
            Self::Good => "GOOD",
        }
    }
}

/// The current-state aggregate published after every poll cycle.
///
/// Owned exclusively by the orchestrator and replaced wholesale; readers
/// only ever see a fully-formed value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    /// Per-device readings, ordered by display order
    pub readings: Vec<DeviceReading>,
    pub totals: AggregateTotals,
    /// Lowest capacity among primary devices reporting a non-zero charge
    pub primary_min_capacity_pct: Option<f64>,
    pub backup_voltage_v: Option<f64>,
    pub backup_tier: Option<BackupTier>,
    /// Backup output power above the idle threshold
    pub backup_active: bool,
    /// Inferred from backup AC-input readings
    pub generator_running: bool,
}

impl Snapshot {
    /// Empty snapshot published before the first poll cycle completes
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            taken_at: now,
            readings: Vec::new(),
            totals: AggregateTotals::default(),
            primary_min_capacity_pct: None,
            backup_voltage_v: None,
            backup_tier: None,
            backup_active: false,
            generator_running: false,
        }
    }

    /// Classify the site state for display
    pub fn status(&self) -> SystemStatus {
        let any_fault = self.readings.iter().any(|r| r.fault);
        let any_comm_lost = self.readings.iter().any(|r| r.comm_lost);
        if self.generator_running || self.backup_tier == Some(BackupTier::Critical) || any_fault {
            SystemStatus::Critical
        } else if self.backup_active || any_comm_lost || self.backup_tier == Some(BackupTier::Low) {
            SystemStatus::Warning
        } else if self.totals.solar_w > self.totals.load_w {
            SystemStatus::Good
        } else {
            SystemStatus::Normal
        }
    }
}
