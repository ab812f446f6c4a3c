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

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert categories, each with its own re-fire cooldown.
///
/// The cooldown is the minimum time between two deliveries of the same
/// category; it is the sole gate on alert frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Critical,
    VeryHighLoad,
    BackupActive,
    HighLoad,
    ModerateLoad,
    Warning,
    CommunicationLost,
    FaultAlarm,
    HighTemperature,
    /// Delivery plumbing check, never suppressed
    Test,
    General,
}

impl AlertCategory {
    /// Minimum time between two deliveries of this category
    pub fn cooldown(&self) -> TimeDelta {
        let minutes = match self {
            Self::Critical => 60,
            Self::VeryHighLoad => 30,
            Self::BackupActive => 120,
            Self::HighLoad => 60,
            Self::ModerateLoad => 120,
            Self::Warning => 120,
            Self::CommunicationLost => 60,
            Self::FaultAlarm => 30,
            Self::HighTemperature => 60,
            Self::Test => 0,
            Self::General => 120,
        };
        TimeDelta::minutes(minutes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::VeryHighLoad => "very_high_load",
            Self::BackupActive => "backup_active",
            Self::HighLoad => "high_load",
            Self::ModerateLoad => "moderate_load",
            Self::Warning => "warning",
            Self::CommunicationLost => "communication_lost",
            Self::FaultAlarm => "fault_alarm",
            Self::HighTemperature => "high_temperature",
            Self::Test => "test",
            Self::General => "general",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One delivered alert, kept in the bounded recent-alert log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub fired_at: DateTime<Utc>,
    pub category: AlertCategory,
    pub subject: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_table() {
        assert_eq!(AlertCategory::Critical.cooldown(), TimeDelta::minutes(60));
        assert_eq!(
            AlertCategory::VeryHighLoad.cooldown(),
            TimeDelta::minutes(30)
        );
        assert_eq!(
            AlertCategory::BackupActive.cooldown(),
            TimeDelta::minutes(120)
        );
        assert_eq!(AlertCategory::Test.cooldown(), TimeDelta::zero());
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&AlertCategory::CommunicationLost).unwrap();
        assert_eq!(json, "\"communication_lost\"");
    }
}
