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

//! Weather forecast data and the derived solar outlook

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which endpoint produced the current forecast.
///
/// The primary source reports timestamps as site-local naive datetimes; the
/// fallback reports UTC. The analyzer must know which one it is looking at
/// before doing any window membership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForecastSource {
    /// Open-Meteo queried with the site timezone
    OpenMeteo,
    /// Open-Meteo fallback queried in UTC
    OpenMeteoUtc,
}

impl ForecastSource {
    /// Whether this source's sample timestamps are UTC rather than site-local
    pub fn reports_utc(&self) -> bool {
        matches!(self, Self::OpenMeteoUtc)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenMeteo => "open-meteo",
            Self::OpenMeteoUtc => "open-meteo (utc fallback)",
        }
    }
}

impl fmt::Display for ForecastSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One hourly forecast sample, as reported by the source
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastHour {
    /// Naive timestamp in the source's reporting zone (see [`ForecastSource`])
    pub time: NaiveDateTime,
    pub cloud_cover_pct: f64,
    pub shortwave_radiation_wm2: f64,
    pub direct_radiation_wm2: f64,
}

/// Hourly forecast covering roughly the next two days.
///
/// Replaced wholesale on a successful refresh and retained unchanged when a
/// refresh fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub fetched_at: DateTime<Utc>,
    pub source: ForecastSource,
    pub hours: Vec<ForecastHour>,
}

/// Which daylight window the outlook analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlookWindow {
    /// From now until 18:00 today
    TodayRemaining,
    /// Tomorrow 06:00-18:00, analyzed when it is currently nighttime
    Tomorrow,
}

impl OutlookWindow {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TodayRemaining => "today until 18:00",
            Self::Tomorrow => "tomorrow 06:00-18:00",
        }
    }
}

impl fmt::Display for OutlookWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Daylight-window summary derived from the forecast, recomputed on demand
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolarOutlook {
    pub window: OutlookWindow,
    pub avg_cloud_cover_pct: f64,
    pub avg_radiation_wm2: f64,
    /// Number of forecast samples that contributed to the averages
    pub hours_counted: usize,
    /// True when cloud cover or radiation alone indicates poor charging
    pub poor_conditions: bool,
}

/// Forecast refresh state exposed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastStatus {
    /// Refreshed within the adaptive interval
    Ok,
    /// A forecast is held but the last refresh attempt failed
    Stale,
    /// No forecast held and the last attempt failed
    Failed,
    /// No refresh attempted yet
    Never,
}

/// Diagnostics for the weather view; populated even when no forecast is held
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDiagnostics {
    pub status: ForecastStatus,
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    /// URL of the endpoint that produced (or last failed to produce) data
    pub source_url: String,
}

impl ForecastDiagnostics {
    pub fn never() -> Self {
        Self {
            status: ForecastStatus::Never,
            last_error: None,
            last_attempt: None,
            last_success: None,
            source_url: String::new(),
        }
    }
}
