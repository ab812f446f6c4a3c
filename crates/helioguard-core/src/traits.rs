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

//! Collaborator seams consumed by the orchestrator
//!
//! The engine never talks HTTP or SMTP directly; it goes through these
//! traits so the scheduling and alerting logic can be exercised against
//! scripted sources.

use async_trait::async_trait;

use crate::error::Result;
use crate::vendor::RawDeviceSnapshot;
use helioguard_types::Forecast;

/// Source of raw per-device data, one fetch per serial per cycle
#[async_trait]
pub trait DeviceDataSource: Send + Sync {
    /// Fetch the current raw snapshot for one device
    async fn fetch_snapshot(&self, serial: &str) -> Result<RawDeviceSnapshot>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}

/// Source of the hourly weather forecast
#[async_trait]
pub trait ForecastDataSource: Send + Sync {
    /// Fetch a fresh forecast; the returned value records which endpoint
    /// produced it
    async fn fetch_forecast(&self) -> Result<Forecast>;

    /// URL used for diagnostics display
    fn source_url(&self) -> String;
}

/// Outbound alert delivery
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// Deliver one alert. `Ok(true)` means accepted for delivery; a normal
    /// rejection is `Ok(false)`, never an error.
    async fn deliver(&self, subject: &str, html_body: &str) -> Result<bool>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}
