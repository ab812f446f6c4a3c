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

//! Vendor cloud API client
//!
//! The vendor exposes one realtime endpoint per device serial. Numeric
//! fields come and go depending on the device model and firmware, so every
//! field on the raw payload is optional; "unknown vendor field" handling
//! stops here and in the normalizer.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::traits::DeviceDataSource;
use helioguard_types::config::VendorSettings;

const USER_AGENT: &str = "helioguard/0.1";

/// Raw per-device payload as the vendor ships it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDeviceSnapshot {
    /// AC output power (W)
    pub ac_power: Option<f64>,
    /// Battery state of charge (%)
    pub soc: Option<f64>,
    pub battery_voltage: Option<f64>,
    /// Positive = discharging
    pub battery_power: Option<f64>,
    pub pv1_power: Option<f64>,
    pub pv2_power: Option<f64>,
    pub pv3_power: Option<f64>,
    pub inverter_temperature: Option<f64>,
    pub battery_temperature: Option<f64>,
    pub board_temperature: Option<f64>,
    /// Generator-side AC input voltage (V)
    pub ac_input_voltage: Option<f64>,
    /// Generator-side AC input power (W)
    pub ac_input_power: Option<f64>,
    pub error_code: Option<u32>,
    pub fault_codes: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct VendorEnvelope {
    success: bool,
    #[serde(default)]
    exception: Option<String>,
    #[serde(default)]
    result: Option<RawDeviceSnapshot>,
}

/// HTTP client for the vendor cloud API
#[derive(Debug, Clone)]
pub struct VendorApiClient {
    base_url: String,
    token: String,
    client: Client,
    timeout_secs: u64,
}

impl VendorApiClient {
    pub fn new(settings: &VendorSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: settings.api_base_url.trim_end_matches('/').to_owned(),
            token: settings.api_token.clone(),
            client,
            timeout_secs: settings.request_timeout_secs,
        })
    }
}

#[async_trait]
impl DeviceDataSource for VendorApiClient {
    async fn fetch_snapshot(&self, serial: &str) -> Result<RawDeviceSnapshot> {
        let url = format!("{}/api/v2/device/{serial}/realtime", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(self.timeout_secs)
                } else {
                    EngineError::Transport(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_owned());
            return Err(EngineError::Transport(format!(
                "Vendor API error {status}: {body}"
            )));
        }

        let envelope: VendorEnvelope = response
            .json()
            .await
            .map_err(|e| EngineError::Schema(format!("Failed to parse response: {e}")))?;

        if !envelope.success {
            return Err(EngineError::Transport(format!(
                "Vendor rejected request for {serial}: {}",
                envelope.exception.unwrap_or_else(|| "no reason given".to_owned())
            )));
        }

        envelope
            .result
            .ok_or_else(|| EngineError::Schema("Missing result object in vendor response".to_owned()))
    }

    fn name(&self) -> &str {
        "vendor-cloud"
    }
}
