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

//! Open-Meteo forecast client
//!
//! The primary request asks the API for site-local timestamps. When it
//! fails, a fallback request in UTC is tried; the resulting [`Forecast`]
//! records which endpoint produced it so the analyzer can convert
//! timestamps correctly.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::traits::ForecastDataSource;
use helioguard_types::{Forecast, ForecastHour, ForecastSource};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Hourly fields requested from the API, in parallel-array form
const HOURLY_FIELDS: &str = "cloud_cover,shortwave_radiation,direct_radiation";

#[derive(Debug, Deserialize)]
struct MeteoResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    cloud_cover: Vec<f64>,
    shortwave_radiation: Vec<f64>,
    direct_radiation: Vec<f64>,
}

/// Open-Meteo client with a UTC fallback endpoint
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    primary_url: String,
    fallback_url: String,
}

impl OpenMeteoClient {
    pub fn new(latitude: f64, longitude: f64, tz: Tz) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, latitude, longitude, tz)
    }

    /// Custom base URL for testing
    pub fn with_base_url(base_url: &str, latitude: f64, longitude: f64, tz: Tz) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {e}")))?;

        let base = base_url.trim_end_matches('/');
        let query = format!(
            "latitude={latitude}&longitude={longitude}&hourly={HOURLY_FIELDS}&forecast_days=2"
        );
        let tz_param = tz.name().replace('/', "%2F");

        Ok(Self {
            client,
            primary_url: format!("{base}/v1/forecast?{query}&timezone={tz_param}"),
            fallback_url: format!("{base}/v1/forecast?{query}&timezone=UTC"),
        })
    }

    async fn fetch_from(&self, url: &str, source: ForecastSource) -> Result<Forecast> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout(REQUEST_TIMEOUT_SECS)
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
                "Forecast API error {status}: {body}"
            )));
        }

        let parsed: MeteoResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Schema(format!("Failed to parse response: {e}")))?;

        let hourly = parsed.hourly;
        let n = hourly.time.len();
        if hourly.cloud_cover.len() != n
            || hourly.shortwave_radiation.len() != n
            || hourly.direct_radiation.len() != n
        {
            return Err(EngineError::Schema(format!(
                "Hourly arrays are not parallel: {} times, {} cloud, {} shortwave, {} direct",
                n,
                hourly.cloud_cover.len(),
                hourly.shortwave_radiation.len(),
                hourly.direct_radiation.len()
            )));
        }

        let mut hours = Vec::with_capacity(n);
        for (i, raw_time) in hourly.time.iter().enumerate() {
            let time = NaiveDateTime::parse_from_str(raw_time, "%Y-%m-%dT%H:%M")
                .map_err(|e| EngineError::Schema(format!("Bad timestamp '{raw_time}': {e}")))?;
            hours.push(ForecastHour {
                time,
                cloud_cover_pct: hourly.cloud_cover[i],
                shortwave_radiation_wm2: hourly.shortwave_radiation[i],
                direct_radiation_wm2: hourly.direct_radiation[i],
            });
        }

        Ok(Forecast {
            fetched_at: Utc::now(),
            source,
            hours,
        })
    }
}

#[async_trait]
impl ForecastDataSource for OpenMeteoClient {
    async fn fetch_forecast(&self) -> Result<Forecast> {
        match self
            .fetch_from(&self.primary_url, ForecastSource::OpenMeteo)
            .await
        {
            Ok(forecast) => Ok(forecast),
            Err(e) => {
                warn!("Primary forecast fetch failed, trying UTC fallback: {e}");
                self.fetch_from(&self.fallback_url, ForecastSource::OpenMeteoUtc)
                    .await
            }
        }
    }

    fn source_url(&self) -> String {
        self.primary_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn hourly_body() -> serde_json::Value {
        json!({
            "hourly": {
                "time": ["2026-08-08T13:00", "2026-08-08T14:00"],
                "cloud_cover": [40.0, 55.0],
                "shortwave_radiation": [610.0, 580.0],
                "direct_radiation": [420.0, 390.0]
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_forecast_primary() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::UrlEncoded("timezone".into(), "Africa/Nairobi".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(hourly_body().to_string())
            .create_async()
            .await;

        let client = OpenMeteoClient::with_base_url(
            &server.url(),
            -1.29,
            36.82,
            chrono_tz::Africa::Nairobi,
        )
        .unwrap();
        let forecast = client.fetch_forecast().await.unwrap();

        assert_eq!(forecast.source, ForecastSource::OpenMeteo);
        assert_eq!(forecast.hours.len(), 2);
        assert_eq!(forecast.hours[0].cloud_cover_pct, 40.0);
        assert_eq!(forecast.hours[1].direct_radiation_wm2, 390.0);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fallback_reports_utc_source() {
        let mut server = Server::new_async().await;
        let primary = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::UrlEncoded("timezone".into(), "Africa/Nairobi".into()))
            .with_status(500)
            .with_body("upstream error")
            .create_async()
            .await;
        let fallback = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::UrlEncoded("timezone".into(), "UTC".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(hourly_body().to_string())
            .create_async()
            .await;

        let client = OpenMeteoClient::with_base_url(
            &server.url(),
            -1.29,
            36.82,
            chrono_tz::Africa::Nairobi,
        )
        .unwrap();
        let forecast = client.fetch_forecast().await.unwrap();

        assert_eq!(forecast.source, ForecastSource::OpenMeteoUtc);
        primary.assert_async().await;
        fallback.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_hourly_key_is_schema_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"daily": {}}).to_string())
            .expect(2)
            .create_async()
            .await;

        let client = OpenMeteoClient::with_base_url(
            &server.url(),
            -1.29,
            36.82,
            chrono_tz::Africa::Nairobi,
        )
        .unwrap();
        let result = client.fetch_forecast().await;

        assert!(matches!(result.unwrap_err(), EngineError::Schema(_)));
    }

    #[tokio::test]
    async fn test_ragged_arrays_are_schema_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "hourly": {
                        "time": ["2026-08-08T13:00", "2026-08-08T14:00"],
                        "cloud_cover": [40.0],
                        "shortwave_radiation": [610.0, 580.0],
                        "direct_radiation": [420.0, 390.0]
                    }
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let client = OpenMeteoClient::with_base_url(
            &server.url(),
            -1.29,
            36.82,
            chrono_tz::Africa::Nairobi,
        )
        .unwrap();
        let result = client.fetch_forecast().await;

        assert!(matches!(result.unwrap_err(), EngineError::Schema(_)));
    }
}
