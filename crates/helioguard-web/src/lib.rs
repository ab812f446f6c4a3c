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

//! Web surface: dashboard page plus the JSON API
//!
//! Strictly a reader of [`SharedState`]; the only write path is the
//! forecast-refresh command sent into the engine loop.

mod routes;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use chrono_tz::Tz;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use askama::Template;
use helioguard_core::{EngineCommand, SharedState};
use helioguard_types::{Snapshot, SystemStatus};
use routes::DashboardTemplate;

/// Application state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub shared: SharedState,
    pub commands: mpsc::Sender<EngineCommand>,
    pub site_name: String,
    pub tz: Tz,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("site_name", &self.site_name)
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}

/// Start the web server
///
/// # Errors
/// Returns error if the server fails to bind or serve
pub async fn start_web_server(
    state: AppState,
    bind_address: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/data", get(data_handler))
        .route("/api/history", get(history_handler))
        .route("/api/weather", get(weather_handler))
        .route("/api/weather/refresh", post(weather_refresh_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{bind_address}:{port}");
    info!("🌐 Starting web server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Main dashboard page handler
async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    let template = DashboardTemplate::from_state(&state);
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template render error: {e}");
            Html(format!(
                "<html><body><h1>Error</h1><p>Failed to render dashboard: {e}</p></body></html>"
            ))
            .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiData {
    timestamp: String,
    status: SystemStatus,
    snapshot: Snapshot,
}

/// Current snapshot; the dashboard polls this and reloads when the
/// timestamp moves
async fn data_handler(State(state): State<AppState>) -> Json<ApiData> {
    let snapshot = state.shared.snapshot();
    Json(ApiData {
        timestamp: routes::format_local(snapshot.taken_at, state.tz),
        status: snapshot.status(),
        snapshot: (*snapshot).clone(),
    })
}

/// Load and discharge pairs for the history chart
async fn history_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json((*state.shared.history()).clone())
}

/// Forecast, outlook and refresh diagnostics, or an explicit unavailable
/// marker
async fn weather_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json((*state.shared.weather()).clone())
}

/// Trigger an out-of-band forecast refresh and return the diagnostic state
async fn weather_refresh_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (reply_tx, reply_rx) = oneshot::channel();
    if state
        .commands
        .send(EngineCommand::RefreshForecast { reply: reply_tx })
        .await
        .is_err()
    {
        error!("Engine command channel closed");
        return (StatusCode::SERVICE_UNAVAILABLE, "engine not running").into_response();
    }

    match tokio::time::timeout(Duration::from_secs(30), reply_rx).await {
        Ok(Ok(diagnostics)) => Json(diagnostics).into_response(),
        Ok(Err(_)) | Err(_) => {
            error!("Forecast refresh did not complete in time");
            (StatusCode::GATEWAY_TIMEOUT, "refresh timed out").into_response()
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
