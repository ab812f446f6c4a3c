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

//! Published state shared between the orchestrator and the web surface
//!
//! Single writer, many readers: the orchestrator swaps in freshly built
//! immutable values, readers clone the current `Arc`. Nobody ever mutates a
//! published value in place, so readers always see a fully-formed state and
//! never block the writer for longer than the pointer swap.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::history::RollingHistory;
use helioguard_types::{AlertRecord, Forecast, ForecastDiagnostics, Snapshot, SolarOutlook};

/// Single-writer published pointer
#[derive(Debug)]
struct Published<T> {
    inner: RwLock<Arc<T>>,
}

impl<T> Published<T> {
    fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(Arc::new(value)),
        }
    }

    fn publish(&self, value: T) {
        *self.inner.write() = Arc::new(value);
    }

    fn get(&self) -> Arc<T> {
        Arc::clone(&self.inner.read())
    }
}

/// History pairs in read-friendly form
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryView {
    pub load: Vec<(DateTime<Utc>, f64)>,
    pub discharge: Vec<(DateTime<Utc>, f64)>,
}

impl From<&RollingHistory> for HistoryView {
    fn from(history: &RollingHistory) -> Self {
        Self {
            load: history.load.to_pairs(),
            discharge: history.discharge.to_pairs(),
        }
    }
}

/// Forecast, derived outlook and refresh diagnostics as one published unit
#[derive(Debug, Clone, Serialize)]
pub struct WeatherView {
    pub outlook: Option<SolarOutlook>,
    pub forecast: Option<Forecast>,
    pub diagnostics: ForecastDiagnostics,
}

impl WeatherView {
    fn unavailable() -> Self {
        Self {
            outlook: None,
            forecast: None,
            diagnostics: ForecastDiagnostics::never(),
        }
    }
}

#[derive(Debug)]
struct StateInner {
    snapshot: Published<Snapshot>,
    history: Published<HistoryView>,
    weather: Published<WeatherView>,
    alerts: Published<Vec<AlertRecord>>,
}

/// Cloneable handle over the published state
#[derive(Debug, Clone)]
pub struct SharedState(Arc<StateInner>);

impl SharedState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Arc::new(StateInner {
            snapshot: Published::new(Snapshot::empty(now)),
            history: Published::new(HistoryView::default()),
            weather: Published::new(WeatherView::unavailable()),
            alerts: Published::new(Vec::new()),
        }))
    }

    // ============= Read side =============

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.0.snapshot.get()
    }

    pub fn history(&self) -> Arc<HistoryView> {
        self.0.history.get()
    }

    pub fn weather(&self) -> Arc<WeatherView> {
        self.0.weather.get()
    }

    pub fn recent_alerts(&self) -> Arc<Vec<AlertRecord>> {
        self.0.alerts.get()
    }

    // ============= Write side (orchestrator only) =============

    pub fn publish_snapshot(&self, snapshot: Snapshot) {
        self.0.snapshot.publish(snapshot);
    }

    pub fn publish_history(&self, history: HistoryView) {
        self.0.history.publish(history);
    }

    pub fn publish_weather(&self, weather: WeatherView) {
        self.0.weather.publish(weather);
    }

    pub fn publish_alerts(&self, alerts: Vec<AlertRecord>) {
        self.0.alerts.publish(alerts);
    }
}
