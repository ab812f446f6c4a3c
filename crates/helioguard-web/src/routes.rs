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

//! Dashboard template assembly

use askama::Template;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::AppState;
use helioguard_types::{DeviceRole, SystemStatus};

#[derive(Debug, Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub site_name: String,
    pub server_time: String,
    pub status_class: &'static str,
    pub status_title: &'static str,
    pub load_w: String,
    pub solar_w: String,
    pub primary_pct: String,
    pub backup_voltage: String,
    pub backup_tier: String,
    pub backup_active: bool,
    pub generator_running: bool,
    pub outlook_line: String,
    pub inverters: Vec<InverterCard>,
    pub alerts: Vec<AlertRow>,
}

#[derive(Debug)]
pub struct InverterCard {
    pub label: String,
    pub output: String,
    pub battery: String,
    pub temperature: String,
    pub card_class: &'static str,
    pub note: String,
}

#[derive(Debug)]
pub struct AlertRow {
    pub when: String,
    pub subject: String,
}

impl DashboardTemplate {
    pub fn from_state(state: &AppState) -> Self {
        let snapshot = state.shared.snapshot();
        let weather = state.shared.weather();
        let now = Utc::now();

        let status = snapshot.status();
        let (status_class, status_title) = match status {
            SystemStatus::Critical => ("critical", "CRITICAL"),
            SystemStatus::Warning => ("warning", "WARNING"),
            SystemStatus::Normal => ("normal", "NORMAL"),
            SystemStatus::Good => ("good", "GOOD"),
        };

        let inverters = snapshot
            .readings
            .iter()
            .map(|reading| {
                let (card_class, note) = if reading.comm_lost {
                    let since = reading.last_seen.map_or_else(
                        || "never seen".to_owned(),
                        |t| format_relative_time((now - t).num_seconds()),
                    );
                    ("offline", format!("offline, last seen {since}"))
                } else if reading.fault {
                    ("fault", "fault".to_owned())
                } else {
                    ("", String::new())
                };
                let battery = match reading.role {
                    DeviceRole::Backup => format!("{:.1}V", reading.battery_voltage_v),
                    DeviceRole::Primary | DeviceRole::Unknown => {
                        format!("{:.0}%", reading.battery_capacity_pct.unwrap_or(0.0))
                    }
                };
                InverterCard {
                    label: reading.label.clone(),
                    output: format!("{:.0}W", reading.output_power_w),
                    battery,
                    temperature: format!("{:.0}°C", reading.temperature_c),
                    card_class,
                    note,
                }
            })
            .collect();

        let alerts = state
            .shared
            .recent_alerts()
            .iter()
            .rev()
            .map(|record| AlertRow {
                when: format_relative_time((now - record.fired_at).num_seconds()),
                subject: record.subject.clone(),
            })
            .collect();

        let outlook_line = weather.outlook.map_or_else(String::new, |o| {
            let verdict = if o.poor_conditions {
                "poor charging conditions"
            } else {
                "decent charging conditions"
            };
            format!(
                "Outlook ({}): {:.0}% cloud, {:.0} W/m², {verdict}",
                o.window, o.avg_cloud_cover_pct, o.avg_radiation_wm2
            )
        });

        Self {
            site_name: state.site_name.clone(),
            server_time: format_local(snapshot.taken_at, state.tz),
            status_class,
            status_title,
            load_w: format!("{:.0}", snapshot.totals.load_w),
            solar_w: format!("{:.0}", snapshot.totals.solar_w),
            primary_pct: snapshot
                .primary_min_capacity_pct
                .map_or_else(|| "--".to_owned(), |p| format!("{p:.0}")),
            backup_voltage: snapshot
                .backup_voltage_v
                .map_or_else(|| "--".to_owned(), |v| format!("{v:.1}")),
            backup_tier: snapshot
                .backup_tier
                .map_or_else(|| "unknown".to_owned(), |t| t.to_string()),
            backup_active: snapshot.backup_active,
            generator_running: snapshot.generator_running,
            outlook_line,
            inverters,
            alerts,
        }
    }
}

/// Timestamp in site-local wall time for display
pub fn format_local(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

#[expect(
    clippy::integer_division,
    reason = "integer truncation is intentional for relative time display"
)]
pub fn format_relative_time(seconds: i64) -> String {
    if seconds < 60 {
        "just now".to_owned()
    } else if seconds < 3600 {
        let mins = seconds / 60;
        if mins == 1 {
            "1 minute ago".to_owned()
        } else {
            format!("{mins} minutes ago")
        }
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        if hours == 1 {
            "1 hour ago".to_owned()
        } else {
            format!("{hours} hours ago")
        }
    } else {
        let days = seconds / 86400;
        if days == 1 {
            "1 day ago".to_owned()
        } else {
            format!("{days} days ago")
        }
    }
}
