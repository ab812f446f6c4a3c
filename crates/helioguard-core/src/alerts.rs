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

//! Alert rules and dispatch
//!
//! Rule evaluation is pure and returns candidates in priority order. The
//! dispatcher gates each candidate through the cooldown ledger, delivers,
//! and records only confirmed deliveries. A true critical or backup-active
//! condition halts the lesser rules for the cycle regardless of whether its
//! own delivery is suppressed: severity is about the site state, not about
//! email timing.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ledger::CooldownLedger;
use crate::traits::AlertTransport;
use helioguard_types::{AlertCategory, AlertThresholds, Snapshot, SolarOutlook};

/// A rule that matched this cycle, not yet gated by the cooldown ledger
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub category: AlertCategory,
    pub subject: String,
    pub body: String,
}

/// Evaluate all rules against the current cycle, in fixed priority order
pub fn evaluate(
    snapshot: &Snapshot,
    outlook: Option<&SolarOutlook>,
    thresholds: &AlertThresholds,
    site_name: &str,
) -> Vec<AlertCandidate> {
    let mut candidates = Vec::new();

    // 1. Per-device communication loss
    for reading in snapshot.readings.iter().filter(|r| r.comm_lost) {
        let since = reading
            .last_seen
            .map_or_else(|| "unknown".to_owned(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string());
        candidates.push(AlertCandidate {
            category: AlertCategory::CommunicationLost,
            subject: format!("[{site_name}] Communication lost: {}", reading.label),
            body: compose_body(
                site_name,
                &[format!(
                    "{} has not responded since {since}.",
                    reading.label
                )],
                outlook,
            ),
        });
    }

    // 2. Per-device fault alarms
    for reading in snapshot.readings.iter().filter(|r| r.fault) {
        let codes = reading
            .fault_codes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        candidates.push(AlertCandidate {
            category: AlertCategory::FaultAlarm,
            subject: format!("[{site_name}] Fault alarm: {}", reading.label),
            body: compose_body(
                site_name,
                &[format!(
                    "{} reports fault codes: {codes}.",
                    reading.label
                )],
                outlook,
            ),
        });
    }

    // 3. Per-device high temperature
    for reading in snapshot
        .readings
        .iter()
        .filter(|r| !r.comm_lost && r.temperature_c >= thresholds.temperature_high_c)
    {
        candidates.push(AlertCandidate {
            category: AlertCategory::HighTemperature,
            subject: format!("[{site_name}] High temperature: {}", reading.label),
            body: compose_body(
                site_name,
                &[format!(
                    "{} is at {:.1}°C (limit {:.0}°C).",
                    reading.label, reading.temperature_c, thresholds.temperature_high_c
                )],
                outlook,
            ),
        });
    }

    // 4. Critical: generator running or backup battery below the floor.
    //    Supersedes everything below.
    let backup_critical = snapshot
        .backup_voltage_v
        .is_some_and(|v| v < thresholds.backup_voltage_critical_v);
    if snapshot.generator_running || backup_critical {
        let mut lines = Vec::new();
        if snapshot.generator_running {
            lines.push("The generator is running.".to_owned());
        }
        if backup_critical
            && let Some(voltage) = snapshot.backup_voltage_v
        {
            lines.push(format!(
                "Backup battery voltage is {voltage:.1}V (floor {:.1}V).",
                thresholds.backup_voltage_critical_v
            ));
        }
        let reason = if snapshot.generator_running {
            "generator running"
        } else {
            "backup battery low"
        };
        candidates.push(AlertCandidate {
            category: AlertCategory::Critical,
            subject: format!("[{site_name}] CRITICAL: {reason}"),
            body: compose_body(site_name, &lines, outlook),
        });
        return candidates;
    }

    // 5. Backup supplying load while the primaries are low. Supersedes the
    //    discharge bands.
    let primary_low = snapshot
        .primary_min_capacity_pct
        .is_some_and(|min| min < thresholds.primary_battery_low_pct);
    if snapshot.backup_active && primary_low {
        let min_pct = snapshot.primary_min_capacity_pct.unwrap_or(0.0);
        let backup_power = snapshot
            .readings
            .iter()
            .find(|r| r.role == helioguard_types::DeviceRole::Backup)
            .map_or(0.0, |r| r.output_power_w);
        candidates.push(AlertCandidate {
            category: AlertCategory::BackupActive,
            subject: format!("[{site_name}] Backup battery supplying load"),
            body: compose_body(
                site_name,
                &[format!(
                    "Backup output is {backup_power:.0}W with primary battery minimum at {min_pct:.0}%."
                )],
                outlook,
            ),
        });
        return candidates;
    }

    // 6. Aggregate discharge bands
    let discharge = snapshot.totals.discharge_w;
    if discharge >= thresholds.discharge_very_high_w {
        candidates.push(AlertCandidate {
            category: AlertCategory::VeryHighLoad,
            subject: format!("[{site_name}] Very high load: {discharge:.0}W discharge"),
            body: compose_body(
                site_name,
                &[format!(
                    "Aggregate battery discharge is {discharge:.0}W (band starts at {:.0}W).",
                    thresholds.discharge_very_high_w
                )],
                outlook,
            ),
        });
    } else if discharge >= thresholds.discharge_high_w {
        candidates.push(AlertCandidate {
            category: AlertCategory::HighLoad,
            subject: format!("[{site_name}] High load: {discharge:.0}W discharge"),
            body: compose_body(
                site_name,
                &[format!(
                    "Aggregate battery discharge is {discharge:.0}W (band {:.0}-{:.0}W).",
                    thresholds.discharge_high_w, thresholds.discharge_very_high_w
                )],
                outlook,
            ),
        });
    }

    candidates
}

/// Small HTML body: the triggering values plus the current solar outlook
fn compose_body(site_name: &str, lines: &[String], outlook: Option<&SolarOutlook>) -> String {
    let mut body = format!("<h3>{site_name}</h3><ul>");
    for line in lines {
        body.push_str("<li>");
        body.push_str(line);
        body.push_str("</li>");
    }
    body.push_str("</ul>");

    if let Some(o) = outlook {
        let verdict = if o.poor_conditions {
            " Poor charging conditions expected."
        } else {
            ""
        };
        body.push_str(&format!(
            "<p>Solar outlook ({}): avg cloud cover {:.0}%, avg radiation {:.0} W/m².{verdict}</p>",
            o.window, o.avg_cloud_cover_pct, o.avg_radiation_wm2
        ));
    }

    body
}

/// Delivers candidates through the cooldown ledger
pub struct AlertDispatcher {
    transport: Option<Arc<dyn AlertTransport>>,
    pub ledger: CooldownLedger,
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .finish_non_exhaustive()
    }
}

impl AlertDispatcher {
    /// `None` transport means delivery is not configured: candidates are
    /// logged and dropped without touching the ledger
    pub fn new(transport: Option<Arc<dyn AlertTransport>>) -> Self {
        Self {
            transport,
            ledger: CooldownLedger::new(),
        }
    }

    /// Deliver candidates in order; returns the number actually delivered
    pub async fn dispatch(
        &mut self,
        candidates: Vec<AlertCandidate>,
        now: DateTime<Utc>,
    ) -> usize {
        let mut delivered = 0;
        for candidate in candidates {
            if self.ledger.should_suppress(candidate.category, now) {
                debug!(
                    "Alert '{}' suppressed, cooldown active",
                    candidate.category
                );
                continue;
            }

            let Some(ref transport) = self.transport else {
                warn!("No alert transport configured, dropping: {}", candidate.subject);
                continue;
            };

            match transport.deliver(&candidate.subject, &candidate.body).await {
                Ok(true) => {
                    info!("Alert delivered: {}", candidate.subject);
                    self.ledger.record(candidate.category, &candidate.subject, now);
                    delivered += 1;
                }
                Ok(false) => {
                    warn!("Alert rejected by transport: {}", candidate.subject);
                }
                Err(e) => {
                    warn!("Alert delivery failed: {e}");
                }
            }
        }
        delivered
    }
}
