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

//! Alert cooldown ledger
//!
//! The sole gate on alert frequency: a category that fired within its
//! cooldown window is suppressed, with no queuing and no escalation.
//! `record` must only be called after a confirmed delivery.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};

use helioguard_types::{AlertCategory, AlertRecord};

/// Retention for the recent-alert log
fn log_retention() -> TimeDelta {
    TimeDelta::hours(12)
}

#[derive(Debug, Clone, Default)]
pub struct CooldownLedger {
    last_fired: HashMap<AlertCategory, DateTime<Utc>>,
    history: VecDeque<AlertRecord>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a prior firing exists and its cooldown has not yet elapsed
    pub fn should_suppress(&self, category: AlertCategory, now: DateTime<Utc>) -> bool {
        self.last_fired
            .get(&category)
            .is_some_and(|last| now - *last < category.cooldown())
    }

    /// Mark a confirmed delivery and append it to the bounded log
    pub fn record(&mut self, category: AlertCategory, subject: &str, now: DateTime<Utc>) {
        self.last_fired.insert(category, now);
        self.history.push_back(AlertRecord {
            fired_at: now,
            category,
            subject: subject.to_owned(),
        });

        let cutoff = now - log_retention();
        while let Some(front) = self.history.front() {
            if front.fired_at < cutoff {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn last_fired(&self, category: AlertCategory) -> Option<DateTime<Utc>> {
        self.last_fired.get(&category).copied()
    }

    /// Recent alerts, oldest first
    pub fn recent_alerts(&self) -> Vec<AlertRecord> {
        self.history.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_fired_is_not_suppressed() {
        let ledger = CooldownLedger::new();
        assert!(!ledger.should_suppress(AlertCategory::Critical, Utc::now()));
    }

    #[test]
    fn test_suppressed_within_cooldown() {
        let mut ledger = CooldownLedger::new();
        let start = Utc::now();

        ledger.record(AlertCategory::Critical, "Generator running", start);
        assert!(ledger.should_suppress(AlertCategory::Critical, start + TimeDelta::minutes(59)));
        assert!(!ledger.should_suppress(AlertCategory::Critical, start + TimeDelta::minutes(60)));
    }

    #[test]
    fn test_categories_do_not_interfere() {
        let mut ledger = CooldownLedger::new();
        let start = Utc::now();

        ledger.record(AlertCategory::HighLoad, "High load", start);
        assert!(!ledger.should_suppress(AlertCategory::VeryHighLoad, start + TimeDelta::minutes(1)));
    }

    #[test]
    fn test_test_category_never_suppressed() {
        let mut ledger = CooldownLedger::new();
        let start = Utc::now();

        ledger.record(AlertCategory::Test, "Plumbing check", start);
        assert!(!ledger.should_suppress(AlertCategory::Test, start));
    }

    #[test]
    fn test_log_pruned_to_retention() {
        let mut ledger = CooldownLedger::new();
        let start = Utc::now();

        ledger.record(AlertCategory::HighLoad, "first", start);
        ledger.record(AlertCategory::HighLoad, "second", start + TimeDelta::hours(2));
        ledger.record(AlertCategory::HighLoad, "third", start + TimeDelta::hours(13));

        let log = ledger.recent_alerts();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].subject, "second");
        assert_eq!(log[1].subject, "third");
    }
}
