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

//! Raw vendor payload to typed reading conversion
//!
//! Policy: a missing or null numeric field never fails the cycle, it
//! normalizes to zero. Only the orchestrator synthesizes the
//! communication-lost placeholder, and only after the configured timeout.

use chrono::{DateTime, Utc};

use crate::vendor::RawDeviceSnapshot;
use helioguard_types::{DeviceConfig, DeviceReading, DeviceRole};

/// Build a reading from a successful vendor payload
pub fn normalize_reading(
    raw: &RawDeviceSnapshot,
    device: &DeviceConfig,
    now: DateTime<Utc>,
) -> DeviceReading {
    // capacity is authoritative for charge-reporting roles, voltage for backup
    let battery_capacity_pct = match device.role {
        DeviceRole::Backup => None,
        DeviceRole::Primary | DeviceRole::Unknown => {
            Some(raw.soc.unwrap_or(0.0).clamp(0.0, 100.0))
        }
    };

    let solar_input_w = [raw.pv1_power, raw.pv2_power, raw.pv3_power]
        .iter()
        .flatten()
        .sum();

    let temperature_c = [
        raw.inverter_temperature,
        raw.battery_temperature,
        raw.board_temperature,
    ]
    .iter()
    .flatten()
    .fold(0.0_f64, |acc, t| acc.max(*t));

    let error_code = raw.error_code.unwrap_or(0);
    let mut fault_codes: Vec<u32> = raw.fault_codes.iter().copied().filter(|c| *c != 0).collect();
    if error_code != 0 {
        fault_codes.insert(0, error_code);
    }
    let fault = !fault_codes.is_empty();

    DeviceReading {
        serial: device.serial.clone(),
        label: device.label.clone(),
        role: device.role,
        display_order: device.display_order,
        output_power_w: raw.ac_power.unwrap_or(0.0),
        battery_capacity_pct,
        battery_voltage_v: raw.battery_voltage.unwrap_or(0.0),
        battery_power_w: raw.battery_power.unwrap_or(0.0),
        solar_input_w,
        temperature_c,
        ac_input_voltage_v: raw.ac_input_voltage.unwrap_or(0.0),
        ac_input_power_w: raw.ac_input_power.unwrap_or(0.0),
        fault,
        fault_codes,
        comm_lost: false,
        last_seen: Some(now),
    }
}

/// Placeholder for a device that has been unreachable past the timeout
pub fn comm_lost_reading(device: &DeviceConfig, last_seen: DateTime<Utc>) -> DeviceReading {
    DeviceReading {
        serial: device.serial.clone(),
        label: device.label.clone(),
        role: device.role,
        display_order: device.display_order,
        output_power_w: 0.0,
        battery_capacity_pct: None,
        battery_voltage_v: 0.0,
        battery_power_w: 0.0,
        solar_input_w: 0.0,
        temperature_c: 0.0,
        ac_input_voltage_v: 0.0,
        ac_input_power_w: 0.0,
        fault: false,
        fault_codes: Vec::new(),
        comm_lost: true,
        last_seen: Some(last_seen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary_device() -> DeviceConfig {
        DeviceConfig {
            serial: "SN100".to_owned(),
            label: "Inverter 1".to_owned(),
            role: DeviceRole::Primary,
            display_order: 1,
        }
    }

    fn backup_device() -> DeviceConfig {
        DeviceConfig {
            serial: "SN300".to_owned(),
            label: "Inverter 3 (Backup)".to_owned(),
            role: DeviceRole::Backup,
            display_order: 3,
        }
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let reading = normalize_reading(&RawDeviceSnapshot::default(), &primary_device(), Utc::now());

        assert_eq!(reading.output_power_w, 0.0);
        assert_eq!(reading.battery_capacity_pct, Some(0.0));
        assert_eq!(reading.solar_input_w, 0.0);
        assert_eq!(reading.temperature_c, 0.0);
        assert!(!reading.fault);
        assert!(!reading.comm_lost);
    }

    #[test]
    fn test_temperature_takes_hottest_sensor() {
        let raw = RawDeviceSnapshot {
            inverter_temperature: Some(41.0),
            battery_temperature: Some(38.5),
            board_temperature: Some(47.2),
            ..Default::default()
        };
        let reading = normalize_reading(&raw, &primary_device(), Utc::now());
        assert_eq!(reading.temperature_c, 47.2);
    }

    #[test]
    fn test_solar_input_sums_mppt_channels() {
        let raw = RawDeviceSnapshot {
            pv1_power: Some(300.0),
            pv2_power: Some(150.0),
            ..Default::default()
        };
        let reading = normalize_reading(&raw, &primary_device(), Utc::now());
        assert_eq!(reading.solar_input_w, 450.0);
    }

    #[test]
    fn test_fault_from_error_code_or_fault_codes() {
        let raw = RawDeviceSnapshot {
            error_code: Some(23),
            fault_codes: vec![0, 104],
            ..Default::default()
        };
        let reading = normalize_reading(&raw, &primary_device(), Utc::now());
        assert!(reading.fault);
        assert_eq!(reading.fault_codes, vec![23, 104]);

        let clean = RawDeviceSnapshot {
            error_code: Some(0),
            fault_codes: vec![0],
            ..Default::default()
        };
        let reading = normalize_reading(&clean, &primary_device(), Utc::now());
        assert!(!reading.fault);
        assert!(reading.fault_codes.is_empty());
    }

    #[test]
    fn test_backup_role_is_voltage_authoritative() {
        let raw = RawDeviceSnapshot {
            soc: Some(80.0),
            battery_voltage: Some(53.2),
            ..Default::default()
        };
        let reading = normalize_reading(&raw, &backup_device(), Utc::now());
        assert_eq!(reading.battery_capacity_pct, None);
        assert_eq!(reading.battery_voltage_v, 53.2);
    }

    #[test]
    fn test_capacity_clamped_to_percent_range() {
        let raw = RawDeviceSnapshot {
            soc: Some(120.0),
            ..Default::default()
        };
        let reading = normalize_reading(&raw, &primary_device(), Utc::now());
        assert_eq!(reading.battery_capacity_pct, Some(100.0));
    }

    #[test]
    fn test_comm_lost_placeholder() {
        let last_seen = Utc::now();
        let reading = comm_lost_reading(&backup_device(), last_seen);

        assert!(reading.comm_lost);
        assert_eq!(reading.last_seen, Some(last_seen));
        assert_eq!(reading.output_power_w, 0.0);
        assert_eq!(reading.role, DeviceRole::Backup);
    }
}
