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

//! Forecast analysis: reduce the hourly forecast to a solar outlook
//!
//! All window arithmetic happens in site-local wall time. Samples from the
//! UTC fallback source are converted before membership checks; getting that
//! wrong would silently corrupt which hours count as daylight.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;

use helioguard_types::{Forecast, OutlookWindow, SolarOutlook};

/// Daylight window bounds, half-open [start, end)
pub const DAYLIGHT_START_HOUR: u32 = 6;
pub const DAYLIGHT_END_HOUR: u32 = 18;

/// Mean cloud cover above this alone declares poor conditions (%)
const POOR_CLOUD_COVER_PCT: f64 = 70.0;
/// Mean radiation below this alone declares poor conditions (W/m²)
const POOR_RADIATION_WM2: f64 = 200.0;

/// Summarize the daylight window relevant right now.
///
/// Returns `None` when no forecast sample falls inside the window; callers
/// must treat that as "no outlook available", which is not the same as a
/// poor outlook.
pub fn analyze(forecast: &Forecast, now: DateTime<Utc>, tz: Tz) -> Option<SolarOutlook> {
    let local_now = now.with_timezone(&tz);
    let nighttime =
        local_now.hour() < DAYLIGHT_START_HOUR || local_now.hour() >= DAYLIGHT_END_HOUR;

    let (window, start, end) = if nighttime {
        let tomorrow = (local_now + TimeDelta::days(1)).date_naive();
        (
            OutlookWindow::Tomorrow,
            tomorrow.and_hms_opt(DAYLIGHT_START_HOUR, 0, 0)?,
            tomorrow.and_hms_opt(DAYLIGHT_END_HOUR, 0, 0)?,
        )
    } else {
        (
            OutlookWindow::TodayRemaining,
            local_now.naive_local(),
            local_now.date_naive().and_hms_opt(DAYLIGHT_END_HOUR, 0, 0)?,
        )
    };

    let mut cloud_sum = 0.0;
    let mut radiation_sum = 0.0;
    let mut counted = 0_usize;

    for hour in &forecast.hours {
        let sample_local = to_local(hour.time, forecast.source.reports_utc(), tz);
        let in_window = sample_local >= start && sample_local < end;
        let in_daylight = sample_local.hour() >= DAYLIGHT_START_HOUR
            && sample_local.hour() < DAYLIGHT_END_HOUR;
        if in_window && in_daylight {
            cloud_sum += hour.cloud_cover_pct;
            radiation_sum += hour.shortwave_radiation_wm2;
            counted += 1;
        }
    }

    if counted == 0 {
        return None;
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "sample counts stay far below mantissa precision"
    )]
    let n = counted as f64;
    let avg_cloud_cover_pct = cloud_sum / n;
    let avg_radiation_wm2 = radiation_sum / n;

    Some(SolarOutlook {
        window,
        avg_cloud_cover_pct,
        avg_radiation_wm2,
        hours_counted: counted,
        // Either signal alone is sufficient to declare poor conditions
        poor_conditions: avg_cloud_cover_pct > POOR_CLOUD_COVER_PCT
            || avg_radiation_wm2 < POOR_RADIATION_WM2,
    })
}

/// Interpret a sample timestamp in the zone its source reported
fn to_local(sample: NaiveDateTime, reports_utc: bool, tz: Tz) -> NaiveDateTime {
    if reports_utc {
        sample.and_utc().with_timezone(&tz).naive_local()
    } else {
        sample
    }
}
