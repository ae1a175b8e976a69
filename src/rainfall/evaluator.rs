//! Rain event evaluation
//!
//! Pulls the current rain situation out of the sensor history and the
//! forecast. Everything here is recomputed fresh on every tick.

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Local, Utc};

use crate::feed::SensorFeed;

/// Substituted rain-start age when the history has no event at all.
/// Old enough that every gate reads it as long-handled.
const SENTINEL_DAYS: i64 = 365;

/// Solar radiation window around the rain onset
const ONSET_LOOKBACK_MIN: i64 = 10;
const ONSET_LOOKAHEAD_MIN: i64 = 1;

/// Timestamp of the most recent transition into "raining", in local time.
///
/// A history without any rain event yields a sentinel one year in the
/// past so that the first-ever run never notifies.
pub fn rain_start(sensor: &dyn SensorFeed, now: DateTime<Local>) -> Result<DateTime<Local>> {
    match sensor.last_rain_start()? {
        Some(start) => Ok(start.with_timezone(&Local)),
        None => Ok(now - Duration::days(SENTINEL_DAYS)),
    }
}

/// Rainfall over the trailing window, clamped non-negative
pub fn trailing_sum(sensor: &dyn SensorFeed, window_min: u32) -> Result<f64> {
    Ok(sensor.trailing_sum_mm(window_min)?.max(0.0))
}

/// Precipitation expected over the next `period_hours`, linearly
/// interpolated between the two surrounding forecast buckets.
///
/// `buckets` holds one value per `period_hours` slot, today's slots
/// followed by tomorrow's. For hour `h`:
///
/// ```text
/// lower = h / period
/// upper = lower + 1
/// w_upper = (h - lower * period) / period      (0 <= w_upper < 1)
/// result = buckets[lower] * (1 - w_upper) + buckets[upper] * w_upper
/// ```
///
/// Fails when fewer than `24 / period + 1` buckets are supplied; the
/// caller must provide two forecast days so that `upper` is always a
/// valid index, even late in the evening.
pub fn forecast_mm(buckets: &[f64], hour: u32, period_hours: u32) -> Result<f64> {
    let period = period_hours as usize;
    let needed = 24 / period + 1;
    if buckets.len() < needed {
        bail!(
            "Forecast supplied {} buckets, need at least {} (two days at {}h granularity)",
            buckets.len(),
            needed,
            period_hours
        );
    }

    let lower = hour as usize / period;
    let upper = lower + 1;
    let weight_upper = (hour as f64 - (lower * period) as f64) / period as f64;

    Ok(buckets[lower] * (1.0 - weight_upper) + buckets[upper] * weight_upper)
}

/// Last solar radiation sample around the rain onset, if the feed has one.
///
/// A missing sample is not an error; the gate then proceeds as if the
/// radiation were below its threshold.
pub fn solar_rad_at_onset(
    sensor: &dyn SensorFeed,
    rain_start: DateTime<Local>,
) -> Result<Option<f64>> {
    let start = (rain_start - Duration::minutes(ONSET_LOOKBACK_MIN)).with_timezone(&Utc);
    let stop = (rain_start + Duration::minutes(ONSET_LOOKAHEAD_MIN)).with_timezone(&Utc);
    sensor.solar_rad(start, stop)
}
