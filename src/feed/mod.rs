//! External data feeds - narrow interfaces over the sensor history and
//! the weather forecast

pub mod forecast;
pub mod influx;

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Time-series sensor history (rain gauge + solar radiation)
pub trait SensorFeed {
    /// Timestamp of the most recent transition into "raining", if any
    fn last_rain_start(&self) -> Result<Option<DateTime<Utc>>>;

    /// Rainfall summed over the trailing window, in millimeters
    fn trailing_sum_mm(&self, window_min: u32) -> Result<f64>;

    /// Last solar radiation sample within the window, if any
    fn solar_rad(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Option<f64>>;
}

/// Hourly precipitation forecast for today and tomorrow
pub trait ForecastFeed {
    /// Precipitation buckets at `period_hours` granularity, today's
    /// buckets followed by tomorrow's
    fn precip_buckets(&self) -> Result<Vec<f64>>;
}

/// Snapshot of the rain situation, recomputed fresh every tick
#[derive(Debug, Clone)]
pub struct RainState {
    pub rain_start: DateTime<chrono::Local>,
    pub trailing_sum_mm: f64,
    pub forecast_mm: f64,
    pub solar_rad: Option<f64>,
}
