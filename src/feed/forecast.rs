//! Hourly precipitation forecast feed
//!
//! Expects a JSON document with today's and tomorrow's precipitation at
//! the configured bucket granularity:
//!
//! ```json
//! { "today":    { "data": [ { "precip": 0.0 }, ... ] },
//!   "tomorrow": { "data": [ { "precip": 1.5 }, ... ] } }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::ForecastSection;
use crate::feed::ForecastFeed;

pub struct JsonForecastFeed {
    client: reqwest::blocking::Client,
    cfg: ForecastSection,
}

impl JsonForecastFeed {
    pub fn new(cfg: ForecastSection) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            cfg,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    today: ForecastDay,
    tomorrow: ForecastDay,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    data: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    precip: f64,
}

impl ForecastFeed for JsonForecastFeed {
    fn precip_buckets(&self) -> Result<Vec<f64>> {
        let resp: ForecastResponse = self
            .client
            .get(&self.cfg.url)
            .send()
            .context("Forecast request failed to send")?
            .error_for_status()
            .context("Forecast request was rejected")?
            .json()
            .context("Forecast response was not valid JSON")?;

        Ok(resp
            .today
            .data
            .iter()
            .chain(resp.tomorrow.data.iter())
            .map(|e| e.precip)
            .collect())
    }
}
