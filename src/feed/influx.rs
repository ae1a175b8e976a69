//! InfluxDB 2.x sensor feed
//!
//! Issues Flux queries over HTTP and parses the annotated CSV response.
//! The sensor writes a `raining` point on each transition into rain, a
//! `rain` point per measured millimeter bucket, and periodic `solar_rad`
//! samples, all tagged with the reporting hostname.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::config::SensorSection;
use crate::feed::SensorFeed;

pub struct InfluxSensorFeed {
    client: reqwest::blocking::Client,
    cfg: SensorSection,
}

impl InfluxSensorFeed {
    pub fn new(cfg: SensorSection) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            cfg,
        }
    }

    fn query(&self, flux: &str) -> Result<String> {
        let url = format!(
            "{}/api/v2/query?org={}",
            self.cfg.url.trim_end_matches('/'),
            self.cfg.org
        );

        debug!(flux = %flux, "Influx query");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.cfg.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(flux.to_string())
            .send()
            .context("Influx query failed to send")?;

        if !resp.status().is_success() {
            bail!("Influx query failed: HTTP {}", resp.status());
        }

        Ok(resp.text().context("Influx response was not readable")?)
    }

    fn base_filter(&self, field: &str) -> String {
        format!(
            r#"|> filter(fn: (r) => r._measurement == "{}" and r.hostname == "{}" and r._field == "{}")"#,
            self.cfg.measurement, self.cfg.hostname, field
        )
    }
}

impl SensorFeed for InfluxSensorFeed {
    fn last_rain_start(&self) -> Result<Option<DateTime<Utc>>> {
        let flux = format!(
            r#"from(bucket: "{}") |> range(start: -30d) {} |> filter(fn: (r) => r._value == true) |> last()"#,
            self.cfg.bucket,
            self.base_filter("raining"),
        );

        let csv = self.query(&flux)?;
        Ok(parse_time(&csv))
    }

    fn trailing_sum_mm(&self, window_min: u32) -> Result<f64> {
        let flux = format!(
            r#"from(bucket: "{}") |> range(start: -{}m) {} |> sum()"#,
            self.cfg.bucket,
            window_min,
            self.base_filter("rain"),
        );

        let csv = self.query(&flux)?;
        // No data in the window means no rain measured
        Ok(parse_value(&csv).unwrap_or(0.0))
    }

    fn solar_rad(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Option<f64>> {
        let flux = format!(
            r#"from(bucket: "{}") |> range(start: {}, stop: {}) {} |> last()"#,
            self.cfg.bucket,
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            stop.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.base_filter("solar_rad"),
        );

        let csv = self.query(&flux)?;
        Ok(parse_value(&csv))
    }
}

/// First data record of an annotated CSV response, as (header, record)
fn first_record(csv: &str) -> Option<(Vec<&str>, Vec<&str>)> {
    let mut rows = csv
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let header: Vec<&str> = rows.next()?.split(',').collect();
    let record: Vec<&str> = rows.next()?.split(',').collect();
    Some((header, record))
}

fn column<'a>(header: &[&str], record: &[&'a str], name: &str) -> Option<&'a str> {
    let idx = header.iter().position(|c| *c == name)?;
    record.get(idx).copied()
}

/// `_value` column of the first record, if the response has one
fn parse_value(csv: &str) -> Option<f64> {
    let (header, record) = first_record(csv)?;
    column(&header, &record, "_value")?.parse().ok()
}

/// `_time` column of the first record, if the response has one
fn parse_time(csv: &str) -> Option<DateTime<Utc>> {
    let (header, record) = first_record(csv)?;
    DateTime::parse_from_rfc3339(column(&header, &record, "_time")?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
