//! LINE chat channel
//!
//! Pushes a buttons-template message through the LINE Messaging API with
//! a radar thumbnail and links to the forecast and the radar view.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, TimeZone};
use serde_json::json;
use tracing::info;

use crate::config::LineSection;
use crate::notification::channel::{NotificationChannel, RainEvent};

const RADAR_DELAY_SEC: i64 = 10 * 60;
const RADAR_STEP_SEC: i64 = 5 * 60;

pub struct LineChannel {
    client: reqwest::blocking::Client,
    cfg: LineSection,
}

impl LineChannel {
    pub fn new(cfg: LineSection) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            cfg,
        }
    }

    fn radar_url(&self, now: DateTime<Local>) -> String {
        radar_timestamp(now)
            .format(&self.cfg.radar_url_template)
            .to_string()
    }

    fn build_payload(&self, event: &RainEvent, now: DateTime<Local>) -> serde_json::Value {
        json!({
            "to": self.cfg.to,
            "messages": [{
                "type": "template",
                "altText": "雨が降り始めました！",
                "template": {
                    "type": "buttons",
                    "thumbnailImageUrl": self.radar_url(now),
                    "imageAspectRatio": "rectangle",
                    "imageSize": "cover",
                    "imageBackgroundColor": "#FFFFFF",
                    "title": "天気速報",
                    "text": format!(
                        "雨が降り始めました。\n今後{}時間で{:.1}mm降る見込みです。",
                        event.period_hours, event.forecast_mm
                    ),
                    "defaultAction": {
                        "type": "uri",
                        "label": "雨雲を見る",
                        "uri": self.cfg.radar_view_url,
                    },
                    "actions": [
                        { "type": "uri", "label": "天気予報", "uri": self.cfg.forecast_url },
                        { "type": "uri", "label": "雨雲", "uri": self.cfg.radar_view_url },
                    ],
                }
            }]
        })
    }
}

/// Radar image timestamp: 10 minutes in the past (upstream image
/// generation lags), floored to a 5-minute mark.
pub fn radar_timestamp(now: DateTime<Local>) -> DateTime<Local> {
    let delayed = now.timestamp() - RADAR_DELAY_SEC;
    let floored = delayed - delayed.rem_euclid(RADAR_STEP_SEC);
    Local.timestamp_opt(floored, 0).single().unwrap_or(now)
}

impl NotificationChannel for LineChannel {
    fn name(&self) -> &str {
        "line"
    }

    fn send(&self, event: &RainEvent) -> Result<()> {
        let now = Local::now();
        let payload = self.build_payload(event, now);

        info!(radar_url = %self.radar_url(now), "Pushing LINE message");

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .bearer_auth(&self.cfg.token)
            .json(&payload)
            .send()
            .context("LINE push failed to send")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("LINE push was rejected: HTTP {status}: {body}");
        }

        Ok(())
    }
}
