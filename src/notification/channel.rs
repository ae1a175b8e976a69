//! Notification channel trait

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::rainfall::gate::SuppressReason;

/// A rain-start event as handed to the channels
#[derive(Debug, Clone)]
pub struct RainEvent {
    pub rain_start: DateTime<Local>,
    /// Rainfall measured over the trailing `sum_min` minutes
    pub trailing_sum_mm: f64,
    /// Precipitation expected over the next `period_hours`
    pub forecast_mm: f64,
    pub sum_min: u32,
    pub period_hours: u32,
}

/// One notification output. The name doubles as the footprint key the
/// orchestrator debounces the channel under.
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Channel-specific gating applied after the common gate approves.
    /// Returning a reason suppresses the send without touching the
    /// channel footprint.
    fn extra_gate(&self, event: &RainEvent, hour: u32) -> Option<SuppressReason> {
        let _ = (event, hour);
        None
    }

    /// Deliver the notification. An error here means the footprint stays
    /// untouched and the send is retried on the next tick.
    fn send(&self, event: &RainEvent) -> Result<()>;
}
