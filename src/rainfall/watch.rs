//! Watch cycle - one gate-and-dispatch pass per poll tick
//!
//! Single-threaded, synchronous: a tick runs feed queries, gate
//! evaluation, dispatch, and footprint updates to completion before the
//! next tick's sleep begins. The orchestrator owns the footprint store;
//! channels never share mutable state with each other.

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Local, Timelike};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::feed::{ForecastFeed, RainState, SensorFeed};
use crate::footprint::FootprintStore;
use crate::notification::channel::{NotificationChannel, RainEvent};
use crate::rainfall::evaluator;
use crate::rainfall::gate::{self, GateDecision, GateInput, GatePolicy};

pub struct WatchCycle {
    config: Config,
    sensor: Box<dyn SensorFeed>,
    forecast: Box<dyn ForecastFeed>,
    footprints: Arc<dyn FootprintStore>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    policy: GatePolicy,
    process_start: DateTime<Local>,
    dry_run: bool,
}

impl WatchCycle {
    pub fn new(
        config: Config,
        sensor: Box<dyn SensorFeed>,
        forecast: Box<dyn ForecastFeed>,
        footprints: Arc<dyn FootprintStore>,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> Self {
        let policy = GatePolicy::from_config(&config);
        Self {
            config,
            sensor,
            forecast,
            footprints,
            channels,
            policy,
            process_start: Local::now(),
            dry_run: false,
        }
    }

    /// Evaluate and log but skip actual dispatch
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Override the recorded process start (tests)
    pub fn with_process_start(mut self, process_start: DateTime<Local>) -> Self {
        self.process_start = process_start;
        self
    }

    /// Run one tick against the wall clock
    pub fn tick(&self) -> Result<()> {
        self.tick_at(Local::now())
    }

    /// Run one tick as of `now`. The liveness footprint is touched even
    /// when the rain logic fails; the error still propagates so the
    /// caller can log it.
    pub fn tick_at(&self, now: DateTime<Local>) -> Result<()> {
        let outcome = self.check_and_notify(now);
        self.footprints.update(&self.config.liveness.key)?;
        outcome
    }

    fn evaluate_rain_state(&self, now: DateTime<Local>) -> Result<RainState> {
        let rain_start = evaluator::rain_start(self.sensor.as_ref(), now)?;
        let trailing_sum_mm =
            evaluator::trailing_sum(self.sensor.as_ref(), self.config.sensor.sum_min)?;
        let buckets = self.forecast.precip_buckets()?;
        let forecast_mm =
            evaluator::forecast_mm(&buckets, now.hour(), self.config.forecast.period_hours)?;
        let solar_rad = evaluator::solar_rad_at_onset(self.sensor.as_ref(), rain_start)?;

        Ok(RainState {
            rain_start,
            trailing_sum_mm,
            forecast_mm,
            solar_rad,
        })
    }

    fn check_and_notify(&self, now: DateTime<Local>) -> Result<()> {
        let state = self.evaluate_rain_state(now)?;

        debug!(
            rain_start = %state.rain_start.format("%Y/%m/%d %H:%M"),
            trailing_sum_mm = state.trailing_sum_mm,
            forecast_mm = state.forecast_mm,
            solar_rad = ?state.solar_rad,
            "Rain state"
        );

        let event = RainEvent {
            rain_start: state.rain_start,
            trailing_sum_mm: state.trailing_sum_mm,
            forecast_mm: state.forecast_mm,
            sum_min: self.config.sensor.sum_min,
            period_hours: self.config.forecast.period_hours,
        };

        let mut failed = 0usize;
        for channel in &self.channels {
            if let Err(e) = self.gate_and_dispatch(channel.as_ref(), &event, &state, now) {
                warn!(channel = channel.name(), error = %e, "Channel dispatch failed");
                failed += 1;
            }
        }

        if failed > 0 {
            bail!("{failed} channel(s) failed to dispatch");
        }
        Ok(())
    }

    fn gate_and_dispatch(
        &self,
        channel: &dyn NotificationChannel,
        event: &RainEvent,
        state: &RainState,
        now: DateTime<Local>,
    ) -> Result<()> {
        let elapsed = self
            .footprints
            .elapsed(channel.name())?
            .map(|d| Duration::from_std(d).unwrap_or_else(|_| Duration::max_value()));

        let input = GateInput {
            now,
            rain_start: event.rain_start,
            process_start: self.process_start,
            elapsed,
            solar_rad: state.solar_rad,
        };

        match gate::evaluate(&input, &self.policy) {
            GateDecision::Suppress {
                reason,
                refresh_footprint,
            } => {
                info!(
                    channel = channel.name(),
                    reason = ?reason,
                    "Notification suppressed"
                );
                if refresh_footprint {
                    self.footprints.update(channel.name())?;
                }
                Ok(())
            }
            GateDecision::Approve => {
                if let Some(reason) = channel.extra_gate(event, now.hour()) {
                    info!(
                        channel = channel.name(),
                        reason = ?reason,
                        "Notification held back by channel gate"
                    );
                    return Ok(());
                }

                if self.dry_run {
                    info!(channel = channel.name(), "Dry-run: would notify");
                    return Ok(());
                }

                // The footprint moves only after a successful dispatch;
                // a failed send is retried on the next tick.
                channel.send(event)?;
                self.footprints.update(channel.name())?;

                info!(
                    channel = channel.name(),
                    rain_start = %event.rain_start.format("%Y/%m/%d %H:%M"),
                    "Notified"
                );
                Ok(())
            }
        }
    }

    /// Poll until `count` ticks have run; `count == 0` runs forever.
    /// A failed tick is logged and the loop carries on.
    pub fn run(&self, count: u32) -> Result<()> {
        let interval = std::time::Duration::from_secs(self.config.watch.interval_sec);
        info!(
            interval_sec = self.config.watch.interval_sec,
            "Starting rain watch"
        );

        let mut done = 0u32;
        loop {
            let started = Instant::now();

            if let Err(e) = self.tick() {
                error!(error = %e, "Tick failed");
            }

            done += 1;
            if count != 0 && done >= count {
                info!("The requested number of ticks has been reached, stopping");
                return Ok(());
            }

            let wait = interval
                .saturating_sub(started.elapsed())
                .max(std::time::Duration::from_secs(1));
            std::thread::sleep(wait);
        }
    }
}
