//! Rainfall Monitor - detect the onset of rain and notify once per event

pub mod config;
pub mod feed;
pub mod footprint;
pub mod healthz;
pub mod notification;
pub mod rainfall;

pub use config::Config;
pub use feed::{ForecastFeed, RainState, SensorFeed};
pub use footprint::{FileFootprintStore, FootprintStore};
pub use notification::channel::{NotificationChannel, RainEvent};
pub use notification::channels::line::LineChannel;
pub use notification::channels::voice::VoiceChannel;
pub use rainfall::gate::{GateDecision, GateInput, GatePolicy, SuppressReason, VoicePolicy};
pub use rainfall::watch::WatchCycle;
