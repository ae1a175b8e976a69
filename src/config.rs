//! Configuration loading
//!
//! The whole config is deserialized once at startup and threaded through
//! every call as an immutable value. No module-level globals.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchSection,
    pub sensor: SensorSection,
    pub forecast: ForecastSection,
    #[serde(default)]
    pub gate: GateSection,
    pub notify: NotifySection,
    #[serde(default)]
    pub footprint: FootprintSection,
    #[serde(default)]
    pub liveness: LivenessSection,
}

impl Config {
    /// Load and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Poll interval in seconds
    #[serde(default = "default_interval_sec")]
    pub interval_sec: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            interval_sec: default_interval_sec(),
        }
    }
}

/// Time-series store holding the rain sensor history (InfluxDB 2.x)
#[derive(Debug, Clone, Deserialize)]
pub struct SensorSection {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
    pub hostname: String,
    /// Trailing window for the recent-rainfall sum, in minutes
    #[serde(default = "default_sum_min")]
    pub sum_min: u32,
    /// Solar radiation at or above this value marks a rain-start as an
    /// optical-sensor false positive
    #[serde(default = "default_solar_rad_threshold")]
    pub solar_rad_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSection {
    pub url: String,
    /// Granularity of the forecast precipitation buckets, in hours
    #[serde(default = "default_period_hours")]
    pub period_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateSection {
    /// A repeat detection within this window counts as the same rain spell
    #[serde(default = "default_continuous_rain_window_sec")]
    pub continuous_rain_window_sec: u64,
    /// Rain that started this long before the process did is not ours to report
    #[serde(default = "default_startup_grace_sec")]
    pub startup_grace_sec: u64,
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            continuous_rain_window_sec: default_continuous_rain_window_sec(),
            startup_grace_sec: default_startup_grace_sec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifySection {
    pub line: LineSection,
    pub voice: VoiceSection,
}

/// LINE Messaging API channel
#[derive(Debug, Clone, Deserialize)]
pub struct LineSection {
    /// Channel access token
    pub token: String,
    /// Destination user or group ID
    pub to: String,
    /// chrono format string for the radar thumbnail image URL
    pub radar_url_template: String,
    /// Link target for "show the radar"
    pub radar_view_url: String,
    /// Link target for "weather forecast"
    pub forecast_url: String,
    #[serde(default = "default_line_endpoint")]
    pub endpoint: String,
}

/// Synthesized voice announcement channel
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceSection {
    /// TTS endpoint returning WAV bytes for a text payload
    pub synth_url: String,
    /// External player command for WAV files
    #[serde(default = "default_play_cmd")]
    pub play_cmd: String,
    /// Optional chime clip played before the announcement
    #[serde(default)]
    pub chime_file: Option<PathBuf>,
    /// Active hours (inclusive); outside this range voice stays silent
    #[serde(default = "default_voice_hour_start")]
    pub hour_start: u32,
    #[serde(default = "default_voice_hour_end")]
    pub hour_end: u32,
    /// Minimum rainfall (observed or forecast) worth an audible alert
    #[serde(default = "default_voice_min_mm")]
    pub min_mm: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootprintSection {
    /// Directory for per-key footprint marker files
    #[serde(default = "default_footprint_dir")]
    pub dir: PathBuf,
}

impl Default for FootprintSection {
    fn default() -> Self {
        Self {
            dir: default_footprint_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LivenessSection {
    /// Footprint key touched once per completed tick
    #[serde(default = "default_liveness_key")]
    pub key: String,
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            key: default_liveness_key(),
        }
    }
}

fn default_interval_sec() -> u64 {
    60
}

fn default_sum_min() -> u32 {
    3
}

fn default_solar_rad_threshold() -> f64 {
    600.0
}

fn default_period_hours() -> u32 {
    3
}

fn default_continuous_rain_window_sec() -> u64 {
    30 * 60
}

fn default_startup_grace_sec() -> u64 {
    10 * 60
}

fn default_line_endpoint() -> String {
    "https://api.line.me/v2/bot/message/push".to_string()
}

fn default_play_cmd() -> String {
    "aplay".to_string()
}

fn default_voice_hour_start() -> u32 {
    7
}

fn default_voice_hour_end() -> u32 {
    22
}

fn default_voice_min_mm() -> f64 {
    0.1
}

fn default_footprint_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rainfall-monitor")
}

fn default_liveness_key() -> String {
    "watch".to_string()
}
