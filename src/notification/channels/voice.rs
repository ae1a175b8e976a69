//! Synthesized voice channel
//!
//! Fetches WAV bytes from a TTS endpoint and plays them through an
//! external player command, optionally preceded by a chime clip. Carries
//! the voice-only magnitude and active-hours gates.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::config::VoiceSection;
use crate::notification::channel::{NotificationChannel, RainEvent};
use crate::rainfall::gate::{self, SuppressReason, VoicePolicy};

/// Amounts below this are not worth mentioning in the announcement
const MENTION_MIN_MM: f64 = 0.1;

pub struct VoiceChannel {
    client: reqwest::blocking::Client,
    cfg: VoiceSection,
    policy: VoicePolicy,
}

impl VoiceChannel {
    pub fn new(cfg: VoiceSection) -> Self {
        let policy = VoicePolicy::from(&cfg);
        Self {
            client: reqwest::blocking::Client::new(),
            cfg,
            policy,
        }
    }

    fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .post(&self.cfg.synth_url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .context("Voice synthesis request failed to send")?
            .error_for_status()
            .context("Voice synthesis request was rejected")?;

        Ok(resp.bytes().context("Voice synthesis response was not readable")?.to_vec())
    }

    fn play_file(&self, path: &Path) -> Result<()> {
        debug!(player = %self.cfg.play_cmd, file = %path.display(), "Playing WAV");

        let status = Command::new(&self.cfg.play_cmd)
            .arg(path)
            .status()
            .with_context(|| format!("Failed to launch player: {}", self.cfg.play_cmd))?;

        if !status.success() {
            bail!("Player exited with {status}");
        }
        Ok(())
    }

    fn play_bytes(&self, wav: &[u8]) -> Result<()> {
        let path = scratch_wav_path();
        std::fs::write(&path, wav)
            .with_context(|| format!("Failed to write WAV to {}", path.display()))?;

        let played = self.play_file(&path);
        let _ = std::fs::remove_file(&path);
        played
    }
}

fn scratch_wav_path() -> PathBuf {
    std::env::temp_dir().join(format!("rainmon-voice-{}.wav", std::process::id()))
}

/// Spoken summary: the onset always, the trailing sum and the forecast
/// only when they are large enough to matter.
pub fn compose_message(
    trailing_sum_mm: f64,
    forecast_mm: f64,
    sum_min: u32,
    period_hours: u32,
) -> String {
    let mut message = String::from("雨が降り始めました。");
    if trailing_sum_mm >= MENTION_MIN_MM {
        message.push_str(&format!(
            "過去{sum_min}分間に{trailing_sum_mm:.1}mm降っています。"
        ));
    }
    if forecast_mm >= MENTION_MIN_MM {
        message.push_str(&format!(
            "今後{period_hours}時間で{forecast_mm:.1}mm降る見込みです。"
        ));
    }
    message
}

impl NotificationChannel for VoiceChannel {
    fn name(&self) -> &str {
        "voice"
    }

    fn extra_gate(&self, event: &RainEvent, hour: u32) -> Option<SuppressReason> {
        gate::voice_extra(
            event.trailing_sum_mm,
            event.forecast_mm,
            hour,
            &self.policy,
        )
    }

    fn send(&self, event: &RainEvent) -> Result<()> {
        let text = compose_message(
            event.trailing_sum_mm,
            event.forecast_mm,
            event.sum_min,
            event.period_hours,
        );

        info!(text = %text, "Announcing by voice");

        let wav = self.synthesize(&text)?;

        if let Some(chime) = &self.cfg.chime_file {
            self.play_file(chime)?;
        }

        self.play_bytes(&wav)
    }
}
