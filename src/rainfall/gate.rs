//! Notification gate
//!
//! Decides per channel whether a detected rain start deserves a
//! notification. The decision is a pure function of its inputs; the only
//! persistent state is the channel's footprint timestamp, read before and
//! written after.
//!
//! Rules, evaluated top to bottom (`raining_before = now - rain_start`,
//! `elapsed` = time since the channel last notified, infinite if never):
//!
//! | # | condition                                    | reason             | refresh footprint |
//! |---|----------------------------------------------|--------------------|-------------------|
//! | 1 | rain_start < process_start - startup_grace   | StartedBeforeWatch | no                |
//! | 2 | raining_before >= elapsed                    | AlreadyNotified    | no                |
//! | 3 | elapsed < continuous_rain_window             | ContinuousRain     | yes               |
//! | 4 | solar_rad present and >= threshold           | SolarGlare         | yes               |
//! | 5 | otherwise                                    | approve            | after dispatch    |
//!
//! Rule 2 deliberately keeps `>=` at exact equality. Rule 3 refreshes the
//! footprint so the debounce window slides forward with continued rain.
//! Rule 4 refreshes it so one bright-sun misfire does not re-evaluate
//! every tick.

use chrono::{DateTime, Duration, Local};

use crate::config::{Config, VoiceSection};

/// Thresholds for the per-channel gate
#[derive(Debug, Clone)]
pub struct GatePolicy {
    /// A repeat detection within this window is the same rain spell
    pub continuous_rain_window: Duration,
    /// Rain that started this long before the process is not ours to report
    pub startup_grace: Duration,
    /// Solar radiation at or above this marks an optical false positive
    pub solar_rad_threshold: f64,
}

impl GatePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            continuous_rain_window: Duration::seconds(
                config.gate.continuous_rain_window_sec as i64,
            ),
            startup_grace: Duration::seconds(config.gate.startup_grace_sec as i64),
            solar_rad_threshold: config.sensor.solar_rad_threshold,
        }
    }
}

/// Everything the gate looks at, captured per tick
#[derive(Debug, Clone, Copy)]
pub struct GateInput {
    pub now: DateTime<Local>,
    pub rain_start: DateTime<Local>,
    pub process_start: DateTime<Local>,
    /// Time since this channel last notified, `None` if it never did
    pub elapsed: Option<Duration>,
    /// Solar radiation at rain onset, if the feed had a sample
    pub solar_rad: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// The rain began before this process was watching
    StartedBeforeWatch,
    /// The last notification already covered this rain start
    AlreadyNotified,
    /// Same ongoing rain spell as a very recent notification
    ContinuousRain,
    /// Bright sun at onset - optical rain sensor misfire
    SolarGlare,
    /// Voice only: too little rain for an audible alert
    LightRain,
    /// Voice only: outside the configured active hours
    QuietHours,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Approve,
    Suppress {
        reason: SuppressReason,
        /// Touch the channel footprint despite suppressing
        refresh_footprint: bool,
    },
}

/// Evaluate the common gate for one channel
pub fn evaluate(input: &GateInput, policy: &GatePolicy) -> GateDecision {
    if input.rain_start < input.process_start - policy.startup_grace {
        return GateDecision::Suppress {
            reason: SuppressReason::StartedBeforeWatch,
            refresh_footprint: false,
        };
    }

    let raining_before = input.now - input.rain_start;

    if let Some(elapsed) = input.elapsed {
        if raining_before >= elapsed {
            return GateDecision::Suppress {
                reason: SuppressReason::AlreadyNotified,
                refresh_footprint: false,
            };
        }
        if elapsed < policy.continuous_rain_window {
            return GateDecision::Suppress {
                reason: SuppressReason::ContinuousRain,
                refresh_footprint: true,
            };
        }
    }

    if let Some(solar_rad) = input.solar_rad {
        if solar_rad >= policy.solar_rad_threshold {
            return GateDecision::Suppress {
                reason: SuppressReason::SolarGlare,
                refresh_footprint: true,
            };
        }
    }

    GateDecision::Approve
}

/// Extra thresholds applied to the voice channel only
#[derive(Debug, Clone)]
pub struct VoicePolicy {
    pub min_mm: f64,
    pub hour_start: u32,
    pub hour_end: u32,
}

impl From<&VoiceSection> for VoicePolicy {
    fn from(cfg: &VoiceSection) -> Self {
        Self {
            min_mm: cfg.min_mm,
            hour_start: cfg.hour_start,
            hour_end: cfg.hour_end,
        }
    }
}

/// Voice-only gating, applied after a common-gate approve.
///
/// Neither reason refreshes the footprint: a voice notification held back
/// here may still fire later in the same rain event, once inside active
/// hours or once enough rain has accumulated.
pub fn voice_extra(
    trailing_sum_mm: f64,
    forecast_mm: f64,
    hour: u32,
    policy: &VoicePolicy,
) -> Option<SuppressReason> {
    if trailing_sum_mm < policy.min_mm && forecast_mm < policy.min_mm {
        return Some(SuppressReason::LightRain);
    }
    if hour < policy.hour_start || hour > policy.hour_end {
        return Some(SuppressReason::QuietHours);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> GatePolicy {
        GatePolicy {
            continuous_rain_window: Duration::minutes(30),
            startup_grace: Duration::minutes(10),
            solar_rad_threshold: 600.0,
        }
    }

    /// Rain started 5 minutes ago, process has been up for an hour,
    /// channel never notified, no solar reading.
    fn fresh_rain() -> GateInput {
        let now = Local::now();
        GateInput {
            now,
            rain_start: now - Duration::minutes(5),
            process_start: now - Duration::hours(1),
            elapsed: None,
            solar_rad: None,
        }
    }

    #[test]
    fn test_fresh_rain_is_approved() {
        assert_eq!(evaluate(&fresh_rain(), &policy()), GateDecision::Approve);
    }

    #[test]
    fn test_decision_is_deterministic() {
        let input = GateInput {
            elapsed: Some(Duration::minutes(29)),
            solar_rad: Some(250.0),
            ..fresh_rain()
        };
        let first = evaluate(&input, &policy());
        for _ in 0..10 {
            assert_eq!(evaluate(&input, &policy()), first);
        }
    }

    // --- Rule 1: startup suppression ------------------------------------

    #[test]
    fn test_rain_predating_the_process_is_suppressed_without_refresh() {
        let now = Local::now();
        let input = GateInput {
            now,
            rain_start: now - Duration::minutes(20),
            process_start: now,
            elapsed: None,
            solar_rad: None,
        };

        assert_eq!(
            evaluate(&input, &policy()),
            GateDecision::Suppress {
                reason: SuppressReason::StartedBeforeWatch,
                refresh_footprint: false,
            }
        );
    }

    #[test]
    fn test_rain_just_inside_startup_grace_passes_rule_1() {
        let now = Local::now();
        let input = GateInput {
            now,
            rain_start: now - Duration::minutes(9),
            process_start: now,
            elapsed: None,
            solar_rad: None,
        };

        assert_eq!(evaluate(&input, &policy()), GateDecision::Approve);
    }

    // --- Rule 2: already notified ---------------------------------------

    #[test]
    fn test_notification_after_rain_start_suppresses() {
        // Last notified 2 minutes ago, rain started 5 minutes ago:
        // that notification already covered this event.
        let input = GateInput {
            elapsed: Some(Duration::minutes(2)),
            ..fresh_rain()
        };

        assert_eq!(
            evaluate(&input, &policy()),
            GateDecision::Suppress {
                reason: SuppressReason::AlreadyNotified,
                refresh_footprint: false,
            }
        );
    }

    #[test]
    fn test_already_notified_boundary_is_inclusive() {
        // raining_before == elapsed exactly still counts as notified
        let input = GateInput {
            elapsed: Some(Duration::minutes(5)),
            ..fresh_rain()
        };

        assert_eq!(
            evaluate(&input, &policy()),
            GateDecision::Suppress {
                reason: SuppressReason::AlreadyNotified,
                refresh_footprint: false,
            }
        );
    }

    #[test]
    fn test_rerun_right_after_notifying_never_reapproves() {
        // The at-most-once property: footprint just updated, elapsed ~ 0
        let input = GateInput {
            elapsed: Some(Duration::zero()),
            ..fresh_rain()
        };

        let decision = evaluate(&input, &policy());
        assert_ne!(decision, GateDecision::Approve);
    }

    // --- Rule 3: continuous-rain debounce -------------------------------

    #[test]
    fn test_recent_notification_for_older_event_slides_the_window() {
        // New rain 5 minutes ago, last notified 29 minutes ago: same
        // spell, suppress but refresh so the window moves forward.
        let input = GateInput {
            elapsed: Some(Duration::minutes(29)),
            ..fresh_rain()
        };

        assert_eq!(
            evaluate(&input, &policy()),
            GateDecision::Suppress {
                reason: SuppressReason::ContinuousRain,
                refresh_footprint: true,
            }
        );
    }

    #[test]
    fn test_notification_older_than_the_window_reapproves() {
        let input = GateInput {
            elapsed: Some(Duration::minutes(31)),
            ..fresh_rain()
        };

        assert_eq!(evaluate(&input, &policy()), GateDecision::Approve);
    }

    // --- Rule 4: solar glare --------------------------------------------

    #[test]
    fn test_bright_sun_at_onset_suppresses_with_refresh() {
        let input = GateInput {
            solar_rad: Some(1000.0),
            ..fresh_rain()
        };

        assert_eq!(
            evaluate(&input, &policy()),
            GateDecision::Suppress {
                reason: SuppressReason::SolarGlare,
                refresh_footprint: true,
            }
        );
    }

    #[test]
    fn test_solar_threshold_boundary_is_inclusive() {
        let input = GateInput {
            solar_rad: Some(600.0),
            ..fresh_rain()
        };

        assert!(matches!(
            evaluate(&input, &policy()),
            GateDecision::Suppress {
                reason: SuppressReason::SolarGlare,
                ..
            }
        ));
    }

    #[test]
    fn test_dim_or_missing_solar_reading_does_not_suppress() {
        let dim = GateInput {
            solar_rad: Some(599.9),
            ..fresh_rain()
        };
        assert_eq!(evaluate(&dim, &policy()), GateDecision::Approve);

        let missing = fresh_rain();
        assert_eq!(evaluate(&missing, &policy()), GateDecision::Approve);
    }

    // --- Voice extras ----------------------------------------------------

    fn voice_policy() -> VoicePolicy {
        VoicePolicy {
            min_mm: 0.1,
            hour_start: 7,
            hour_end: 22,
        }
    }

    #[test]
    fn test_voice_light_rain_is_suppressed() {
        assert_eq!(
            voice_extra(0.05, 0.05, 12, &voice_policy()),
            Some(SuppressReason::LightRain)
        );
    }

    #[test]
    fn test_voice_passes_when_either_amount_is_enough() {
        assert_eq!(voice_extra(0.2, 0.0, 12, &voice_policy()), None);
        assert_eq!(voice_extra(0.0, 0.2, 12, &voice_policy()), None);
    }

    #[test]
    fn test_voice_quiet_hours_suppress_regardless_of_magnitude() {
        assert_eq!(
            voice_extra(5.0, 5.0, 23, &voice_policy()),
            Some(SuppressReason::QuietHours)
        );
        assert_eq!(
            voice_extra(5.0, 5.0, 6, &voice_policy()),
            Some(SuppressReason::QuietHours)
        );
    }

    #[test]
    fn test_voice_active_hours_are_inclusive_at_both_ends() {
        assert_eq!(voice_extra(5.0, 5.0, 7, &voice_policy()), None);
        assert_eq!(voice_extra(5.0, 5.0, 22, &voice_policy()), None);
    }
}
