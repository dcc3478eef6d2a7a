//! Load phases: the building blocks of a script's arrival profile.
//!
//! Phases are read from and written to the JSON shape used by load scripts:
//!
//! - constant rate: `{ "duration": 60, "arrivalRate": 10 }`
//! - ramp: `{ "duration": 60, "arrivalRate": 10, "rampTo": 50 }`
//! - fixed count: `{ "duration": 60, "arrivalCount": 600 }`
//! - pause: `{ "pause": 30 }`
//!
//! Anything else is kept verbatim as [`Phase::Invalid`] so that measurement can
//! report the position of the first bad phase instead of failing to parse the
//! whole script.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A segment of a load profile with a uniform shape.
///
/// Variant order matters for deserialization: the first shape that matches
/// wins, so ramps are tried before constant rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Phase {
    /// Arrival rate changes linearly from `arrival_rate` to `ramp_to`.
    Ramp {
        duration: f64,
        #[serde(rename = "arrivalRate")]
        arrival_rate: f64,
        #[serde(rename = "rampTo")]
        ramp_to: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Fixed arrival rate for the whole duration.
    ConstantRate {
        duration: f64,
        #[serde(rename = "arrivalRate")]
        arrival_rate: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Fixed number of arrivals spread over the duration.
    Count {
        duration: f64,
        #[serde(rename = "arrivalCount")]
        arrival_count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// No arrivals for `pause` seconds.
    Pause { pause: f64 },
    /// Unrecognized phase object, preserved as-is.
    Invalid(Value),
}

impl Phase {
    /// Constant-rate phase without a name.
    #[must_use]
    pub fn constant(duration: f64, arrival_rate: f64) -> Self {
        Self::ConstantRate {
            duration,
            arrival_rate,
            name: None,
        }
    }

    /// Ramp phase without a name.
    #[must_use]
    pub fn ramp(duration: f64, arrival_rate: f64, ramp_to: f64) -> Self {
        Self::Ramp {
            duration,
            arrival_rate,
            ramp_to,
            name: None,
        }
    }

    /// Ramp phase, or a constant-rate phase when both endpoints are equal.
    #[must_use]
    pub fn ramp_or_constant(duration: f64, arrival_rate: f64, ramp_to: f64) -> Self {
        if arrival_rate == ramp_to {
            Self::constant(duration, arrival_rate)
        } else {
            Self::ramp(duration, arrival_rate, ramp_to)
        }
    }

    /// Fixed-count phase without a name.
    #[must_use]
    pub fn count(duration: f64, arrival_count: u64) -> Self {
        Self::Count {
            duration,
            arrival_count,
            name: None,
        }
    }

    /// Pause phase.
    #[must_use]
    pub fn pause(seconds: f64) -> Self {
        Self::Pause { pause: seconds }
    }

    /// Short name of the phase shape, used in logs and errors.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Ramp { .. } => "ramp",
            Self::ConstantRate { .. } => "constant-rate",
            Self::Count { .. } => "count",
            Self::Pause { .. } => "pause",
            Self::Invalid(_) => "invalid",
        }
    }

    /// Returns `true` when the phase has a recognized shape and sane numbers.
    ///
    /// Zero durations are accepted here; they only appear as transient split
    /// artifacts and are removed before a plan is handed out. Planning rejects
    /// zero-duration load phases in its input.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let sane = |v: f64| v.is_finite() && v >= 0.0;
        match self {
            Self::Ramp {
                duration,
                arrival_rate,
                ramp_to,
                ..
            } => sane(*duration) && sane(*arrival_rate) && sane(*ramp_to),
            Self::ConstantRate {
                duration,
                arrival_rate,
                ..
            } => sane(*duration) && sane(*arrival_rate),
            Self::Count { duration, .. } => sane(*duration),
            Self::Pause { pause } => sane(*pause),
            Self::Invalid(_) => false,
        }
    }

    /// Returns `true` for pause phases.
    #[must_use]
    pub const fn is_pause(&self) -> bool {
        matches!(self, Self::Pause { .. })
    }

    /// Duration of the phase in seconds, `None` for invalid phases.
    #[must_use]
    pub fn duration_in_seconds(&self) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        match self {
            Self::Ramp { duration, .. }
            | Self::ConstantRate { duration, .. }
            | Self::Count { duration, .. } => Some(*duration),
            Self::Pause { pause } => Some(*pause),
            Self::Invalid(_) => None,
        }
    }

    /// Peak arrivals per second of the phase, `None` for invalid phases.
    ///
    /// Ramps are monotonic, so their peak is the larger endpoint.
    #[must_use]
    pub fn requests_per_second(&self) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        match self {
            Self::Ramp {
                arrival_rate,
                ramp_to,
                ..
            } => Some(arrival_rate.max(*ramp_to)),
            Self::ConstantRate { arrival_rate, .. } => Some(*arrival_rate),
            Self::Count {
                duration,
                arrival_count,
                ..
            } => Some(count_rate(*arrival_count, *duration)),
            Self::Pause { .. } => Some(0.0),
            Self::Invalid(_) => None,
        }
    }

    /// Instantaneous arrival rate `t` seconds into the phase.
    ///
    /// Count phases report their average rate.
    #[must_use]
    pub fn rate_at(&self, t: f64) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        match self {
            Self::Ramp {
                duration,
                arrival_rate,
                ramp_to,
                ..
            } => {
                if *duration == 0.0 {
                    return Some(*ramp_to);
                }
                Some(arrival_rate + (ramp_to - arrival_rate) * t / duration)
            }
            Self::ConstantRate { arrival_rate, .. } => Some(*arrival_rate),
            Self::Count {
                duration,
                arrival_count,
                ..
            } => Some(count_rate(*arrival_count, *duration)),
            Self::Pause { .. } => Some(0.0),
            Self::Invalid(_) => None,
        }
    }

    /// Collapses a ramp whose endpoints are equal into a constant-rate phase.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Ramp {
                duration,
                arrival_rate,
                ramp_to,
                name,
            } if arrival_rate == ramp_to => Self::ConstantRate {
                duration,
                arrival_rate,
                name,
            },
            other => other,
        }
    }

    /// Copy of this phase with its length replaced by `seconds`.
    ///
    /// Rates and counts are kept as they are; invalid phases are returned
    /// unchanged.
    #[must_use]
    pub fn with_duration(&self, seconds: f64) -> Self {
        let mut phase = self.clone();
        match &mut phase {
            Self::Ramp { duration, .. }
            | Self::ConstantRate { duration, .. }
            | Self::Count { duration, .. } => *duration = seconds,
            Self::Pause { pause } => *pause = seconds,
            Self::Invalid(_) => {}
        }
        phase
    }
}

fn count_rate(arrival_count: u64, duration: f64) -> f64 {
    if duration > 0.0 {
        arrival_count as f64 / duration
    } else {
        0.0
    }
}
