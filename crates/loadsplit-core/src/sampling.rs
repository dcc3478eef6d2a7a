//! Sampling parameters for acceptance and monitoring runs.

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};
use crate::script::{Mode, Script};

/// Partial `sampling` block as written in a script.
///
/// Missing fields fall back to the defaults of the script's mode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_budget: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_pause: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_variance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<f64>,
}

/// Fully resolved sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    /// Number of probe requests per flow.
    pub size: u32,
    /// Number of failed probes tolerated before the run is reported as failing.
    pub error_budget: u32,
    /// Mean pause between probes, in seconds.
    pub average_pause: f64,
    /// Maximum deviation from the mean pause, in seconds.
    pub pause_variance: f64,
    /// Fraction of the error budget that triggers a warning.
    pub warning_threshold: f64,
}

impl SamplingConfig {
    /// Defaults for acceptance runs: a single probe with no tolerated errors.
    #[must_use]
    pub const fn acceptance() -> Self {
        Self {
            size: 1,
            error_budget: 0,
            average_pause: 0.2,
            pause_variance: 0.1,
            warning_threshold: 0.9,
        }
    }

    /// Defaults for monitoring runs.
    #[must_use]
    pub const fn monitoring() -> Self {
        Self {
            size: 5,
            error_budget: 4,
            average_pause: 0.2,
            pause_variance: 0.1,
            warning_threshold: 0.9,
        }
    }

    /// Mode-specific defaults. Performance scripts sample like acceptance runs.
    #[must_use]
    pub const fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Monitoring => Self::monitoring(),
            Mode::Acceptance | Mode::Performance => Self::acceptance(),
        }
    }

    /// Overlays a partial sampling block on the defaults of `mode` and validates the result.
    pub fn resolve(spec: Option<&SamplingSpec>, mode: Mode) -> PlanResult<Self> {
        let defaults = Self::for_mode(mode);
        let config = match spec {
            None => defaults,
            Some(spec) => Self {
                size: spec.size.unwrap_or(defaults.size),
                error_budget: spec.error_budget.unwrap_or(defaults.error_budget),
                average_pause: spec.average_pause.unwrap_or(defaults.average_pause),
                pause_variance: spec.pause_variance.unwrap_or(defaults.pause_variance),
                warning_threshold: spec
                    .warning_threshold
                    .unwrap_or(defaults.warning_threshold),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolves the sampling parameters of a script from its mode and block.
    pub fn for_script(script: &Script) -> PlanResult<Self> {
        Self::resolve(script.sampling.as_ref(), script.mode())
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.size == 0 {
            return Err(PlanError::validation("sampling.size must be >= 1"));
        }
        if !(self.average_pause.is_finite() && self.average_pause >= 0.0) {
            return Err(PlanError::validation(
                "sampling.averagePause must be a non-negative number",
            ));
        }
        if !(self.pause_variance.is_finite() && self.pause_variance >= 0.0) {
            return Err(PlanError::validation(
                "sampling.pauseVariance must be a non-negative number",
            ));
        }
        if self.pause_variance > self.average_pause {
            return Err(PlanError::validation(
                "sampling.pauseVariance must be <= sampling.averagePause",
            ));
        }
        if self.error_budget > 0 && self.error_budget >= self.size {
            return Err(PlanError::validation(
                "sampling.errorBudget must be < sampling.size",
            ));
        }
        if !(self.warning_threshold > 0.0 && self.warning_threshold <= 1.0) {
            return Err(PlanError::validation(
                "sampling.warningThreshold must be in (0, 1]",
            ));
        }
        Ok(())
    }

    /// Smallest pause the jitter can produce.
    #[must_use]
    pub fn min_pause(&self) -> f64 {
        self.average_pause - self.pause_variance
    }

    /// Largest pause the jitter can produce.
    #[must_use]
    pub fn max_pause(&self) -> f64 {
        self.average_pause + self.pause_variance
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::acceptance()
    }
}

impl From<SamplingConfig> for SamplingSpec {
    fn from(config: SamplingConfig) -> Self {
        Self {
            size: Some(config.size),
            error_budget: Some(config.error_budget),
            average_pause: Some(config.average_pause),
            pause_variance: Some(config.pause_variance),
            warning_threshold: Some(config.warning_threshold),
        }
    }
}

/// Writes the fully resolved sampling block back onto a script.
pub fn apply_monitoring_sampling(script: &Script) -> PlanResult<Script> {
    let config = SamplingConfig::for_script(script)?;
    let mut sampled = script.clone();
    sampled.sampling = Some(config.into());
    Ok(sampled)
}
