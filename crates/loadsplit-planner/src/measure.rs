//! Duration and rate measurement over phases and scripts.

use tracing::warn;

use loadsplit_core::{Phase, PlanError, PlanResult, Script, Settings};

/// Rounds half-way values up, so `1.5` becomes `2` and `-26.5` becomes `-26`.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Duration of a single phase in seconds, `None` if the phase is invalid.
#[must_use]
pub fn phase_duration_in_seconds(phase: &Phase) -> Option<f64> {
    phase.duration_in_seconds()
}

/// Peak arrivals per second of a single phase, `None` if the phase is invalid.
#[must_use]
pub fn phase_requests_per_second(phase: &Phase) -> Option<f64> {
    phase.requests_per_second()
}

/// Total duration of a script: the sum of its phase durations.
///
/// # Errors
///
/// Returns [`PlanError::InvalidPhase`] with the index of the first invalid phase.
pub fn script_duration_in_seconds(script: &Script) -> PlanResult<f64> {
    script
        .phases()
        .iter()
        .enumerate()
        .try_fold(0.0, |total, (index, phase)| {
            phase
                .duration_in_seconds()
                .map(|duration| total + duration)
                .ok_or(PlanError::InvalidPhase { index })
        })
}

/// Peak arrivals per second of a script: the maximum over its phases.
///
/// # Errors
///
/// Returns [`PlanError::InvalidPhase`] with the index of the first invalid phase.
pub fn script_requests_per_second(script: &Script) -> PlanResult<f64> {
    script
        .phases()
        .iter()
        .enumerate()
        .try_fold(0.0_f64, |peak, (index, phase)| {
            phase
                .requests_per_second()
                .map(|rate| peak.max(rate))
                .ok_or(PlanError::InvalidPhase { index })
        })
}

/// Rejects load phases that last zero seconds.
///
/// Zero-duration load phases are split artifacts and never valid input.
///
/// # Errors
///
/// Returns [`PlanError::Validation`] naming the first zero-duration load phase.
pub fn validate_phase_durations(script: &Script) -> PlanResult<()> {
    let zero_load = script
        .phases()
        .iter()
        .position(|phase| !phase.is_pause() && phase.duration_in_seconds() == Some(0.0));

    match zero_load {
        Some(index) => {
            warn!("Load phase at index {} lasts zero seconds", index);
            Err(PlanError::validation(format!(
                "load phase at index {index} must last longer than zero seconds"
            )))
        }
        None => Ok(()),
    }
}

/// Checks a script against the whole-script limits before it is planned.
pub fn validate_script(script: &Script, settings: &Settings) -> PlanResult<()> {
    validate_phase_durations(script)?;

    let duration_secs = script_duration_in_seconds(script)?;
    if duration_secs > settings.max_script_duration_in_seconds as f64 {
        warn!(
            "Script duration {}s exceeds limit {}s",
            duration_secs, settings.max_script_duration_in_seconds
        );
        return Err(PlanError::ScriptTooLong {
            duration_secs,
            limit_secs: settings.max_script_duration_in_seconds,
        });
    }

    let requests_per_second = script_requests_per_second(script)?;
    if requests_per_second > f64::from(settings.max_script_requests_per_second) {
        warn!(
            "Script rate {} rps exceeds limit {} rps",
            requests_per_second, settings.max_script_requests_per_second
        );
        return Err(PlanError::ScriptTooWide {
            requests_per_second,
            limit: settings.max_script_requests_per_second,
        });
    }

    Ok(())
}
