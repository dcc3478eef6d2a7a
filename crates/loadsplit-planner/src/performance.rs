//! One planning round for a performance script.

use tracing::{debug, info};

use loadsplit_core::{Phase, PlanResult, Script, Settings};

use crate::measure::{
    script_duration_in_seconds, script_requests_per_second, validate_phase_durations,
};
use crate::schedule::{
    split_script_by_duration_in_seconds_and_schedule,
    split_script_by_requests_per_second_and_schedule,
};

/// Plans the next round of work for `script`.
///
/// A script within both chunk limits is returned as the only element,
/// unchanged. Otherwise a script longer than the chunk duration is cut; its
/// remainder comes first in the output and must be planned again by the
/// caller once its start time approaches. The part that runs now is split
/// into parallel pieces if its peak rate is above the chunk rate limit.
///
/// Every returned script carries the planning lineage in `genesis` (the
/// existing value, or `time_now` on the first round) and has had its
/// zero-duration phases cleaned up.
///
/// # Errors
///
/// - [`loadsplit_core::PlanError::InvalidPhase`] for an invalid phase.
/// - [`loadsplit_core::PlanError::Validation`] for a zero-duration load phase.
/// - [`loadsplit_core::PlanError::ScriptTooWide`] and
///   [`loadsplit_core::PlanError::SplitDidNotConverge`] from the rate split.
pub fn plan_performance(time_now: u64, script: Script, settings: &Settings) -> PlanResult<Vec<Script>> {
    validate_phase_durations(&script)?;
    let duration = script_duration_in_seconds(&script)?;
    let peak = script_requests_per_second(&script)?;
    let max_duration = settings.max_chunk_duration_in_seconds as f64;
    let max_rate = f64::from(settings.max_chunk_requests_per_second);

    if duration <= max_duration && peak <= max_rate {
        debug!("Script of {}s at {} rps fits in one chunk", duration, peak);
        return Ok(vec![script]);
    }

    let genesis = script.genesis.unwrap_or(time_now);
    let mut planned = Vec::new();

    let current = if duration > max_duration {
        let split = split_script_by_duration_in_seconds_and_schedule(time_now, &script, settings)?;
        planned.push(split.remainder);
        split.chunk
    } else {
        script
    };

    let parallel = if script_requests_per_second(&current)? > max_rate {
        split_script_by_requests_per_second_and_schedule(time_now, &current, settings)?
    } else {
        vec![current]
    };
    let parallel_count = parallel.len();
    planned.extend(parallel);

    for planned_script in &mut planned {
        planned_script.genesis = Some(genesis);
        let phases = std::mem::take(&mut planned_script.config.phases);
        planned_script.config.phases = remove_zero_duration_phases(phases);
    }

    info!(
        "Planned {}s script at {} rps into {} scripts ({} parallel, continuation: {})",
        duration,
        peak,
        planned.len(),
        parallel_count,
        duration > max_duration
    );
    Ok(planned)
}

/// Removes phases that last zero seconds from a planned phase list.
///
/// Zero-length pauses are dropped. A zero-duration load phase takes over the
/// time slot of an adjacent pause, preferring the one before it; with no pause
/// next to it, it is dropped.
#[must_use]
pub fn remove_zero_duration_phases(phases: Vec<Phase>) -> Vec<Phase> {
    let before = phases.len();
    let mut cleaned: Vec<Phase> = Vec::with_capacity(phases.len());
    let mut waiting: Option<Phase> = None;

    for phase in phases {
        let duration = phase.duration_in_seconds().unwrap_or(f64::NAN);

        if duration == 0.0 {
            if phase.is_pause() {
                continue;
            }
            if let Some(last) = cleaned.last_mut() {
                if let Phase::Pause { pause } = last {
                    let slot = *pause;
                    *last = phase.with_duration(slot);
                    continue;
                }
            }
            waiting = Some(phase);
            continue;
        }

        match (waiting.take(), &phase) {
            (Some(load), Phase::Pause { pause }) => cleaned.push(load.with_duration(*pause)),
            _ => cleaned.push(phase),
        }
    }

    if cleaned.len() != before {
        debug!("Removed {} zero-duration phases", before - cleaned.len());
    }
    cleaned
}
