//! Parallel splitting: cap a phase or script at a maximum arrival rate.
//!
//! The chunk and the remainder of a rate split run at the same time on two
//! workers, so both sides always span the full duration of the input. A side
//! with nothing to do for part of that time gets a pause of matching length.

use tracing::debug;

use loadsplit_core::{Phase, PlanError, PlanResult, Script};

use crate::duration::ScriptSplit;
use crate::intersection::intersection;
use crate::measure::round_half_up;

/// Lowest rate a ramp cut at the cap is allowed to start or end at.
const MIN_RAMP_RATE: f64 = 1.0;

/// Result of a rate split of one phase. Both lists cover the same duration.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRateSplit {
    pub chunk: Vec<Phase>,
    pub remainder: Vec<Phase>,
}

impl PhaseRateSplit {
    fn single(chunk: Phase, remainder: Phase) -> Self {
        Self {
            chunk: vec![chunk],
            remainder: vec![remainder],
        }
    }

    fn within_limit(phase: Phase, duration: f64) -> Self {
        Self::single(phase, Phase::pause(duration))
    }
}

/// Splits a phase into a part that stays within `max_rate` and the excess.
///
/// A ramp whose endpoints are equal is treated as the constant-rate phase it
/// really is. A ramp crossing `max_rate` is cut at the crossing instant,
/// rounded to whole seconds:
///
/// - ascending: chunk `[ramp up to the cap, constant at the cap]`,
///   remainder `[pause, ramp of the excess]`
/// - descending: chunk `[constant at the cap, ramp down from the cap]`,
///   remainder `[ramp of the excess, pause]`
///
/// # Errors
///
/// Returns [`PlanError::InvalidPhase`] for an invalid phase.
pub fn split_phase_by_requests_per_second(
    phase: &Phase,
    max_rate: f64,
) -> PlanResult<PhaseRateSplit> {
    let phase = phase.clone().normalized();

    let split = match &phase {
        Phase::Pause { pause } => PhaseRateSplit::single(Phase::pause(*pause), Phase::pause(*pause)),
        Phase::ConstantRate {
            duration,
            arrival_rate,
            ..
        } => {
            if *arrival_rate > max_rate {
                PhaseRateSplit::single(
                    Phase::constant(*duration, max_rate),
                    Phase::constant(*duration, arrival_rate - max_rate),
                )
            } else {
                PhaseRateSplit::within_limit(phase.clone(), *duration)
            }
        }
        Phase::Count {
            duration,
            arrival_count,
            ..
        } => {
            let rate = phase.requests_per_second().unwrap_or(0.0);
            if rate > max_rate {
                let capped = ((max_rate * duration).floor() as u64).max(1).min(*arrival_count);
                PhaseRateSplit::single(
                    Phase::count(*duration, capped),
                    Phase::count(*duration, arrival_count - capped),
                )
            } else {
                PhaseRateSplit::within_limit(phase.clone(), *duration)
            }
        }
        Phase::Ramp {
            duration,
            arrival_rate,
            ramp_to,
            ..
        } => split_ramp(&phase, *duration, *arrival_rate, *ramp_to, max_rate)?,
        Phase::Invalid(_) => return Err(PlanError::InvalidPhase { index: 0 }),
    };

    Ok(split)
}

fn split_ramp(
    phase: &Phase,
    duration: f64,
    arrival_rate: f64,
    ramp_to: f64,
    max_rate: f64,
) -> PlanResult<PhaseRateSplit> {
    let low = arrival_rate.min(ramp_to);
    let high = arrival_rate.max(ramp_to);

    if high <= max_rate {
        return Ok(PhaseRateSplit::within_limit(phase.clone(), duration));
    }

    // A zero-length ramp has no crossing instant; split it at its peak.
    if duration == 0.0 {
        return Ok(PhaseRateSplit::single(
            Phase::constant(duration, max_rate),
            Phase::constant(duration, high - max_rate),
        ));
    }

    if low >= max_rate {
        return Ok(PhaseRateSplit::single(
            Phase::constant(duration, max_rate),
            Phase::ramp_or_constant(duration, arrival_rate - max_rate, ramp_to - max_rate),
        ));
    }

    let crossing = round_half_up(intersection(phase, max_rate)?.x).clamp(0.0, duration);
    let after = duration - crossing;

    let split = if arrival_rate < ramp_to {
        PhaseRateSplit {
            chunk: vec![
                Phase::ramp_or_constant(crossing, arrival_rate.max(MIN_RAMP_RATE), max_rate),
                Phase::constant(after, max_rate),
            ],
            remainder: vec![
                Phase::pause(crossing),
                Phase::ramp_or_constant(after, MIN_RAMP_RATE, ramp_to - max_rate),
            ],
        }
    } else {
        PhaseRateSplit {
            chunk: vec![
                Phase::constant(crossing, max_rate),
                Phase::ramp_or_constant(after, max_rate, ramp_to.max(MIN_RAMP_RATE)),
            ],
            remainder: vec![
                Phase::ramp_or_constant(crossing, arrival_rate - max_rate, MIN_RAMP_RATE),
                Phase::pause(after),
            ],
        }
    };

    debug!(
        "Cut ramp {} -> {} over {}s at {}s for cap {}",
        arrival_rate, ramp_to, duration, crossing, max_rate
    );
    Ok(split)
}

/// Splits every phase of a script at `max_rate`.
///
/// The chunk script gets all chunk pieces in order and the remainder script
/// all remainder pieces; both keep the script's other fields.
///
/// # Errors
///
/// Returns [`PlanError::InvalidPhase`] with the index of the first invalid phase.
pub fn split_script_by_requests_per_second(
    script: &Script,
    max_rate: f64,
) -> PlanResult<ScriptSplit> {
    let mut chunk_phases = Vec::with_capacity(script.phases().len());
    let mut remainder_phases = Vec::with_capacity(script.phases().len());

    for (index, phase) in script.phases().iter().enumerate() {
        if !phase.is_valid() {
            return Err(PlanError::InvalidPhase { index });
        }
        let parts = split_phase_by_requests_per_second(phase, max_rate)?;
        chunk_phases.extend(parts.chunk);
        remainder_phases.extend(parts.remainder);
    }

    Ok(ScriptSplit {
        chunk: script.with_phase_list(chunk_phases),
        remainder: script.with_phase_list(remainder_phases),
    })
}
