//! Sequential splitting: cut a phase or script at a point in time.

use loadsplit_core::{Phase, PlanError, PlanResult, Script};

use crate::measure::round_half_up;

/// A phase cut in two: `chunk` runs first, `remainder` continues after it.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSplit {
    pub chunk: Phase,
    pub remainder: Phase,
}

/// A script cut in two at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptSplit {
    pub chunk: Script,
    pub remainder: Script,
}

/// Splits a phase so the chunk covers `[0, at_seconds)` and the remainder the rest.
///
/// Ramps keep their slope: the rate at the cut is interpolated and rounded to
/// a whole number, and becomes the chunk's `ramp_to` and the remainder's
/// `arrival_rate`. Counts are apportioned by duration with the rounding error
/// given to the remainder, so the total is preserved exactly.
///
/// # Errors
///
/// Returns [`PlanError::InvalidPhase`] for an invalid phase and
/// [`PlanError::Validation`] when `at_seconds` does not fall strictly inside it.
pub fn split_phase_by_duration_in_seconds(
    phase: &Phase,
    at_seconds: f64,
) -> PlanResult<PhaseSplit> {
    let duration = phase
        .duration_in_seconds()
        .ok_or(PlanError::InvalidPhase { index: 0 })?;
    if !(at_seconds > 0.0 && at_seconds < duration) {
        return Err(PlanError::validation(format!(
            "cannot split a {duration}s phase at {at_seconds}s"
        )));
    }
    let rest = duration - at_seconds;

    let split = match phase {
        Phase::Ramp {
            arrival_rate,
            ramp_to,
            name,
            ..
        } => {
            let rate_at_cut =
                round_half_up(arrival_rate + (ramp_to - arrival_rate) * at_seconds / duration);
            PhaseSplit {
                chunk: Phase::Ramp {
                    duration: at_seconds,
                    arrival_rate: *arrival_rate,
                    ramp_to: rate_at_cut,
                    name: name.clone(),
                },
                remainder: Phase::Ramp {
                    duration: rest,
                    arrival_rate: rate_at_cut,
                    ramp_to: *ramp_to,
                    name: name.clone(),
                },
            }
        }
        Phase::Count {
            arrival_count,
            name,
            ..
        } => {
            let share = round_half_up(*arrival_count as f64 * at_seconds / duration);
            let chunk_count = (share.max(0.0) as u64).min(*arrival_count);
            PhaseSplit {
                chunk: Phase::Count {
                    duration: at_seconds,
                    arrival_count: chunk_count,
                    name: name.clone(),
                },
                remainder: Phase::Count {
                    duration: rest,
                    arrival_count: arrival_count - chunk_count,
                    name: name.clone(),
                },
            }
        }
        Phase::ConstantRate { .. } | Phase::Pause { .. } => PhaseSplit {
            chunk: phase.with_duration(at_seconds),
            remainder: phase.with_duration(rest),
        },
        Phase::Invalid(_) => return Err(PlanError::InvalidPhase { index: 0 }),
    };

    Ok(split)
}

/// Splits a script so the chunk runs for at most `max_seconds`.
///
/// Phases are taken in order until the budget is spent; the phase straddling
/// the boundary is cut with [`split_phase_by_duration_in_seconds`]. Both halves
/// share the script's other fields, except that the remainder's `start` is
/// cleared: it runs in a later generation and gets its own start time.
///
/// # Errors
///
/// Returns [`PlanError::InvalidPhase`] with the index of the first invalid phase.
pub fn split_script_by_duration_in_seconds(
    script: &Script,
    max_seconds: f64,
) -> PlanResult<ScriptSplit> {
    let mut budget = max_seconds;
    let mut chunk_phases = Vec::new();
    let mut remainder_phases = Vec::new();

    for (index, phase) in script.phases().iter().enumerate() {
        let duration = phase
            .duration_in_seconds()
            .ok_or(PlanError::InvalidPhase { index })?;

        if budget <= 0.0 {
            remainder_phases.push(phase.clone());
        } else if duration > budget {
            let parts = split_phase_by_duration_in_seconds(phase, budget)?;
            chunk_phases.push(parts.chunk);
            remainder_phases.push(parts.remainder);
            budget = 0.0;
        } else {
            chunk_phases.push(phase.clone());
            budget -= duration;
        }
    }

    let chunk = script.with_phase_list(chunk_phases);
    let mut remainder = script.with_phase_list(remainder_phases);
    remainder.start = None;

    Ok(ScriptSplit { chunk, remainder })
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadsplit_core::Settings;

    fn max_chunk() -> f64 {
        Settings::default().max_chunk_duration_in_seconds as f64
    }

    #[test]
    fn test_split_constant_rate_phase() {
        let max = max_chunk();
        let result = split_phase_by_duration_in_seconds(&Phase::constant(3.0 * max, 1.0), max).unwrap();
        assert_eq!(
            result,
            PhaseSplit {
                chunk: Phase::constant(max, 1.0),
                remainder: Phase::constant(2.0 * max, 1.0),
            }
        );
    }

    #[test]
    fn test_split_ramp_phase() {
        let max = max_chunk();
        let result = split_phase_by_duration_in_seconds(&Phase::ramp(3.0 * max, 1.0, 4.0), max).unwrap();
        assert_eq!(
            result,
            PhaseSplit {
                chunk: Phase::ramp(max, 1.0, 2.0),
                remainder: Phase::ramp(2.0 * max, 2.0, 4.0),
            }
        );
    }

    #[test]
    fn test_split_ramp_rounds_rate_to_integer() {
        let max = max_chunk();
        let result = split_phase_by_duration_in_seconds(&Phase::ramp(2.0 * max, 1.0, 2.0), max).unwrap();
        assert_eq!(
            result,
            PhaseSplit {
                chunk: Phase::ramp(max, 1.0, 2.0),
                remainder: Phase::ramp(max, 2.0, 2.0),
            }
        );
    }

    #[test]
    fn test_split_count_phase() {
        let max = max_chunk();
        let count = 2 * Settings::default().max_chunk_duration_in_seconds;
        let result = split_phase_by_duration_in_seconds(&Phase::count(2.0 * max, count), max).unwrap();
        assert_eq!(
            result,
            PhaseSplit {
                chunk: Phase::count(max, count / 2),
                remainder: Phase::count(max, count / 2),
            }
        );
    }

    #[test]
    fn test_split_count_preserves_total() {
        let result = split_phase_by_duration_in_seconds(&Phase::count(3.0, 10), 1.0).unwrap();
        assert_eq!(result.chunk, Phase::count(1.0, 3));
        assert_eq!(result.remainder, Phase::count(2.0, 7));
    }

    #[test]
    fn test_split_pause_phase() {
        let max = max_chunk();
        let result = split_phase_by_duration_in_seconds(&Phase::pause(2.0 * max), max).unwrap();
        assert_eq!(
            result,
            PhaseSplit {
                chunk: Phase::pause(max),
                remainder: Phase::pause(max),
            }
        );
    }

    #[test]
    fn test_split_keeps_phase_name() {
        let phase = Phase::ConstantRate {
            duration: 10.0,
            arrival_rate: 1.0,
            name: Some("warm-up".to_string()),
        };
        let result = split_phase_by_duration_in_seconds(&phase, 4.0).unwrap();
        assert!(matches!(result.remainder, Phase::ConstantRate { ref name, .. } if name.as_deref() == Some("warm-up")));
    }

    #[test]
    fn test_split_point_outside_phase_rejected() {
        assert!(split_phase_by_duration_in_seconds(&Phase::pause(10.0), 10.0).is_err());
        assert!(split_phase_by_duration_in_seconds(&Phase::pause(10.0), 0.0).is_err());
    }

    #[test]
    fn test_split_script_at_natural_boundary() {
        let max = max_chunk();
        let script = Script::with_phases(vec![Phase::constant(max, 1.0), Phase::constant(max, 2.0)]);
        let result = split_script_by_duration_in_seconds(&script, max).unwrap();
        assert_eq!(result.chunk.phases(), &[Phase::constant(max, 1.0)]);
        assert_eq!(result.remainder.phases(), &[Phase::constant(max, 2.0)]);
    }

    #[test]
    fn test_split_script_at_boundary_between_many_phases() {
        let max = max_chunk();
        let low = (max * 0.5).floor();
        let high = (max * 0.5).ceil();
        let script = Script::with_phases(vec![
            Phase::constant(low, 1.0),
            Phase::constant(high, 1.0),
            Phase::constant(low, 1.0),
            Phase::constant(high, 1.0),
            Phase::constant(max, 2.0),
        ]);
        let result = split_script_by_duration_in_seconds(&script, max).unwrap();
        assert_eq!(
            result.chunk.phases(),
            &[Phase::constant(low, 1.0), Phase::constant(high, 1.0)]
        );
        assert_eq!(
            result.remainder.phases(),
            &[
                Phase::constant(low, 1.0),
                Phase::constant(high, 1.0),
                Phase::constant(max, 2.0),
            ]
        );
    }

    #[test]
    fn test_split_script_cuts_straddling_phase() {
        let max = max_chunk();
        let three_quarters_low = (max * 0.75).floor();
        let three_quarters_high = (max * 0.75).ceil();
        let script = Script::with_phases(vec![
            Phase::constant(three_quarters_low, 1.0),
            Phase::constant(three_quarters_high, 1.0),
            Phase::constant(three_quarters_low, 1.0),
        ]);
        let result = split_script_by_duration_in_seconds(&script, max).unwrap();
        assert_eq!(
            result.chunk.phases(),
            &[
                Phase::constant(three_quarters_low, 1.0),
                Phase::constant((max * 0.25).ceil(), 1.0),
            ]
        );
        assert_eq!(
            result.remainder.phases(),
            &[
                Phase::constant((max * 0.5).floor(), 1.0),
                Phase::constant(three_quarters_low, 1.0),
            ]
        );
    }

    #[test]
    fn test_split_script_clears_remainder_start() {
        let max = max_chunk();
        let mut script = Script::with_phases(vec![Phase::constant(5.0 * max, 1.0)]);
        script.start = Some(1_700_000_000_000);
        let result = split_script_by_duration_in_seconds(&script, max).unwrap();
        assert_eq!(result.chunk.start, Some(1_700_000_000_000));
        assert_eq!(result.remainder.start, None);
    }

    #[test]
    fn test_split_script_reports_invalid_phase() {
        let script = Script::with_phases(vec![
            Phase::constant(1.0, 1.0),
            Phase::Invalid(serde_json::json!({})),
        ]);
        assert!(matches!(
            split_script_by_duration_in_seconds(&script, 10.0),
            Err(PlanError::InvalidPhase { index: 1 })
        ));
    }
}
