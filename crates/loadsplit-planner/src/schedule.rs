//! Start-time assignment for split results.
//!
//! Duration splits are sequential: the remainder starts once the chunk's
//! allotted time has elapsed. Rate splits are parallel: every piece shares one
//! start time.

use tracing::{debug, warn};

use loadsplit_core::{PlanError, PlanResult, Script, Settings};

use crate::duration::{split_script_by_duration_in_seconds, ScriptSplit};
use crate::measure::script_requests_per_second;
use crate::rate::split_script_by_requests_per_second;

/// Start time of the first piece: the script's own start, or `time_now`
/// pushed out by the settings' time buffer.
fn scheduled_start(time_now: u64, script: &Script, settings: &Settings) -> u64 {
    script
        .start
        .unwrap_or_else(|| time_now.saturating_add(settings.time_buffer_in_milliseconds))
}

/// Cuts a script at the chunk duration limit and schedules both halves.
///
/// The chunk keeps an existing start time. The remainder is always scheduled
/// exactly one chunk duration after the chunk, whatever start it carried.
///
/// # Errors
///
/// Propagates [`PlanError::InvalidPhase`] from the duration split.
pub fn split_script_by_duration_in_seconds_and_schedule(
    time_now: u64,
    script: &Script,
    settings: &Settings,
) -> PlanResult<ScriptSplit> {
    let ScriptSplit {
        mut chunk,
        mut remainder,
    } = split_script_by_duration_in_seconds(
        script,
        settings.max_chunk_duration_in_seconds as f64,
    )?;

    let start = scheduled_start(time_now, script, settings);
    chunk.start = Some(start);
    remainder.start = Some(start.saturating_add(
        settings.max_chunk_duration_in_seconds.saturating_mul(1000),
    ));

    Ok(ScriptSplit { chunk, remainder })
}

/// Most rounds a rate split may take for a script peaking at `peak`.
///
/// Count phases shorter than two seconds can drain at half the cap per round.
fn max_rate_split_rounds(peak: f64, max_rate: f64) -> usize {
    let full_rounds = (peak / max_rate).ceil() as usize;
    full_rounds.saturating_mul(2).saturating_add(2)
}

/// Splits a script into parallel pieces that each stay within the chunk
/// rate limit, all sharing one start time.
///
/// Each round peels one capped chunk off the pending script; the excess
/// becomes the next pending script. Splitting stops once nothing is left
/// above zero.
///
/// # Errors
///
/// - [`PlanError::InvalidPhase`] for an invalid phase.
/// - [`PlanError::ScriptTooWide`] if the peak rate is above the hard ceiling
///   of [`Settings::MAX_SCRIPT_REQUESTS_PER_SECOND`].
/// - [`PlanError::SplitDidNotConverge`] if the excess does not drain within
///   the expected number of rounds.
pub fn split_script_by_requests_per_second_and_schedule(
    time_now: u64,
    script: &Script,
    settings: &Settings,
) -> PlanResult<Vec<Script>> {
    let max_rate = f64::from(settings.max_chunk_requests_per_second);
    let peak = script_requests_per_second(script)?;
    if peak > f64::from(Settings::MAX_SCRIPT_REQUESTS_PER_SECOND) {
        warn!(
            "Script rate {} rps is above the ceiling of {} rps",
            peak,
            Settings::MAX_SCRIPT_REQUESTS_PER_SECOND
        );
        return Err(PlanError::ScriptTooWide {
            requests_per_second: peak,
            limit: Settings::MAX_SCRIPT_REQUESTS_PER_SECOND,
        });
    }

    let start = scheduled_start(time_now, script, settings);
    split_in_rounds(start, script, max_rate, max_rate_split_rounds(peak, max_rate))
}

fn split_in_rounds(
    start: u64,
    script: &Script,
    max_rate: f64,
    max_rounds: usize,
) -> PlanResult<Vec<Script>> {
    let mut scripts = Vec::new();
    let mut pending = script.clone();
    loop {
        if scripts.len() >= max_rounds {
            return Err(PlanError::SplitDidNotConverge {
                rounds: scripts.len(),
            });
        }

        let ScriptSplit {
            mut chunk,
            remainder,
        } = split_script_by_requests_per_second(&pending, max_rate)?;
        chunk.start = Some(start);
        scripts.push(chunk);

        let left = script_requests_per_second(&remainder)?;
        debug!(
            "Rate split round {} leaves {} rps above cap {}",
            scripts.len(),
            left,
            max_rate
        );
        if left <= 0.0 {
            break;
        }
        pending = remainder;
    }

    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadsplit_core::Phase;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_duration_schedule_from_time_now() {
        let settings = settings();
        let script = Script::with_phases(vec![Phase::constant(300.0, 1.0)]);
        let result = split_script_by_duration_in_seconds_and_schedule(1, &script, &settings).unwrap();
        assert_eq!(result.chunk.start, Some(1 + 15_000));
        assert_eq!(result.remainder.start, Some(1 + 15_000 + 120_000));
        assert_eq!(result.chunk.phases(), &[Phase::constant(120.0, 1.0)]);
        assert_eq!(result.remainder.phases(), &[Phase::constant(180.0, 1.0)]);
    }

    #[test]
    fn test_duration_schedule_keeps_existing_start() {
        let settings = settings();
        let mut script = Script::with_phases(vec![Phase::constant(300.0, 1.0)]);
        script.start = Some(50_000);
        let result = split_script_by_duration_in_seconds_and_schedule(1, &script, &settings).unwrap();
        assert_eq!(result.chunk.start, Some(50_000));
        assert_eq!(result.remainder.start, Some(170_000));
    }

    #[test]
    fn test_duration_schedule_in_trace_mode() {
        let settings = settings();
        let mut script = Script::with_phases(vec![Phase::constant(300.0, 1.0)]);
        script.trace = Some(true);
        let result = split_script_by_duration_in_seconds_and_schedule(1, &script, &settings).unwrap();
        assert_eq!(result.chunk.trace, Some(true));
        assert_eq!(result.remainder.trace, Some(true));
        assert!(result.remainder.start > result.chunk.start);
    }

    #[test]
    fn test_rate_schedule_shares_start() {
        let settings = settings();
        let script = Script::with_phases(vec![Phase::constant(60.0, 60.0)]);
        let result = split_script_by_requests_per_second_and_schedule(1, &script, &settings).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|s| s.start == Some(15_001)));
        assert_eq!(result[0].phases(), &[Phase::constant(60.0, 25.0)]);
        assert_eq!(result[1].phases(), &[Phase::constant(60.0, 25.0)]);
        assert_eq!(result[2].phases(), &[Phase::constant(60.0, 10.0)]);
    }

    #[test]
    fn test_rate_schedule_keeps_existing_start() {
        let settings = settings();
        let mut script = Script::with_phases(vec![Phase::constant(60.0, 30.0)]);
        script.start = Some(7);
        let result = split_script_by_requests_per_second_and_schedule(1, &script, &settings).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|s| s.start == Some(7)));
    }

    #[test]
    fn test_rate_schedule_pieces_within_limit() {
        let settings = settings();
        let script = Script::with_phases(vec![
            Phase::ramp(120.0, 0.0, 130.0),
            Phase::constant(60.0, 130.0),
            Phase::ramp(120.0, 130.0, 0.0),
        ]);
        let result = split_script_by_requests_per_second_and_schedule(1, &script, &settings).unwrap();
        assert!(result.len() >= 6);
        for piece in &result {
            assert!(script_requests_per_second(piece).unwrap() <= 25.0);
        }
    }

    #[test]
    fn test_max_rate_split_rounds() {
        assert_eq!(max_rate_split_rounds(0.0, 25.0), 2);
        assert_eq!(max_rate_split_rounds(60.0, 25.0), 8);
        assert_eq!(max_rate_split_rounds(1e21, 25.0), usize::MAX);
        assert_eq!(max_rate_split_rounds(f64::INFINITY, 25.0), usize::MAX);
    }

    #[test]
    fn test_rate_schedule_rejects_rate_above_ceiling() {
        let settings = settings();
        let script = Script::with_phases(vec![Phase::constant(1.0, 1e21)]);
        assert!(matches!(
            split_script_by_requests_per_second_and_schedule(1, &script, &settings),
            Err(PlanError::ScriptTooWide { limit: 50_000, .. })
        ));
    }

    #[test]
    fn test_short_count_phase_converges() {
        let settings = settings();
        let script = Script::with_phases(vec![Phase::count(0.01, 100)]);
        let result = split_script_by_requests_per_second_and_schedule(1, &script, &settings).unwrap();
        assert_eq!(result.len(), 100);
        assert!(result.len() <= max_rate_split_rounds(10_000.0, 25.0));
        assert!(result
            .iter()
            .all(|s| s.phases() == [Phase::count(0.01, 1)].as_slice()));
    }

    #[test]
    fn test_rate_split_gives_up_after_max_rounds() {
        let script = Script::with_phases(vec![Phase::constant(60.0, 60.0)]);
        assert!(matches!(
            split_in_rounds(1, &script, 25.0, 2),
            Err(PlanError::SplitDidNotConverge { rounds: 2 })
        ));
        assert_eq!(split_in_rounds(1, &script, 25.0, 3).unwrap().len(), 3);
    }

    #[test]
    fn test_rate_schedule_reports_invalid_phase() {
        let settings = settings();
        let script = Script::with_phases(vec![
            Phase::constant(60.0, 30.0),
            Phase::Invalid(serde_json::json!({"duration": 1})),
        ]);
        assert!(matches!(
            split_script_by_requests_per_second_and_schedule(1, &script, &settings),
            Err(PlanError::InvalidPhase { index: 1 })
        ));
    }
}
