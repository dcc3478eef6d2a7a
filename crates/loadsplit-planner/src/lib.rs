//! Planning of load scripts into chunks that fit a single worker.
//!
//! A script that runs too long is cut in time and continued in a later round;
//! a script that is too intense is split into parallel pieces. Acceptance and
//! monitoring scripts are fanned out into one probe script per flow instead.

pub mod duration;
pub mod intersection;
pub mod measure;
pub mod performance;
pub mod planner;
pub mod rate;
pub mod sampling;
pub mod schedule;

pub use duration::{
    split_phase_by_duration_in_seconds, split_script_by_duration_in_seconds, PhaseSplit,
    ScriptSplit,
};
pub use intersection::{intersection, Point};
pub use measure::{
    phase_duration_in_seconds, phase_requests_per_second, round_half_up,
    script_duration_in_seconds, script_requests_per_second, validate_phase_durations,
    validate_script,
};
pub use performance::{plan_performance, remove_zero_duration_phases};
pub use planner::{epoch_millis_now, PerformancePlanner, SamplingPlanner, ScriptPlanner};
pub use rate::{split_phase_by_requests_per_second, split_script_by_requests_per_second, PhaseRateSplit};
pub use sampling::{
    generate_sampling_phases, jittered_pause, plan_samples, split_script_by_flow,
    split_script_by_flow_with_sampling_phases,
};
pub use schedule::{
    split_script_by_duration_in_seconds_and_schedule,
    split_script_by_requests_per_second_and_schedule,
};
