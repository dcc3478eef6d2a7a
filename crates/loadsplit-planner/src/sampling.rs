//! Sparse probe planning for acceptance and monitoring runs.
//!
//! Instead of sustained load, every flow of the script gets its own small
//! script that fires single requests separated by jittered pauses. The jitter
//! keeps flows from hitting the target in lockstep.

use rand::Rng;
use tracing::debug;

use loadsplit_core::{InvokeType, Mode, Phase, SamplingConfig, Script};

/// One probe: a single arrival over one second.
fn probe() -> Phase {
    Phase::constant(1.0, 1.0)
}

/// Pause drawn uniformly from `[average - variance, average + variance]`,
/// never below zero.
pub fn jittered_pause<R: Rng + ?Sized>(config: &SamplingConfig, rng: &mut R) -> f64 {
    let low = config.min_pause().max(0.0);
    let high = config.max_pause();
    if high > low {
        rng.gen_range(low..=high)
    } else {
        config.average_pause.max(0.0)
    }
}

/// Builds `size` pairs of a jittered pause followed by a single probe.
pub fn generate_sampling_phases<R: Rng + ?Sized>(
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<Phase> {
    (0..config.size)
        .flat_map(|_| [Phase::pause(jittered_pause(config, rng)), probe()])
        .collect()
}

/// Fans a script out into one script per scenario.
///
/// Each output runs a single flow as a performance script with one probe
/// after its own jittered pause. The sampling block and every other field
/// are carried over.
pub fn split_script_by_flow<R: Rng + ?Sized>(
    script: &Script,
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<Script> {
    script
        .scenarios
        .iter()
        .map(|scenario| {
            let mut flow = script.with_phase_list(vec![
                Phase::pause(jittered_pause(config, rng)),
                probe(),
            ]);
            flow.scenarios = vec![scenario.clone()];
            flow.mode = Some(Mode::Performance);
            flow
        })
        .collect()
}

/// Like [`split_script_by_flow`], but every flow gets the full run of
/// `size` probes from [`generate_sampling_phases`].
pub fn split_script_by_flow_with_sampling_phases<R: Rng + ?Sized>(
    script: &Script,
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<Script> {
    script
        .scenarios
        .iter()
        .map(|scenario| {
            let mut flow = script.with_phase_list(generate_sampling_phases(config, rng));
            flow.scenarios = vec![scenario.clone()];
            flow.mode = Some(Mode::Performance);
            flow
        })
        .collect()
}

/// Plans a sampling round: stamps the script to start now with synchronous
/// invocation, then fans it out by flow.
///
/// Monitoring scripts get `size` probes per flow; any other mode gets a single
/// probe per flow.
pub fn plan_samples<R: Rng + ?Sized>(
    time_now: u64,
    mut script: Script,
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<Script> {
    script.start = Some(time_now);
    script.invoke_type = Some(InvokeType::RequestResponse);

    let flows = if script.mode() == Mode::Monitoring {
        split_script_by_flow_with_sampling_phases(&script, config, rng)
    } else {
        split_script_by_flow(&script, config, rng)
    };
    debug!(
        "Planned {} sampling scripts in {} mode",
        flows.len(),
        script.mode().as_str()
    );
    flows
}
