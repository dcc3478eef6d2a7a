//! Planner entry points that turn one submitted script into the scripts to
//! dispatch this round.

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use loadsplit_core::{PlanResult, SamplingConfig, Script, Settings};

use crate::measure::validate_script;
use crate::performance::plan_performance;
use crate::sampling::plan_samples;

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn epoch_millis_now() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Planner turns one script into the scripts to dispatch this round.
pub trait ScriptPlanner: Send + Sync {
    fn plan(&self, time_now: u64, script: Script) -> PlanResult<Vec<Script>>;

    /// Plans against the current wall-clock time.
    fn plan_now(&self, script: Script) -> PlanResult<Vec<Script>> {
        self.plan(epoch_millis_now(), script)
    }
}

/// Plans sustained-load scripts into duration and rate bounded chunks.
#[derive(Debug, Clone, Default)]
pub struct PerformancePlanner {
    settings: Settings,
}

impl PerformancePlanner {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl ScriptPlanner for PerformancePlanner {
    fn plan(&self, time_now: u64, script: Script) -> PlanResult<Vec<Script>> {
        let settings = self.settings.for_script(&script)?;
        validate_script(&script, &settings)?;
        plan_performance(time_now, script, &settings)
    }
}

/// Plans acceptance and monitoring scripts into per-flow probe scripts.
pub struct SamplingPlanner {
    /// Overrides the parameters resolved from each script's mode and block.
    config: Option<SamplingConfig>,
    rng: Mutex<StdRng>,
}

impl SamplingPlanner {
    /// Create a planner seeded from system entropy.
    pub fn new() -> Self {
        Self {
            config: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a planner with a fixed seed, for reproducible pauses.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            config: None,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Use `config` for every script instead of resolving it per script.
    #[must_use]
    pub fn with_config(mut self, config: SamplingConfig) -> Self {
        self.config = Some(config);
        self
    }
}

impl Default for SamplingPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptPlanner for SamplingPlanner {
    fn plan(&self, time_now: u64, mut script: Script) -> PlanResult<Vec<Script>> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => SamplingConfig::for_script(&script)?,
        };
        script.sampling = Some(config.into());

        info!(
            "Sampling {} flows with {} probes each",
            script.scenarios.len(),
            config.size
        );
        let mut rng = self.rng.lock();
        Ok(plan_samples(time_now, script, &config, &mut *rng))
    }
}
