use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::SplitOverrides;
use crate::error::PlanResult;
use crate::phase::Phase;
use crate::sampling::SamplingSpec;

/// Execution mode of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Sustained load generation.
    #[serde(rename = "perf", alias = "performance")]
    Performance,
    /// Sparse sampling to accept or reject a deployment.
    #[serde(rename = "acc", alias = "acceptance")]
    Acceptance,
    /// Sparse sampling repeated on a schedule.
    #[serde(rename = "mon", alias = "monitoring")]
    Monitoring,
}

impl Mode {
    /// Returns the short string used in script documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "perf",
            Self::Acceptance => "acc",
            Self::Monitoring => "mon",
        }
    }

    /// Returns `true` for the sampling modes.
    #[must_use]
    pub const fn is_sampling(&self) -> bool {
        matches!(self, Self::Acceptance | Self::Monitoring)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Performance
    }
}

/// How the dispatch layer should invoke a worker for a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeType {
    /// Synchronous invocation; the caller waits for the result.
    RequestResponse,
    /// Asynchronous fire-and-forget invocation.
    Event,
}

/// The `config` block of a script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Base URL the scenarios run against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Ordered arrival phases.
    #[serde(default)]
    pub phases: Vec<Phase>,

    /// Any other config keys, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A declarative load-test description together with its scheduling metadata.
///
/// The underscore-prefixed fields are owned by the planner; everything else is
/// carried through splits unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub config: ScriptConfig,

    /// HTTP flows; opaque to planning beyond their count.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Absolute start time in epoch milliseconds.
    #[serde(rename = "_start", default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,

    /// Planning lineage marker, set by the first planning round.
    #[serde(rename = "_genesis", default, skip_serializing_if = "Option::is_none")]
    pub genesis: Option<u64>,

    /// Dry-run flag, passed through to workers.
    #[serde(rename = "_trace", default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,

    #[serde(rename = "_invokeType", default, skip_serializing_if = "Option::is_none")]
    pub invoke_type: Option<InvokeType>,

    /// Per-script overrides of the platform limits.
    #[serde(rename = "_split", default, skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitOverrides>,

    /// Any other top-level keys, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Script {
    /// Creates a script with the given phases and nothing else.
    #[must_use]
    pub fn with_phases(phases: Vec<Phase>) -> Self {
        Self {
            config: ScriptConfig {
                phases,
                ..ScriptConfig::default()
            },
            ..Self::default()
        }
    }

    /// Parses a script from its JSON representation.
    pub fn from_json(json: &str) -> PlanResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the script to JSON.
    pub fn to_json(&self) -> PlanResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.config.phases
    }

    /// Copy of this script carrying `phases` instead of its own.
    ///
    /// Every other field, including scheduling metadata, is cloned.
    #[must_use]
    pub fn with_phase_list(&self, phases: Vec<Phase>) -> Self {
        Self {
            config: ScriptConfig {
                target: self.config.target.clone(),
                phases,
                extra: self.config.extra.clone(),
            },
            ..self.clone_without_phases()
        }
    }

    fn clone_without_phases(&self) -> Self {
        Self {
            config: ScriptConfig::default(),
            scenarios: self.scenarios.clone(),
            sampling: self.sampling.clone(),
            mode: self.mode,
            start: self.start,
            genesis: self.genesis,
            trace: self.trace,
            invoke_type: self.invoke_type,
            split: self.split.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Effective mode; scripts without a mode run as performance scripts.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_default()
    }
}
