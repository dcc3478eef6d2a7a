//! Core domain types for load-script planning.

pub mod config;
pub mod error;
pub mod phase;
pub mod sampling;
pub mod script;

pub use crate::config::{Settings, SplitOverrides};
pub use error::{PlanError, PlanResult};
pub use phase::Phase;
pub use sampling::{apply_monitoring_sampling, SamplingConfig, SamplingSpec};
pub use script::{InvokeType, Mode, Script, ScriptConfig};
