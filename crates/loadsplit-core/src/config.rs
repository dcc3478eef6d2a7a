//! Platform limits for script splitting
//!
//! The limits describe what a single serverless worker can do: how long it may
//! run and how many arrivals per second it can generate. They are loaded from:
//! - Hardcoded defaults
//! - An optional config file
//! - Environment variable overrides
//! - Per-script `_split` overrides

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{PlanError, PlanResult};
use crate::script::Script;

/// Limits and buffer times consumed by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Longest whole script (all generations together) accepted, in seconds.
    pub max_script_duration_in_seconds: u64,

    /// Highest peak rate a whole script may specify.
    pub max_script_requests_per_second: u32,

    /// Longest run of a single worker, in seconds.
    pub max_chunk_duration_in_seconds: u64,

    /// Highest rate a single worker generates.
    pub max_chunk_requests_per_second: u32,

    /// Lead time between planning and the first scheduled start.
    pub time_buffer_in_milliseconds: u64,
}

impl Settings {
    /// Hard ceiling for `max_script_duration_in_seconds` (6 days).
    pub const MAX_SCRIPT_DURATION_IN_SECONDS: u64 = 518_400;
    /// Default script duration limit (1 day).
    pub const DEFAULT_MAX_SCRIPT_DURATION_IN_SECONDS: u64 = 86_400;
    /// Hard ceiling for `max_script_requests_per_second`.
    pub const MAX_SCRIPT_REQUESTS_PER_SECOND: u32 = 50_000;
    /// Default script rate limit.
    pub const DEFAULT_MAX_SCRIPT_REQUESTS_PER_SECOND: u32 = 5_000;
    /// Hard ceiling for `max_chunk_duration_in_seconds`; a worker is killed at 300s.
    pub const MAX_CHUNK_DURATION_IN_SECONDS: u64 = 285;
    /// Default worker run length.
    pub const DEFAULT_MAX_CHUNK_DURATION_IN_SECONDS: u64 = 120;
    /// Hard ceiling for `max_chunk_requests_per_second`.
    pub const MAX_CHUNK_REQUESTS_PER_SECOND: u32 = 500;
    /// Default worker rate.
    pub const DEFAULT_MAX_CHUNK_REQUESTS_PER_SECOND: u32 = 25;
    /// Hard ceiling for `time_buffer_in_milliseconds`.
    pub const MAX_TIME_BUFFER_IN_MILLISECONDS: u64 = 300_000;
    /// Default lead time.
    pub const DEFAULT_TIME_BUFFER_IN_MILLISECONDS: u64 = 15_000;

    /// Load settings from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by LOADSPLIT_CONFIG env var
    /// 3. ./config/loadsplit.{yaml,toml,json}
    /// 4. Hardcoded defaults (lowest priority)
    pub fn load() -> PlanResult<Self> {
        let mut builder = Self::set_defaults(Config::builder())?;

        if let Ok(config_path) = std::env::var("LOADSPLIT_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/loadsplit").required(false))
            // Example: LOADSPLIT__MAX_CHUNK_DURATION_IN_SECONDS=240
            .add_source(
                Environment::with_prefix("LOADSPLIT")
                    .separator("__")
                    .try_parsing(true),
            );

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        let settings: Settings = raw.into();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a specific file path, on top of the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlanResult<Self> {
        let raw: RawSettings = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        let settings: Settings = raw.into();
        settings.validate()?;
        Ok(settings)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default(
                "max_script_duration_in_seconds",
                Self::DEFAULT_MAX_SCRIPT_DURATION_IN_SECONDS,
            )?
            .set_default(
                "max_script_requests_per_second",
                Self::DEFAULT_MAX_SCRIPT_REQUESTS_PER_SECOND,
            )?
            .set_default(
                "max_chunk_duration_in_seconds",
                Self::DEFAULT_MAX_CHUNK_DURATION_IN_SECONDS,
            )?
            .set_default(
                "max_chunk_requests_per_second",
                Self::DEFAULT_MAX_CHUNK_REQUESTS_PER_SECOND,
            )?
            .set_default(
                "time_buffer_in_milliseconds",
                Self::DEFAULT_TIME_BUFFER_IN_MILLISECONDS,
            )
    }

    /// Validate limit values against each other and the platform ceilings.
    pub fn validate(&self) -> PlanResult<()> {
        check_range(
            "maxScriptDurationInSeconds",
            self.max_script_duration_in_seconds,
            Self::MAX_SCRIPT_DURATION_IN_SECONDS,
        )?;
        check_range(
            "maxScriptRequestsPerSecond",
            u64::from(self.max_script_requests_per_second),
            u64::from(Self::MAX_SCRIPT_REQUESTS_PER_SECOND),
        )?;
        check_range(
            "maxChunkDurationInSeconds",
            self.max_chunk_duration_in_seconds,
            Self::MAX_CHUNK_DURATION_IN_SECONDS,
        )?;
        check_range(
            "maxChunkRequestsPerSecond",
            u64::from(self.max_chunk_requests_per_second),
            u64::from(Self::MAX_CHUNK_REQUESTS_PER_SECOND),
        )?;
        check_range(
            "timeBufferInMilliseconds",
            self.time_buffer_in_milliseconds,
            Self::MAX_TIME_BUFFER_IN_MILLISECONDS,
        )?;

        if self.max_chunk_duration_in_seconds > self.max_script_duration_in_seconds {
            return Err(PlanError::validation(
                "maxChunkDurationInSeconds must be <= maxScriptDurationInSeconds",
            ));
        }
        if self.max_chunk_requests_per_second > self.max_script_requests_per_second {
            return Err(PlanError::validation(
                "maxChunkRequestsPerSecond must be <= maxScriptRequestsPerSecond",
            ));
        }

        Ok(())
    }

    /// Applies a script's `_split` overrides on top of these settings.
    pub fn for_script(&self, script: &Script) -> PlanResult<Self> {
        let Some(overrides) = &script.split else {
            return Ok(*self);
        };

        let settings = Self {
            max_script_duration_in_seconds: overrides
                .max_script_duration_in_seconds
                .unwrap_or(self.max_script_duration_in_seconds),
            max_script_requests_per_second: overrides
                .max_script_requests_per_second
                .unwrap_or(self.max_script_requests_per_second),
            max_chunk_duration_in_seconds: overrides
                .max_chunk_duration_in_seconds
                .unwrap_or(self.max_chunk_duration_in_seconds),
            max_chunk_requests_per_second: overrides
                .max_chunk_requests_per_second
                .unwrap_or(self.max_chunk_requests_per_second),
            time_buffer_in_milliseconds: overrides
                .time_buffer_in_milliseconds
                .unwrap_or(self.time_buffer_in_milliseconds),
        };

        if let Err(err) = settings.validate() {
            warn!("Rejected _split overrides: {}", err);
            return Err(err);
        }
        Ok(settings)
    }

    /// Worker run length as a `Duration`.
    pub fn max_chunk_duration(&self) -> Duration {
        Duration::from_secs(self.max_chunk_duration_in_seconds)
    }

    /// Lead time as a `Duration`.
    pub fn time_buffer(&self) -> Duration {
        Duration::from_millis(self.time_buffer_in_milliseconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_script_duration_in_seconds: Self::DEFAULT_MAX_SCRIPT_DURATION_IN_SECONDS,
            max_script_requests_per_second: Self::DEFAULT_MAX_SCRIPT_REQUESTS_PER_SECOND,
            max_chunk_duration_in_seconds: Self::DEFAULT_MAX_CHUNK_DURATION_IN_SECONDS,
            max_chunk_requests_per_second: Self::DEFAULT_MAX_CHUNK_REQUESTS_PER_SECOND,
            time_buffer_in_milliseconds: Self::DEFAULT_TIME_BUFFER_IN_MILLISECONDS,
        }
    }
}

/// The `config` crate lowercases keys from every source, so files and the
/// environment are read through snake_case names.
#[derive(Debug, Deserialize)]
struct RawSettings {
    max_script_duration_in_seconds: u64,
    max_script_requests_per_second: u32,
    max_chunk_duration_in_seconds: u64,
    max_chunk_requests_per_second: u32,
    time_buffer_in_milliseconds: u64,
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Self {
            max_script_duration_in_seconds: raw.max_script_duration_in_seconds,
            max_script_requests_per_second: raw.max_script_requests_per_second,
            max_chunk_duration_in_seconds: raw.max_chunk_duration_in_seconds,
            max_chunk_requests_per_second: raw.max_chunk_requests_per_second,
            time_buffer_in_milliseconds: raw.time_buffer_in_milliseconds,
        }
    }
}

/// Optional per-script limit overrides, read from a script's `_split` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_script_duration_in_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_script_requests_per_second: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_duration_in_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_requests_per_second: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_buffer_in_milliseconds: Option<u64>,
}

fn check_range(field: &str, value: u64, max: u64) -> PlanResult<()> {
    if value == 0 {
        return Err(PlanError::validation(format!("{field} must be > 0")));
    }
    if value > max {
        return Err(PlanError::validation(format!(
            "{field} must be <= {max}, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.max_chunk_duration_in_seconds, 120);
        assert_eq!(settings.max_chunk_requests_per_second, 25);
        assert_eq!(settings.time_buffer_in_milliseconds, 15_000);
        assert_eq!(settings.max_chunk_duration().as_secs(), 120);
        assert_eq!(settings.time_buffer().as_millis(), 15_000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut settings = Settings::default();

        settings.max_chunk_duration_in_seconds = 0;
        assert!(settings.validate().is_err());

        settings.max_chunk_duration_in_seconds = Settings::MAX_CHUNK_DURATION_IN_SECONDS + 1;
        assert!(settings.validate().is_err());

        settings.max_chunk_duration_in_seconds = 240;
        assert!(settings.validate().is_ok());

        settings.max_chunk_requests_per_second = 100;
        settings.max_script_requests_per_second = 50;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_split_overrides_applied() {
        let script: Script = serde_json::from_value(json!({
            "config": {"phases": []},
            "_split": {"maxChunkDurationInSeconds": 60, "timeBufferInMilliseconds": 500}
        }))
        .unwrap();

        let settings = Settings::default().for_script(&script).unwrap();
        assert_eq!(settings.max_chunk_duration_in_seconds, 60);
        assert_eq!(settings.time_buffer_in_milliseconds, 500);
        assert_eq!(settings.max_chunk_requests_per_second, 25);
    }

    #[test]
    fn test_split_overrides_rejected() {
        let script: Script = serde_json::from_value(json!({
            "config": {"phases": []},
            "_split": {"maxChunkRequestsPerSecond": 100000}
        }))
        .unwrap();

        assert!(matches!(
            Settings::default().for_script(&script),
            Err(PlanError::Validation(_))
        ));
    }

    #[test]
    fn test_no_overrides_returns_same_settings() {
        let script = Script::default();
        assert_eq!(Settings::default().for_script(&script).unwrap(), Settings::default());
    }

    #[test]
    fn test_from_file_layers_over_defaults() {
        let dir = std::env::temp_dir().join(format!("loadsplit-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("limits.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max_chunk_duration_in_seconds = 240").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.max_chunk_duration_in_seconds, 240);
        assert_eq!(settings.max_chunk_requests_per_second, 25);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
