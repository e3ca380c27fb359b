//! Configuration for guardrails.

use crate::agent::errors::GuardrailError;
use crate::agent::loop_detection::TrackerConfig;
use crate::config::{
    DEEP_MAX_CONSECUTIVE_REPEATS, DEEP_MAX_TOOL_CALLS, DEEP_MIN_SEQUENCE_LENGTH,
    DEFAULT_TIME_WINDOW_MS, MAX_SEQUENCE_LENGTH, STANDARD_MAX_CONSECUTIVE_REPEATS,
    STANDARD_MAX_TOOL_CALLS, STANDARD_MIN_SEQUENCE_LENGTH, STRICT_MAX_CONSECUTIVE_REPEATS,
    STRICT_MAX_TOOL_CALLS, STRICT_MIN_SEQUENCE_LENGTH,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Ceiling of the escalation ladder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnLoopAction {
    /// Warn first, then inject guidance, then abort.
    #[default]
    Warn,
    /// Same ladder as `Warn`.
    Inject,
    /// Warn first, then abort; guidance is never injected.
    Abort,
}

impl OnLoopAction {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Inject => "inject",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for OnLoopAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnLoopAction {
    type Err = GuardrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "inject" => Ok(Self::Inject),
            "abort" => Ok(Self::Abort),
            _ => Err(GuardrailError::UnknownLoopAction(s.to_string())),
        }
    }
}

/// Named threshold presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardrailMode {
    /// Regular analysis.
    #[default]
    Standard,
    /// Longer analysis with more room before a loop is reported.
    Deep,
    /// Tight thresholds; skips injected guidance.
    Strict,
}

impl GuardrailMode {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Deep => "deep",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for GuardrailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuardrailMode {
    type Err = GuardrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "deep" => Ok(Self::Deep),
            "strict" => Ok(Self::Strict),
            _ => Err(GuardrailError::UnknownMode(s.to_string())),
        }
    }
}

/// Tracker thresholds plus escalation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    /// Loop detection thresholds.
    pub tracker: TrackerConfig,
    /// Log every recorded tool call at info level.
    pub verbose: bool,
    /// Ceiling of the escalation ladder.
    pub on_loop_action: OnLoopAction,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self::preset(GuardrailMode::Standard)
    }
}

/// Raw layered settings; every key is optional and overrides the preset.
#[derive(Debug, Deserialize)]
struct GuardrailsSettings {
    #[serde(rename = "guardrails_mode")]
    mode: Option<String>,
    #[serde(rename = "guardrails_max_tool_calls")]
    max_tool_calls: Option<usize>,
    #[serde(rename = "guardrails_max_consecutive_repeats")]
    max_consecutive_repeats: Option<usize>,
    #[serde(rename = "guardrails_min_sequence_length")]
    min_sequence_length: Option<usize>,
    #[serde(rename = "guardrails_time_window_ms")]
    time_window_ms: Option<u64>,
    #[serde(rename = "guardrails_verbose")]
    verbose: Option<bool>,
    #[serde(rename = "guardrails_on_loop_action")]
    on_loop_action: Option<String>,
}

impl GuardrailsSettings {
    fn resolve(self) -> Result<GuardrailsConfig, GuardrailError> {
        let mode = self
            .mode
            .as_deref()
            .map(str::parse::<GuardrailMode>)
            .transpose()?
            .unwrap_or_default();

        let mut config = GuardrailsConfig::preset(mode);
        if let Some(value) = self.max_tool_calls {
            config.tracker.max_tool_calls = value;
        }
        if let Some(value) = self.max_consecutive_repeats {
            config.tracker.max_consecutive_repeats = value;
        }
        if let Some(value) = self.min_sequence_length {
            config.tracker.min_sequence_length = value;
        }
        if let Some(value) = self.time_window_ms {
            config.tracker.time_window_ms = value;
        }
        if let Some(value) = self.verbose {
            config.verbose = value;
        }
        if let Some(value) = self.on_loop_action.as_deref() {
            config.on_loop_action = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl GuardrailsConfig {
    /// Thresholds for a named mode.
    #[must_use]
    pub const fn preset(mode: GuardrailMode) -> Self {
        let (max_tool_calls, max_consecutive_repeats, min_sequence_length, on_loop_action) =
            match mode {
                GuardrailMode::Standard => (
                    STANDARD_MAX_TOOL_CALLS,
                    STANDARD_MAX_CONSECUTIVE_REPEATS,
                    STANDARD_MIN_SEQUENCE_LENGTH,
                    OnLoopAction::Warn,
                ),
                GuardrailMode::Deep => (
                    DEEP_MAX_TOOL_CALLS,
                    DEEP_MAX_CONSECUTIVE_REPEATS,
                    DEEP_MIN_SEQUENCE_LENGTH,
                    OnLoopAction::Warn,
                ),
                GuardrailMode::Strict => (
                    STRICT_MAX_TOOL_CALLS,
                    STRICT_MAX_CONSECUTIVE_REPEATS,
                    STRICT_MIN_SEQUENCE_LENGTH,
                    OnLoopAction::Abort,
                ),
            };

        Self {
            tracker: TrackerConfig {
                max_tool_calls,
                max_consecutive_repeats,
                min_sequence_length,
                time_window_ms: DEFAULT_TIME_WINDOW_MS,
            },
            verbose: false,
            on_loop_action,
        }
    }

    /// Check every threshold is in range.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::InvalidConfig` naming the first bad value.
    pub fn validate(&self) -> Result<(), GuardrailError> {
        let tracker = &self.tracker;
        if tracker.max_tool_calls == 0 {
            return Err(GuardrailError::InvalidConfig(
                "max_tool_calls must be at least 1".to_string(),
            ));
        }
        if tracker.max_consecutive_repeats == 0 {
            return Err(GuardrailError::InvalidConfig(
                "max_consecutive_repeats must be at least 1".to_string(),
            ));
        }
        if !(2..=MAX_SEQUENCE_LENGTH).contains(&tracker.min_sequence_length) {
            return Err(GuardrailError::InvalidConfig(format!(
                "min_sequence_length must be between 2 and {MAX_SEQUENCE_LENGTH}, got {}",
                tracker.min_sequence_length
            )));
        }
        if tracker.time_window_ms == 0 {
            return Err(GuardrailError::InvalidConfig(
                "time_window_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load settings from config files and environment variables.
    ///
    /// Priority: env vars → config files → preset defaults. Falls back to the
    /// `standard` preset with a warning if anything is invalid.
    #[must_use]
    pub fn from_env() -> Self {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let loaded = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::default().ignore_empty(true))
            .build()
            .map_err(GuardrailError::from)
            .and_then(Self::from_config);

        match loaded {
            Ok(config) => config,
            Err(err) => Self::warn_and_default(&err),
        }
    }

    /// Resolve settings from an already built `Config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be deserialized, names an unknown
    /// mode or loop action, or fails validation.
    pub fn from_config(config: Config) -> Result<Self, GuardrailError> {
        let settings: GuardrailsSettings = config.try_deserialize()?;
        settings.resolve()
    }

    fn warn_and_default(err: &GuardrailError) -> Self {
        warn!(error = %err, "Failed to load guardrail config, using standard preset");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardrailMode, GuardrailsConfig, OnLoopAction};
    use crate::agent::errors::GuardrailError;
    use config::Config;

    fn build(pairs: &[(&str, &str)]) -> Result<GuardrailsConfig, GuardrailError> {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value)?;
        }
        GuardrailsConfig::from_config(builder.build()?)
    }

    #[test]
    fn presets_match_table() {
        let standard = GuardrailsConfig::preset(GuardrailMode::Standard);
        assert_eq!(standard.tracker.max_tool_calls, 50);
        assert_eq!(standard.tracker.max_consecutive_repeats, 5);
        assert_eq!(standard.tracker.min_sequence_length, 3);
        assert_eq!(standard.on_loop_action, OnLoopAction::Warn);

        let deep = GuardrailsConfig::preset(GuardrailMode::Deep);
        assert_eq!(deep.tracker.max_tool_calls, 80);
        assert_eq!(deep.tracker.max_consecutive_repeats, 6);
        assert_eq!(deep.tracker.min_sequence_length, 4);
        assert_eq!(deep.on_loop_action, OnLoopAction::Warn);

        let strict = GuardrailsConfig::preset(GuardrailMode::Strict);
        assert_eq!(strict.tracker.max_tool_calls, 30);
        assert_eq!(strict.tracker.max_consecutive_repeats, 3);
        assert_eq!(strict.tracker.min_sequence_length, 2);
        assert_eq!(strict.on_loop_action, OnLoopAction::Abort);
    }

    #[test]
    fn empty_sources_give_standard() -> Result<(), GuardrailError> {
        assert_eq!(build(&[])?, GuardrailsConfig::default());
        Ok(())
    }

    #[test]
    fn overrides_apply_on_top_of_mode() -> Result<(), GuardrailError> {
        let config = build(&[
            ("guardrails_mode", "Strict"),
            ("guardrails_max_tool_calls", "12"),
            ("guardrails_verbose", "true"),
        ])?;
        assert_eq!(config.tracker.max_tool_calls, 12);
        assert_eq!(config.tracker.max_consecutive_repeats, 3);
        assert_eq!(config.on_loop_action, OnLoopAction::Abort);
        assert!(config.verbose);
        Ok(())
    }

    #[test]
    fn loop_action_override() -> Result<(), GuardrailError> {
        let config = build(&[("guardrails_on_loop_action", "inject")])?;
        assert_eq!(config.on_loop_action, OnLoopAction::Inject);
        Ok(())
    }

    #[test]
    fn rejects_unknown_mode() {
        let result = build(&[("guardrails_mode", "paranoid")]);
        assert!(matches!(result, Err(GuardrailError::UnknownMode(_))));
    }

    #[test]
    fn rejects_out_of_range_sequence_length() {
        let result = build(&[("guardrails_min_sequence_length", "5")]);
        assert!(matches!(result, Err(GuardrailError::InvalidConfig(_))));
    }

    #[test]
    fn parses_and_displays_names() {
        assert_eq!(" deep ".parse::<GuardrailMode>().ok(), Some(GuardrailMode::Deep));
        assert_eq!(GuardrailMode::Strict.to_string(), "strict");
        assert_eq!("ABORT".parse::<OnLoopAction>().ok(), Some(OnLoopAction::Abort));
        assert!("stop".parse::<OnLoopAction>().is_err());
    }
}
