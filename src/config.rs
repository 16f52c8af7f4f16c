//! Engine configuration
//!
//! Thresholds and pacing values are plain serde structs with defaults. They are
//! always handed to the engines explicitly; nothing here reads global state
//! except [`AnalysisConfig::from_env`], which callers opt into.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default analysis window in days
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Hard message limit of the chat platform (characters)
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4096;

/// Pause between consecutive chunks of one message
pub const DEFAULT_INTER_CHUNK_DELAY_MS: u64 = 500;

/// Streaming buffer size that triggers a flush (characters)
pub const DEFAULT_STREAM_FLUSH_CHARS: usize = 500;

/// Number of buffered fragments that triggers a flush
pub const DEFAULT_STREAM_FLUSH_FRAGMENTS: usize = 10;

const ENV_HYPER_THRESHOLD: &str = "GLUCO_HYPER_THRESHOLD";
const ENV_HYPO_THRESHOLD: &str = "GLUCO_HYPO_THRESHOLD";
const ENV_WINDOW_DAYS: &str = "GLUCO_ANALYSIS_WINDOW_DAYS";
const ENV_HIGH_READINGS_PERCENTAGE: &str = "GLUCO_HIGH_READINGS_PERCENTAGE";

/// Thresholds and policy constants for the analysis engine (all glucose values mg/dL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Readings strictly below this are low
    pub hypo_threshold: f64,
    /// Readings strictly above this are high
    pub hyper_threshold: f64,
    /// Window used when the caller does not pass one
    pub window_days: u32,
    /// Share of high readings (%) above which readings are consistently high
    pub high_readings_percentage: f64,
    /// Share of low readings (%) above which readings are consistently low
    pub low_readings_percentage: f64,
    /// |slope| per day below which the trend is stable
    pub trend_stable_slope: f64,
    /// CV (%) below which variability is low
    pub low_variability_cv: f64,
    /// CV (%) above which variability is high
    pub high_variability_cv: f64,
    /// Post-meal minus pre-meal average that counts as a spike
    pub post_meal_spike_delta: f64,
    /// Post-meal average that counts as a spike when no pre-meal data exists
    pub post_meal_ceiling: f64,
    /// Any reading below this makes hypoglycemia risk high
    pub severe_hypo_threshold: f64,
    /// Any reading above this makes hyperglycemia risk high
    pub severe_hyper_threshold: f64,
    /// Time in range (%) considered on target
    pub target_time_in_range: f64,
    /// Reading count below which the result is flagged as low confidence
    pub min_readings_for_confidence: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hypo_threshold: 70.0,
            hyper_threshold: 140.0,
            window_days: DEFAULT_WINDOW_DAYS,
            high_readings_percentage: 30.0,
            low_readings_percentage: 10.0,
            trend_stable_slope: 0.5,
            low_variability_cv: 20.0,
            high_variability_cv: 36.0,
            post_meal_spike_delta: 50.0,
            post_meal_ceiling: 180.0,
            severe_hypo_threshold: 54.0,
            severe_hyper_threshold: 250.0,
            target_time_in_range: 70.0,
            min_readings_for_confidence: 5,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by `GLUCO_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var::<f64, _>(&lookup, ENV_HYPER_THRESHOLD)? {
            config.hyper_threshold = v;
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, ENV_HYPO_THRESHOLD)? {
            config.hypo_threshold = v;
        }
        if let Some(v) = parse_var::<u32, _>(&lookup, ENV_WINDOW_DAYS)? {
            config.window_days = v;
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, ENV_HIGH_READINGS_PERCENTAGE)? {
            config.high_readings_percentage = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds are positive, ordered and percentages are in 0-100
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hypo_threshold <= 0.0 {
            return Err(ConfigError::NonPositive("hypo_threshold"));
        }
        if self.hyper_threshold <= 0.0 {
            return Err(ConfigError::NonPositive("hyper_threshold"));
        }
        if self.hypo_threshold >= self.hyper_threshold {
            return Err(ConfigError::InvertedThresholds {
                hypo: self.hypo_threshold,
                hyper: self.hyper_threshold,
            });
        }
        for (name, value) in [
            ("high_readings_percentage", self.high_readings_percentage),
            ("low_readings_percentage", self.low_readings_percentage),
            ("target_time_in_range", self.target_time_in_range),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::PercentageOutOfRange(name));
            }
        }
        if self.low_variability_cv <= 0.0 || self.high_variability_cv < self.low_variability_cv {
            return Err(ConfigError::NonPositive("variability bands"));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}

/// Chunk size and pacing for outbound chat messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum characters per chunk
    pub max_message_length: usize,
    /// Pause between non-final chunks (milliseconds)
    pub inter_chunk_delay_ms: u64,
    /// Streaming buffer size that triggers a flush (characters)
    pub stream_flush_chars: usize,
    /// Number of buffered fragments that triggers a flush
    pub stream_flush_fragments: usize,
    /// Send a typing indicator before each chunk
    pub typing_indicator: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            inter_chunk_delay_ms: DEFAULT_INTER_CHUNK_DELAY_MS,
            stream_flush_chars: DEFAULT_STREAM_FLUSH_CHARS,
            stream_flush_fragments: DEFAULT_STREAM_FLUSH_FRAGMENTS,
            typing_indicator: true,
        }
    }
}

impl DispatchConfig {
    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_length == 0 {
            return Err(ConfigError::NonPositive("max_message_length"));
        }
        if self.stream_flush_chars == 0 {
            return Err(ConfigError::NonPositive("stream_flush_chars"));
        }
        if self.stream_flush_fragments == 0 {
            return Err(ConfigError::NonPositive("stream_flush_fragments"));
        }
        Ok(())
    }
}

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlucoFluxConfig {
    pub analysis: AnalysisConfig,
    pub dispatch: DispatchConfig,
}

impl GlucoFluxConfig {
    /// Load configuration from JSON; missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, crate::ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.analysis.validate()?;
        config.dispatch.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
