//! Pipeline orchestration
//!
//! This module provides the public JSON-in / JSON-out API for Gluco Flux.
//! It runs the full path from submitted reading records to an analysis result.

use crate::analysis::GlucoseAnalyzer;
use crate::config::{AnalysisConfig, GlucoFluxConfig};
use crate::error::ComputeError;
use crate::schema::{ReadingRecord, ReadingRecordAdapter};
use crate::types::AnalysisResult;

/// Analyze a batch of reading records with the default thresholds.
///
/// # Arguments
/// * `input` - JSON array or NDJSON of `glucose.reading.v1` records
/// * `window_days` - Days before the latest reading to include (`0` = all)
///
/// # Returns
/// The analysis result serialized as JSON
///
/// # Example
/// ```ignore
/// let result_json = readings_to_analysis(records_json, 30)?;
/// ```
pub fn readings_to_analysis(input: String, window_days: u32) -> Result<String, ComputeError> {
    let analyzer = GlucoseAnalyzer::default();
    let result = process_records(&analyzer, &input, window_days)?;
    encode(&result)
}

/// Pipeline stages:
/// 1. ReadingRecordAdapter - Parse records
/// 2. Normalizer - Validate and convert to mg/dL
/// 3. GlucoseAnalyzer - Statistics, patterns, findings and goals
fn process_records(
    analyzer: &GlucoseAnalyzer,
    input: &str,
    window_days: u32,
) -> Result<AnalysisResult, ComputeError> {
    let records = ReadingRecordAdapter::parse(input)?;
    analyze_records(analyzer, &records, window_days)
}

fn analyze_records(
    analyzer: &GlucoseAnalyzer,
    records: &[ReadingRecord],
    window_days: u32,
) -> Result<AnalysisResult, ComputeError> {
    let readings = ReadingRecordAdapter::to_readings(records)?;
    Ok(analyzer.analyze_window(&readings, window_days))
}

fn encode(result: &AnalysisResult) -> Result<String, ComputeError> {
    serde_json::to_string(result).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Configured processor for repeated analysis runs.
///
/// Holds validated thresholds and a default window so callers only pass data.
#[derive(Debug, Clone)]
pub struct GlucoseProcessor {
    analyzer: GlucoseAnalyzer,
    window_days: u32,
}

impl Default for GlucoseProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl GlucoseProcessor {
    /// Create a new processor with default thresholds
    pub fn new() -> Self {
        let config = AnalysisConfig::default();
        Self {
            window_days: config.window_days,
            analyzer: GlucoseAnalyzer::new(config),
        }
    }

    /// Create a processor with custom thresholds
    pub fn with_config(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            window_days: config.window_days,
            analyzer: GlucoseAnalyzer::new(config),
        })
    }

    /// Override the analysis window (`0` = all readings)
    pub fn with_window(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.analyzer.config()
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Load thresholds from a configuration file body
    pub fn load_config(&mut self, json: &str) -> Result<(), ComputeError> {
        let config = GlucoFluxConfig::from_json(json)?;
        self.window_days = config.analysis.window_days;
        self.analyzer = GlucoseAnalyzer::new(config.analysis);
        Ok(())
    }

    /// Save the active thresholds as a configuration file body
    pub fn save_config(&self) -> Result<String, ComputeError> {
        let mut analysis = self.config().clone();
        analysis.window_days = self.window_days;
        GlucoFluxConfig {
            analysis,
            ..GlucoFluxConfig::default()
        }
        .to_json()
        .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Analyze a JSON array or NDJSON payload
    pub fn process(&self, input: &str) -> Result<AnalysisResult, ComputeError> {
        process_records(&self.analyzer, input, self.window_days)
    }

    /// Analyze already-parsed records
    pub fn process_records(&self, records: &[ReadingRecord]) -> Result<AnalysisResult, ComputeError> {
        analyze_records(&self.analyzer, records, self.window_days)
    }

    /// Analyze a payload and return the result as JSON
    pub fn process_json(&self, input: &str) -> Result<String, ComputeError> {
        encode(&self.process(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;

    fn sample_ndjson() -> String {
        let mut lines = Vec::new();
        for day in 1..=7 {
            lines.push(format!(
                r#"{{"value":{},"reading_type":"fasting","measured_at":"2024-03-{:02}T07:00:00+01:00"}}"#,
                95 + day,
                day
            ));
            lines.push(format!(
                r#"{{"value":140,"reading_type":"post_meal","measured_at":"2024-03-{:02}T13:30:00+01:00"}}"#,
                day
            ));
        }
        lines.join("\n")
    }

    #[test]
    fn test_readings_to_analysis() {
        let json = readings_to_analysis(sample_ndjson(), 30).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["has_data"], true);
        assert_eq!(value["total_readings"], 14);
        assert_eq!(value["days_analyzed"], 7);
        assert_eq!(value["averages"]["fasting"], 99.0);
        assert_eq!(value["averages"]["post_meal"], 140.0);
        assert_eq!(value["time_in_range"]["percentage"], 100.0);
        assert_eq!(value["date_range"]["start"], "2024-03-01");
    }

    #[test]
    fn test_result_round_trips_through_json() {
        let processor = GlucoseProcessor::new();
        let result = processor.process(&sample_ndjson()).unwrap();
        let json = processor.process_json(&sample_ndjson()).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_window_limits_readings() {
        let processor = GlucoseProcessor::new().with_window(2);
        let result = processor.process(&sample_ndjson()).unwrap();

        // days 5, 6 and 7 lie within two days of the last reading
        assert_eq!(result.days_analyzed, 3);
        assert_eq!(result.window_days, 2);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = AnalysisConfig {
            hyper_threshold: 130.0,
            ..AnalysisConfig::default()
        };
        let processor = GlucoseProcessor::with_config(config).unwrap();
        let result = processor.process(&sample_ndjson()).unwrap();

        let tir = result.time_in_range.unwrap();
        assert_eq!(tir.above_count, 7);
        assert_eq!(tir.above_percentage, 50.0);
        assert!(result.patterns.consistently_high);
        assert_eq!(result.patterns.hyperglycemia_risk, RiskLevel::Moderate);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            hypo_threshold: 200.0,
            hyper_threshold: 100.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            GlucoseProcessor::with_config(config),
            Err(ComputeError::Config(_))
        ));
    }

    #[test]
    fn test_config_save_and_load() {
        let processor = GlucoseProcessor::with_config(AnalysisConfig {
            hyper_threshold: 160.0,
            ..AnalysisConfig::default()
        })
        .unwrap()
        .with_window(14);
        let saved = processor.save_config().unwrap();

        let mut restored = GlucoseProcessor::new();
        restored.load_config(&saved).unwrap();
        assert_eq!(restored.config().hyper_threshold, 160.0);
        assert_eq!(restored.window_days(), 14);
    }

    #[test]
    fn test_empty_payload() {
        let json = readings_to_analysis("[]".to_string(), 30).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["has_data"], false);
        assert_eq!(value["total_readings"], 0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(readings_to_analysis("not valid json".to_string(), 30).is_err());
    }

    #[test]
    fn test_invalid_reading_rejected() {
        let input = r#"[{"value":"n/a","reading_type":"random","measured_at":"2024-03-01T08:00:00Z"}]"#;
        assert!(readings_to_analysis(input.to_string(), 30).is_err());
    }
}
