//! glucose.reading.v1 record definition
//!
//! The wire format for a single blood glucose measurement as it arrives from
//! the host application: a value in either mg/dL or mmol/L, the reading type
//! and a local timestamp with its UTC offset.

use crate::types::ReadingType;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Current record schema version
pub const SCHEMA_VERSION: &str = "glucose.reading.v1";

/// Lowest plausible glucose value in mg/dL
pub const MIN_PLAUSIBLE_MG_DL: f64 = 10.0;

/// Highest plausible glucose value in mg/dL
pub const MAX_PLAUSIBLE_MG_DL: f64 = 1000.0;

/// Measurement unit of the submitted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlucoseUnit {
    #[default]
    #[serde(alias = "mg/dL", alias = "mg/dl")]
    MgDl,
    #[serde(alias = "mmol/L", alias = "mmol/l")]
    MmolL,
}

impl GlucoseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }
}

/// Submitted value; forms post numbers as strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(f64),
    Text(String),
}

impl From<f64> for ReadingValue {
    fn from(v: f64) -> Self {
        ReadingValue::Number(v)
    }
}

impl From<String> for ReadingValue {
    fn from(v: String) -> Self {
        ReadingValue::Text(v)
    }
}

impl ReadingValue {
    /// Numeric value, parsing text if needed
    pub fn as_f64(&self) -> Result<f64, ValidationError> {
        match self {
            ReadingValue::Number(n) => Ok(*n),
            ReadingValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::NonNumericValue(s.clone())),
        }
    }
}

/// A single glucose reading as submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRecord {
    /// Schema version; when present must equal [`SCHEMA_VERSION`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Caller-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: ReadingValue,
    #[serde(default)]
    pub unit: GlucoseUnit,
    pub reading_type: ReadingType,
    /// Local wall-clock time with offset (RFC 3339)
    pub measured_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ReadingRecord {
    /// Create a mg/dL record without id or notes
    pub fn new(value: f64, reading_type: ReadingType, measured_at: DateTime<FixedOffset>) -> Self {
        ReadingRecord {
            schema_version: Some(SCHEMA_VERSION.to_string()),
            id: None,
            value: ReadingValue::Number(value),
            unit: GlucoseUnit::MgDl,
            reading_type,
            measured_at,
            notes: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_unit(mut self, unit: GlucoseUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Validate the record, returning the value in mg/dL
    pub fn validate(&self) -> Result<f64, ValidationError> {
        if let Some(version) = &self.schema_version {
            if version != SCHEMA_VERSION {
                return Err(ValidationError::InvalidSchemaVersion {
                    expected: SCHEMA_VERSION.to_string(),
                    actual: version.clone(),
                });
            }
        }

        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(ValidationError::EmptyId);
            }
        }

        let raw = self.value.as_f64()?;
        if !raw.is_finite() {
            return Err(ValidationError::NonFiniteValue);
        }
        if raw <= 0.0 {
            return Err(ValidationError::NonPositiveValue(raw));
        }

        let mg_dl = crate::normalizer::to_mg_dl(raw, self.unit);
        if !(MIN_PLAUSIBLE_MG_DL..=MAX_PLAUSIBLE_MG_DL).contains(&mg_dl) {
            return Err(ValidationError::OutOfRange {
                value: mg_dl,
                min: MIN_PLAUSIBLE_MG_DL,
                max: MAX_PLAUSIBLE_MG_DL,
            });
        }

        Ok(mg_dl)
    }
}

/// Reading record validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Reading id must not be empty")]
    EmptyId,

    #[error("Reading value is not a number: {0:?}")]
    NonNumericValue(String),

    #[error("Reading value must be finite")]
    NonFiniteValue,

    #[error("Reading value must be positive, got {0}")]
    NonPositiveValue(f64),

    #[error("Reading value {value} mg/dL outside plausible range {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(ts).unwrap()
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{"value": 110, "reading_type": "fasting", "measured_at": "2024-03-01T07:30:00+02:00"}"#;
        let record: ReadingRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.unit, GlucoseUnit::MgDl);
        assert_eq!(record.reading_type, ReadingType::Fasting);
        assert_eq!(record.measured_at.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(record.validate().unwrap(), 110.0);
    }

    #[test]
    fn test_unit_aliases() {
        let json = r#"{"value": "6.1", "unit": "mmol/L", "reading_type": "before_meal", "measured_at": "2024-03-01T12:00:00Z"}"#;
        let record: ReadingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.unit, GlucoseUnit::MmolL);
        assert_eq!(record.validate().unwrap(), 109.9);
    }

    #[test]
    fn test_unknown_unit_fails_to_parse() {
        let json = r#"{"value": 5, "unit": "grains", "reading_type": "random", "measured_at": "2024-03-01T12:00:00Z"}"#;
        assert!(serde_json::from_str::<ReadingRecord>(json).is_err());
    }

    #[test]
    fn test_serialize_record() {
        let record = ReadingRecord::new(142.0, ReadingType::PostMeal, at("2024-03-01T13:15:00+01:00"))
            .with_id("r-1");
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("glucose.reading.v1"));
        assert!(json.contains("\"post_meal\""));
        assert!(json.contains("\"mg_dl\""));
        assert!(!json.contains("notes"));
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let mut record = ReadingRecord::new(100.0, ReadingType::Random, at("2024-03-01T12:00:00Z"));
        record.value = ReadingValue::Text("high".to_string());
        assert_eq!(
            record.validate(),
            Err(ValidationError::NonNumericValue("high".to_string()))
        );
    }

    #[test]
    fn test_non_finite_and_non_positive_rejected() {
        let base = ReadingRecord::new(100.0, ReadingType::Random, at("2024-03-01T12:00:00Z"));

        let mut record = base.clone();
        record.value = ReadingValue::Number(f64::NAN);
        assert_eq!(record.validate(), Err(ValidationError::NonFiniteValue));

        let mut record = base.clone();
        record.value = ReadingValue::Text("inf".to_string());
        assert_eq!(record.validate(), Err(ValidationError::NonFiniteValue));

        let mut record = base;
        record.value = ReadingValue::Number(0.0);
        assert_eq!(record.validate(), Err(ValidationError::NonPositiveValue(0.0)));
    }

    #[test]
    fn test_implausible_value_rejected() {
        let record = ReadingRecord::new(1500.0, ReadingType::Random, at("2024-03-01T12:00:00Z"));
        assert!(matches!(record.validate(), Err(ValidationError::OutOfRange { .. })));

        let record = ReadingRecord::new(5.0, ReadingType::Random, at("2024-03-01T12:00:00Z"));
        assert!(matches!(record.validate(), Err(ValidationError::OutOfRange { .. })));

        // 5.0 mmol/L is a normal value
        let record = ReadingRecord::new(5.0, ReadingType::Random, at("2024-03-01T12:00:00Z"))
            .with_unit(GlucoseUnit::MmolL);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_empty_id_and_wrong_version_rejected() {
        let record = ReadingRecord::new(100.0, ReadingType::Random, at("2024-03-01T12:00:00Z"))
            .with_id("  ");
        assert_eq!(record.validate(), Err(ValidationError::EmptyId));

        let mut record = ReadingRecord::new(100.0, ReadingType::Random, at("2024-03-01T12:00:00Z"));
        record.schema_version = Some("glucose.reading.v0".to_string());
        assert!(matches!(
            record.validate(),
            Err(ValidationError::InvalidSchemaVersion { .. })
        ));
    }
}
