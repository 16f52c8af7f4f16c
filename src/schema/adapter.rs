//! Adapter for turning glucose.reading.v1 payloads into engine readings
//!
//! Accepts either a JSON array or NDJSON (one record per line), validates
//! every record and normalizes the survivors to mg/dL.

use crate::error::ComputeError;
use crate::normalizer::Normalizer;
use crate::schema::reading_record::*;
use crate::types::GlucoseReading;

/// Adapter for converting reading records to glucose readings
pub struct ReadingRecordAdapter;

impl ReadingRecordAdapter {
    /// Parse a JSON string containing an array of ReadingRecords
    pub fn parse_array(json: &str) -> Result<Vec<ReadingRecord>, ComputeError> {
        let records: Vec<ReadingRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing ReadingRecords
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<ReadingRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<ReadingRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either form, picking the array parser when the payload starts with `[`
    pub fn parse(input: &str) -> Result<Vec<ReadingRecord>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Convert records to readings ordered by measurement time
    ///
    /// The first invalid record aborts the conversion.
    pub fn to_readings(records: &[ReadingRecord]) -> Result<Vec<GlucoseReading>, ComputeError> {
        Normalizer::normalize_all(records).map_err(|(idx, e)| {
            ComputeError::ParseError(format!("Invalid reading at index {}: {}", idx, e))
        })
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[ReadingRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| ValidationResult {
                index: idx,
                record_id: record.id.clone(),
                result: record.validate().err(),
            })
            .filter(|r| r.result.is_some())
            .collect()
    }
}

/// Result of record validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub record_id: Option<String>,
    pub result: Option<ValidationError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReadingType;
    use pretty_assertions::assert_eq;

    const NDJSON: &str = r#"{"id":"a","value":95,"reading_type":"fasting","measured_at":"2024-03-01T07:00:00+01:00"}

{"id":"b","value":"8.2","unit":"mmol_l","reading_type":"post_meal","measured_at":"2024-03-01T13:30:00+01:00"}
"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = ReadingRecordAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].unit, GlucoseUnit::MmolL);
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = "{\"value\":95,\"reading_type\":\"fasting\",\"measured_at\":\"2024-03-01T07:00:00Z\"}\nnot json\n";
        let err = ReadingRecordAdapter::parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_detects_array() {
        let input = r#"[{"value":95,"reading_type":"random","measured_at":"2024-03-01T07:00:00Z"}]"#;
        assert_eq!(ReadingRecordAdapter::parse(input).unwrap().len(), 1);
        assert_eq!(ReadingRecordAdapter::parse(NDJSON).unwrap().len(), 2);
    }

    #[test]
    fn test_to_readings_normalizes_units() {
        let records = ReadingRecordAdapter::parse_ndjson(NDJSON).unwrap();
        let readings = ReadingRecordAdapter::to_readings(&records).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 95.0);
        assert_eq!(readings[1].value, 147.7);
        assert_eq!(readings[1].reading_type, ReadingType::PostMeal);
    }

    #[test]
    fn test_to_readings_rejects_invalid() {
        let input = r#"[
            {"value":95,"reading_type":"random","measured_at":"2024-03-01T07:00:00Z"},
            {"value":"abc","reading_type":"random","measured_at":"2024-03-01T08:00:00Z"}
        ]"#;
        let records = ReadingRecordAdapter::parse_array(input).unwrap();
        let err = ReadingRecordAdapter::to_readings(&records).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_validate_records_lists_failures() {
        let input = r#"[
            {"id":"ok","value":95,"reading_type":"random","measured_at":"2024-03-01T07:00:00Z"},
            {"id":"neg","value":-4,"reading_type":"random","measured_at":"2024-03-01T08:00:00Z"},
            {"id":"huge","value":4000,"reading_type":"random","measured_at":"2024-03-01T09:00:00Z"}
        ]"#;
        let records = ReadingRecordAdapter::parse_array(input).unwrap();
        let failures = ReadingRecordAdapter::validate_records(&records);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].record_id.as_deref(), Some("neg"));
        assert_eq!(failures[1].record_id.as_deref(), Some("huge"));
    }
}
