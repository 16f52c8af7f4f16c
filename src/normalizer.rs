//! Reading normalization
//!
//! Converts validated reading records into engine readings. All values are
//! carried in mg/dL from here on; mmol/L input is converted with the standard
//! molar factor and rounded to one decimal.

use crate::analysis::statistics::round_to;
use crate::schema::{GlucoseUnit, ReadingRecord, ValidationError};
use crate::types::GlucoseReading;

/// mg/dL per mmol/L of glucose
pub const MMOL_TO_MG_DL: f64 = 18.0182;

/// Convert a value in `unit` to mg/dL
pub fn to_mg_dl(value: f64, unit: GlucoseUnit) -> f64 {
    match unit {
        GlucoseUnit::MgDl => value,
        GlucoseUnit::MmolL => round_to(value * MMOL_TO_MG_DL, 1),
    }
}

/// Convert a mg/dL value to `unit`
pub fn from_mg_dl(value: f64, unit: GlucoseUnit) -> f64 {
    match unit {
        GlucoseUnit::MgDl => value,
        GlucoseUnit::MmolL => round_to(value / MMOL_TO_MG_DL, 1),
    }
}

/// Normalizer for turning reading records into engine readings
pub struct Normalizer;

impl Normalizer {
    /// Validate and normalize a single record
    pub fn normalize(record: &ReadingRecord) -> Result<GlucoseReading, ValidationError> {
        let value = record.validate()?;
        Ok(GlucoseReading::new(value, record.reading_type, record.measured_at))
    }

    /// Normalize a batch, ordered by measurement time
    ///
    /// Fails on the first invalid record, reporting its position.
    pub fn normalize_all(
        records: &[ReadingRecord],
    ) -> Result<Vec<GlucoseReading>, (usize, ValidationError)> {
        let mut readings = records
            .iter()
            .enumerate()
            .map(|(idx, record)| Self::normalize(record).map_err(|e| (idx, e)))
            .collect::<Result<Vec<_>, _>>()?;

        readings.sort_by_key(|r| r.measured_at);
        Ok(readings)
    }
}
