//! Core types for the Gluco Flux engines
//!
//! This module defines the data structures that flow into and out of the
//! analysis engine: glucose readings on the way in, and the structured
//! [`AnalysisResult`] consumed by insight pages and notification builders.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Context tag recorded with each glucose reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingType {
    Fasting,
    BeforeMeal,
    PostMeal,
    Random,
}

impl ReadingType {
    pub const ALL: [ReadingType; 4] = [
        ReadingType::Fasting,
        ReadingType::BeforeMeal,
        ReadingType::PostMeal,
        ReadingType::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingType::Fasting => "fasting",
            ReadingType::BeforeMeal => "before_meal",
            ReadingType::PostMeal => "post_meal",
            ReadingType::Random => "random",
        }
    }

    /// Human-readable label used in generated text
    pub fn label(&self) -> &'static str {
        match self {
            ReadingType::Fasting => "fasting",
            ReadingType::BeforeMeal => "before-meal",
            ReadingType::PostMeal => "post-meal",
            ReadingType::Random => "random",
        }
    }
}

/// Time-of-day bucket, derived from the local hour of a reading.
///
/// Boundaries: morning 05:00-11:59, afternoon 12:00-16:59,
/// evening 17:00-20:59, night 21:00-04:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

/// A single glucose measurement, already validated and normalized to mg/dL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    /// Glucose value (mg/dL)
    pub value: f64,
    /// Measurement context
    pub reading_type: ReadingType,
    /// Local time the reading was taken, with its UTC offset
    pub measured_at: DateTime<FixedOffset>,
}

impl GlucoseReading {
    pub fn new(value: f64, reading_type: ReadingType, measured_at: DateTime<FixedOffset>) -> Self {
        Self {
            value,
            reading_type,
            measured_at,
        }
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.measured_at.hour())
    }

    /// Local calendar date of the reading
    pub fn local_date(&self) -> NaiveDate {
        self.measured_at.date_naive()
    }
}

/// First and last local dates covered by the analyzed readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Mean glucose per reading type and overall (mg/dL, 1 decimal)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub fasting: Option<f64>,
    pub before_meal: Option<f64>,
    pub post_meal: Option<f64>,
    pub random: Option<f64>,
    pub overall: Option<f64>,
}

impl Averages {
    pub fn for_type(&self, reading_type: ReadingType) -> Option<f64> {
        match reading_type {
            ReadingType::Fasting => self.fasting,
            ReadingType::BeforeMeal => self.before_meal,
            ReadingType::PostMeal => self.post_meal,
            ReadingType::Random => self.random,
        }
    }
}

/// Lowest and highest reading in the window (mg/dL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseRange {
    pub min: f64,
    pub max: f64,
}

/// Time-in-range breakdown.
///
/// `in_range_count + above_count + below_count == total` always holds;
/// percentages are each rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInRange {
    /// Share of readings within the thresholds (0-100)
    pub percentage: f64,
    /// Share of readings above the hyperglycemia threshold (0-100)
    pub above_percentage: f64,
    /// Share of readings below the hypoglycemia threshold (0-100)
    pub below_percentage: f64,
    pub in_range_count: usize,
    pub above_count: usize,
    pub below_count: usize,
    pub total: usize,
}

/// Variability band derived from the coefficient of variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariabilityClass {
    Low,
    Moderate,
    High,
}

impl VariabilityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariabilityClass::Low => "low",
            VariabilityClass::Moderate => "moderate",
            VariabilityClass::High => "high",
        }
    }
}

/// Spread of readings around the mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variability {
    /// Population standard deviation (mg/dL)
    pub std_dev: f64,
    /// std_dev / mean * 100
    pub coefficient_of_variation: f64,
    pub classification: VariabilityClass,
}

/// Direction of the least-squares trend line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Stable => "stable",
        }
    }
}

/// Linear trend of glucose over the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// mg/dL per day
    pub slope_per_day: f64,
    /// mg/dL per week
    pub slope_per_week: f64,
    pub direction: TrendDirection,
    /// Chronologically first reading value
    pub first_value: f64,
    /// Chronologically last reading value
    pub last_value: f64,
}

/// Count and mean of readings within one bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub count: usize,
    pub average: Option<f64>,
}

/// Readings grouped by time of day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayBreakdown {
    pub morning: BucketStats,
    pub afternoon: BucketStats,
    pub evening: BucketStats,
    pub night: BucketStats,
}

impl TimeOfDayBreakdown {
    pub fn get(&self, bucket: TimeOfDay) -> &BucketStats {
        match bucket {
            TimeOfDay::Morning => &self.morning,
            TimeOfDay::Afternoon => &self.afternoon,
            TimeOfDay::Evening => &self.evening,
            TimeOfDay::Night => &self.night,
        }
    }

    pub fn get_mut(&mut self, bucket: TimeOfDay) -> &mut BucketStats {
        match bucket {
            TimeOfDay::Morning => &mut self.morning,
            TimeOfDay::Afternoon => &mut self.afternoon,
            TimeOfDay::Evening => &mut self.evening,
            TimeOfDay::Night => &mut self.night,
        }
    }

    /// Buckets in chronological order of the day
    pub fn iter(&self) -> impl Iterator<Item = (TimeOfDay, &BucketStats)> {
        [
            (TimeOfDay::Morning, &self.morning),
            (TimeOfDay::Afternoon, &self.afternoon),
            (TimeOfDay::Evening, &self.evening),
            (TimeOfDay::Night, &self.night),
        ]
        .into_iter()
    }
}

/// Per-type share of readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingTypeStats {
    pub count: usize,
    /// Share of all readings (0-100, 1 decimal)
    pub percentage: f64,
    pub average: f64,
}

/// Risk classification for out-of-range excursions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

/// Detected glucose patterns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patterns {
    pub consistently_high: bool,
    pub consistently_low: bool,
    pub high_variability: bool,
    pub post_meal_spikes: bool,
    pub hypoglycemia_risk: RiskLevel,
    pub hyperglycemia_risk: RiskLevel,
}

/// Recommended target range with its rationale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseGoals {
    pub target: String,
    pub reasoning: String,
}

/// Complete output of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub has_data: bool,
    pub total_readings: usize,
    /// Distinct local days with at least one reading
    pub days_analyzed: usize,
    /// Requested analysis window
    pub window_days: u32,
    pub date_range: Option<DateRange>,
    pub averages: Averages,
    pub ranges: Option<GlucoseRange>,
    pub time_in_range: Option<TimeInRange>,
    pub variability: Option<Variability>,
    pub trend: Option<Trend>,
    pub time_of_day: TimeOfDayBreakdown,
    pub reading_types: BTreeMap<ReadingType, ReadingTypeStats>,
    pub patterns: Patterns,
    pub insights: Vec<String>,
    pub concerns: Vec<String>,
    pub glucose_goals: Option<GlucoseGoals>,
}

impl AnalysisResult {
    /// Result for a window without any readings
    pub fn empty(window_days: u32) -> Self {
        Self {
            has_data: false,
            total_readings: 0,
            days_analyzed: 0,
            window_days,
            date_range: None,
            averages: Averages::default(),
            ranges: None,
            time_in_range: None,
            variability: None,
            trend: None,
            time_of_day: TimeOfDayBreakdown::default(),
            reading_types: BTreeMap::new(),
            patterns: Patterns::default(),
            insights: Vec::new(),
            concerns: Vec::new(),
            glucose_goals: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Night);
    }

    #[test]
    fn test_reading_type_serialization() {
        let json = serde_json::to_string(&ReadingType::BeforeMeal).unwrap();
        assert_eq!(json, "\"before_meal\"");

        let parsed: ReadingType = serde_json::from_str("\"post_meal\"").unwrap();
        assert_eq!(parsed, ReadingType::PostMeal);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::High > RiskLevel::Moderate);
        assert!(RiskLevel::Moderate > RiskLevel::Low);
        assert!(RiskLevel::Low > RiskLevel::None);
    }

    #[test]
    fn test_empty_result_serializes_reading_types_as_map() {
        let result = AnalysisResult::empty(30);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["has_data"], false);
        assert!(value["reading_types"].as_object().unwrap().is_empty());
        assert!(value["averages"]["overall"].is_null());
    }
}
