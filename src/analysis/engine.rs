//! Glucose analysis engine
//!
//! Computes the full [`AnalysisResult`] for a window of readings:
//! partitioning → averages and spread → range → time in range → trend →
//! patterns → insights → goal recommendation.

use crate::analysis::insights::{generate_findings, recommend_goals};
use crate::analysis::patterns::{classify_variability, detect_patterns};
use crate::analysis::statistics::{
    coefficient_of_variation, least_squares_slope, mean, percentage, population_std_dev, round_to,
};
use crate::config::AnalysisConfig;
use crate::types::{
    AnalysisResult, Averages, BucketStats, DateRange, GlucoseRange, GlucoseReading, ReadingType,
    ReadingTypeStats, TimeInRange, TimeOfDay, TimeOfDayBreakdown, Trend, TrendDirection, Variability,
};
use chrono::Duration;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Analyzer bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct GlucoseAnalyzer {
    config: AnalysisConfig,
}

impl GlucoseAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze readings over the configured default window
    pub fn analyze(&self, readings: &[GlucoseReading]) -> AnalysisResult {
        analyze(readings, self.config.window_days, &self.config)
    }

    /// Analyze readings over an explicit window
    pub fn analyze_window(&self, readings: &[GlucoseReading], window_days: u32) -> AnalysisResult {
        analyze(readings, window_days, &self.config)
    }
}

/// Analyze a set of glucose readings.
///
/// Readings are sorted by time and limited to the `window_days` preceding the
/// most recent reading (`0` keeps everything). An empty window produces
/// [`AnalysisResult::empty`]; this function never fails.
pub fn analyze(
    readings: &[GlucoseReading],
    window_days: u32,
    config: &AnalysisConfig,
) -> AnalysisResult {
    let window = select_window(readings, window_days);
    if window.is_empty() {
        debug!(window_days, "no glucose readings in window");
        return AnalysisResult::empty(window_days);
    }

    let values: Vec<f64> = window.iter().map(|r| r.value).collect();
    let total = values.len();

    let averages = compute_averages(&window, &values);
    let ranges = compute_range(&values);
    let time_in_range = compute_time_in_range(&values, config);
    let variability = compute_variability(&values, config);
    let trend = compute_trend(&window, config);
    let time_of_day = compute_time_of_day(&window);
    let reading_types = compute_reading_types(&window);
    let patterns = detect_patterns(&averages, &ranges, &time_in_range, &variability, config);

    let days: BTreeSet<_> = window.iter().map(|r| r.local_date()).collect();
    let date_range = match (window.first(), window.last()) {
        (Some(first), Some(last)) => Some(DateRange {
            start: first.local_date(),
            end: last.local_date(),
        }),
        _ => None,
    };

    let glucose_goals = recommend_goals(&patterns, config);

    let mut result = AnalysisResult {
        has_data: true,
        total_readings: total,
        days_analyzed: days.len(),
        window_days,
        date_range,
        averages,
        ranges: Some(ranges),
        time_in_range: Some(time_in_range),
        variability: Some(variability),
        trend,
        time_of_day,
        reading_types,
        patterns,
        insights: Vec::new(),
        concerns: Vec::new(),
        glucose_goals: Some(glucose_goals),
    };

    let findings = generate_findings(&result, config);
    result.insights = findings.insights;
    result.concerns = findings.concerns;

    debug!(
        total_readings = result.total_readings,
        days_analyzed = result.days_analyzed,
        overall_average = ?result.averages.overall,
        insights = result.insights.len(),
        concerns = result.concerns.len(),
        "glucose analysis complete"
    );

    result
}

/// Sort chronologically and keep readings within the window ending at the latest one
fn select_window(readings: &[GlucoseReading], window_days: u32) -> Vec<GlucoseReading> {
    let mut sorted: Vec<GlucoseReading> = readings.to_vec();
    sorted.sort_by_key(|r| r.measured_at);

    if window_days == 0 {
        return sorted;
    }

    match sorted.last().map(|r| r.measured_at) {
        Some(latest) => {
            let cutoff = latest - Duration::days(i64::from(window_days));
            sorted.retain(|r| r.measured_at >= cutoff);
            sorted
        }
        None => sorted,
    }
}

fn compute_averages(window: &[GlucoseReading], values: &[f64]) -> Averages {
    let type_mean = |reading_type: ReadingType| {
        let typed: Vec<f64> = window
            .iter()
            .filter(|r| r.reading_type == reading_type)
            .map(|r| r.value)
            .collect();
        mean(&typed).map(|m| round_to(m, 1))
    };

    Averages {
        fasting: type_mean(ReadingType::Fasting),
        before_meal: type_mean(ReadingType::BeforeMeal),
        post_meal: type_mean(ReadingType::PostMeal),
        random: type_mean(ReadingType::Random),
        overall: mean(values).map(|m| round_to(m, 1)),
    }
}

fn compute_range(values: &[f64]) -> GlucoseRange {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    GlucoseRange { min, max }
}

fn compute_time_in_range(values: &[f64], config: &AnalysisConfig) -> TimeInRange {
    let (mut below_count, mut above_count, mut in_range_count) = (0, 0, 0);
    // Each value lands in exactly one bucket, even with inverted thresholds
    for v in values {
        if *v < config.hypo_threshold {
            below_count += 1;
        } else if *v > config.hyper_threshold {
            above_count += 1;
        } else {
            in_range_count += 1;
        }
    }
    let total = values.len();

    TimeInRange {
        percentage: percentage(in_range_count, total),
        above_percentage: percentage(above_count, total),
        below_percentage: percentage(below_count, total),
        in_range_count,
        above_count,
        below_count,
        total,
    }
}

fn compute_variability(values: &[f64], config: &AnalysisConfig) -> Variability {
    let std_dev = population_std_dev(values).unwrap_or(0.0);
    let mu = mean(values).unwrap_or(0.0);
    let cv = coefficient_of_variation(std_dev, mu);

    Variability {
        std_dev: round_to(std_dev, 1),
        coefficient_of_variation: round_to(cv, 1),
        classification: classify_variability(cv, config),
    }
}

/// Least-squares trend of value against fractional days since the first reading
fn compute_trend(window: &[GlucoseReading], config: &AnalysisConfig) -> Option<Trend> {
    let first = window.first()?;
    let last = window.last()?;

    let points: Vec<(f64, f64)> = window
        .iter()
        .map(|r| {
            let offset = (r.measured_at - first.measured_at).num_seconds() as f64 / SECONDS_PER_DAY;
            (offset, r.value)
        })
        .collect();

    let slope = least_squares_slope(&points)?;
    let direction = if slope.abs() < config.trend_stable_slope {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Rising
    } else {
        TrendDirection::Falling
    };

    Some(Trend {
        slope_per_day: round_to(slope, 2),
        slope_per_week: round_to(slope * 7.0, 2),
        direction,
        first_value: first.value,
        last_value: last.value,
    })
}

fn compute_time_of_day(window: &[GlucoseReading]) -> TimeOfDayBreakdown {
    let mut breakdown = TimeOfDayBreakdown::default();
    for bucket in TimeOfDay::ALL {
        let values: Vec<f64> = window
            .iter()
            .filter(|r| r.time_of_day() == bucket)
            .map(|r| r.value)
            .collect();
        *breakdown.get_mut(bucket) = BucketStats {
            count: values.len(),
            average: mean(&values).map(|m| round_to(m, 1)),
        };
    }
    breakdown
}

fn compute_reading_types(window: &[GlucoseReading]) -> BTreeMap<ReadingType, ReadingTypeStats> {
    let total = window.len();
    let mut stats = BTreeMap::new();

    for reading_type in ReadingType::ALL {
        let typed: Vec<f64> = window
            .iter()
            .filter(|r| r.reading_type == reading_type)
            .map(|r| r.value)
            .collect();
        if let Some(avg) = mean(&typed) {
            stats.insert(
                reading_type,
                ReadingTypeStats {
                    count: typed.len(),
                    percentage: percentage(typed.len(), total),
                    average: round_to(avg, 1),
                },
            );
        }
    }
    stats
}
