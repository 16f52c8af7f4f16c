//! Pattern and risk detection
//!
//! Turns aggregate statistics into boolean pattern flags and graded risk
//! levels. Every cutoff comes from [`AnalysisConfig`].

use crate::config::AnalysisConfig;
use crate::types::{
    Averages, GlucoseRange, Patterns, RiskLevel, TimeInRange, Variability, VariabilityClass,
};

/// Below-range share (%) above which hypoglycemia risk is high
const HYPO_HIGH_RISK_PERCENTAGE: f64 = 10.0;
/// Below-range share (%) above which hypoglycemia risk is moderate
const HYPO_MODERATE_RISK_PERCENTAGE: f64 = 4.0;
/// Above-range share (%) above which hyperglycemia risk is high
const HYPER_HIGH_RISK_PERCENTAGE: f64 = 50.0;
/// Above-range share (%) above which hyperglycemia risk is moderate
const HYPER_MODERATE_RISK_PERCENTAGE: f64 = 25.0;

/// Band a coefficient of variation: below the low cutoff is low, above the
/// high cutoff is high, anything in between (inclusive) is moderate.
pub fn classify_variability(cv: f64, config: &AnalysisConfig) -> VariabilityClass {
    if cv < config.low_variability_cv {
        VariabilityClass::Low
    } else if cv <= config.high_variability_cv {
        VariabilityClass::Moderate
    } else {
        VariabilityClass::High
    }
}

/// Detect patterns from the aggregated statistics of a non-empty window
pub fn detect_patterns(
    averages: &Averages,
    range: &GlucoseRange,
    tir: &TimeInRange,
    variability: &Variability,
    config: &AnalysisConfig,
) -> Patterns {
    Patterns {
        consistently_high: tir.above_percentage > config.high_readings_percentage,
        consistently_low: tir.below_percentage > config.low_readings_percentage,
        high_variability: variability.classification == VariabilityClass::High,
        post_meal_spikes: has_post_meal_spikes(averages, config),
        hypoglycemia_risk: hypoglycemia_risk(tir, range, config),
        hyperglycemia_risk: hyperglycemia_risk(tir, range, config),
    }
}

/// Post-meal minus pre-meal delta in mg/dL.
///
/// The pre-meal reference is the before-meal average, falling back to fasting.
pub fn post_meal_delta(averages: &Averages) -> Option<f64> {
    let post = averages.post_meal?;
    let pre = averages.before_meal.or(averages.fasting)?;
    Some(post - pre)
}

fn has_post_meal_spikes(averages: &Averages, config: &AnalysisConfig) -> bool {
    match (post_meal_delta(averages), averages.post_meal) {
        (Some(delta), _) => delta > config.post_meal_spike_delta,
        (None, Some(post)) => post > config.post_meal_ceiling,
        (None, None) => false,
    }
}

fn hypoglycemia_risk(tir: &TimeInRange, range: &GlucoseRange, config: &AnalysisConfig) -> RiskLevel {
    if tir.below_count == 0 {
        RiskLevel::None
    } else if range.min < config.severe_hypo_threshold
        || tir.below_percentage > HYPO_HIGH_RISK_PERCENTAGE
    {
        RiskLevel::High
    } else if tir.below_percentage > HYPO_MODERATE_RISK_PERCENTAGE {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

fn hyperglycemia_risk(
    tir: &TimeInRange,
    range: &GlucoseRange,
    config: &AnalysisConfig,
) -> RiskLevel {
    if tir.above_count == 0 {
        RiskLevel::None
    } else if range.max > config.severe_hyper_threshold
        || tir.above_percentage > HYPER_HIGH_RISK_PERCENTAGE
    {
        RiskLevel::High
    } else if tir.above_percentage > HYPER_MODERATE_RISK_PERCENTAGE {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tir(in_range: usize, above: usize, below: usize) -> TimeInRange {
        let total = in_range + above + below;
        let pct = |c: usize| crate::analysis::statistics::percentage(c, total);
        TimeInRange {
            percentage: pct(in_range),
            above_percentage: pct(above),
            below_percentage: pct(below),
            in_range_count: in_range,
            above_count: above,
            below_count: below,
            total,
        }
    }

    fn variability(class: VariabilityClass) -> Variability {
        Variability {
            std_dev: 10.0,
            coefficient_of_variation: 10.0,
            classification: class,
        }
    }

    #[test]
    fn test_variability_bands() {
        let config = AnalysisConfig::default();
        assert_eq!(classify_variability(12.0, &config), VariabilityClass::Low);
        assert_eq!(classify_variability(20.0, &config), VariabilityClass::Moderate);
        assert_eq!(classify_variability(36.0, &config), VariabilityClass::Moderate);
        assert_eq!(classify_variability(36.1, &config), VariabilityClass::High);
    }

    #[test]
    fn test_consistently_high() {
        let config = AnalysisConfig::default();
        let range = GlucoseRange { min: 90.0, max: 200.0 };
        let patterns = detect_patterns(
            &Averages::default(),
            &range,
            &tir(6, 4, 0),
            &variability(VariabilityClass::Moderate),
            &config,
        );
        assert!(patterns.consistently_high);
        assert!(!patterns.consistently_low);
        assert_eq!(patterns.hyperglycemia_risk, RiskLevel::Moderate);
        assert_eq!(patterns.hypoglycemia_risk, RiskLevel::None);
    }

    #[test]
    fn test_severe_low_is_high_risk() {
        let config = AnalysisConfig::default();
        let range = GlucoseRange { min: 50.0, max: 120.0 };
        let patterns = detect_patterns(
            &Averages::default(),
            &range,
            &tir(49, 0, 1),
            &variability(VariabilityClass::Low),
            &config,
        );
        assert_eq!(patterns.hypoglycemia_risk, RiskLevel::High);
        assert!(!patterns.consistently_low);
    }

    #[test]
    fn test_mild_lows_are_low_risk() {
        let config = AnalysisConfig::default();
        let range = GlucoseRange { min: 66.0, max: 120.0 };
        let patterns = detect_patterns(
            &Averages::default(),
            &range,
            &tir(49, 0, 1),
            &variability(VariabilityClass::Low),
            &config,
        );
        assert_eq!(patterns.hypoglycemia_risk, RiskLevel::Low);
    }

    #[test]
    fn test_hypo_moderate_band() {
        let config = AnalysisConfig::default();
        let range = GlucoseRange { min: 62.0, max: 120.0 };
        // 2 of 25 = 8%
        let moderate = hypoglycemia_risk(&tir(23, 0, 2), &range, &config);
        assert_eq!(moderate, RiskLevel::Moderate);
        // 1 of 25 = 4%, not above the moderate cutoff
        assert_eq!(hypoglycemia_risk(&tir(24, 0, 1), &range, &config), RiskLevel::Low);
        // 3 of 25 = 12%
        assert_eq!(hypoglycemia_risk(&tir(22, 0, 3), &range, &config), RiskLevel::High);
    }

    #[test]
    fn test_hyper_high_risk() {
        let config = AnalysisConfig::default();
        let mild = GlucoseRange { min: 90.0, max: 200.0 };
        assert_eq!(hyperglycemia_risk(&tir(4, 6, 0), &mild, &config), RiskLevel::High);
        assert_eq!(hyperglycemia_risk(&tir(5, 5, 0), &mild, &config), RiskLevel::Moderate);
        assert_eq!(hyperglycemia_risk(&tir(9, 1, 0), &mild, &config), RiskLevel::Low);

        let severe = GlucoseRange { min: 90.0, max: 280.0 };
        assert_eq!(hyperglycemia_risk(&tir(9, 1, 0), &severe, &config), RiskLevel::High);
    }

    #[test]
    fn test_post_meal_spikes_against_before_meal() {
        let config = AnalysisConfig::default();
        let averages = Averages {
            before_meal: Some(110.0),
            fasting: Some(90.0),
            post_meal: Some(170.0),
            ..Default::default()
        };
        // before-meal wins over fasting: 170 - 110 = 60 > 50
        assert_eq!(post_meal_delta(&averages), Some(60.0));
        assert!(has_post_meal_spikes(&averages, &config));

        let calm = Averages {
            before_meal: Some(130.0),
            post_meal: Some(170.0),
            ..Default::default()
        };
        assert!(!has_post_meal_spikes(&calm, &config));
    }

    #[test]
    fn test_post_meal_spikes_without_reference() {
        let config = AnalysisConfig::default();
        let averages = Averages {
            post_meal: Some(190.0),
            ..Default::default()
        };
        assert_eq!(post_meal_delta(&averages), None);
        assert!(has_post_meal_spikes(&averages, &config));
    }
}
