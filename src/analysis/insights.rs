//! Natural-language insights, concerns and target recommendations
//!
//! Each message is gated by a single condition and appended in the order the
//! checks run, so output order is stable for identical input.

use crate::analysis::patterns::post_meal_delta;
use crate::config::AnalysisConfig;
use crate::types::{
    AnalysisResult, GlucoseGoals, Patterns, RiskLevel, TrendDirection, VariabilityClass,
};

/// Recommended fasting band (mg/dL)
const FASTING_TARGET_LOW: f64 = 80.0;
const FASTING_TARGET_HIGH: f64 = 130.0;

/// Insight and concern lists for one analysis
#[derive(Debug, Default)]
pub struct Findings {
    pub insights: Vec<String>,
    pub concerns: Vec<String>,
}

/// Generate insights and concerns from a result whose statistics are filled in
pub fn generate_findings(result: &AnalysisResult, config: &AnalysisConfig) -> Findings {
    let mut findings = Findings::default();
    if !result.has_data {
        return findings;
    }

    let hypo = config.hypo_threshold;
    let hyper = config.hyper_threshold;

    if let Some(tir) = &result.time_in_range {
        if tir.percentage >= config.target_time_in_range {
            findings.insights.push(format!(
                "{:.1}% of your readings are within your target range of {:.0}-{:.0} mg/dL.",
                tir.percentage, hypo, hyper
            ));
        } else {
            findings.concerns.push(format!(
                "Only {:.1}% of your readings are within your target range of {:.0}-{:.0} mg/dL (aim for at least {:.0}%).",
                tir.percentage, hypo, hyper, config.target_time_in_range
            ));
        }
    }

    if let Some(fasting) = result.averages.fasting {
        if fasting > FASTING_TARGET_HIGH {
            findings.concerns.push(format!(
                "Your average fasting glucose of {:.1} mg/dL is above the recommended {:.0}-{:.0} mg/dL.",
                fasting, FASTING_TARGET_LOW, FASTING_TARGET_HIGH
            ));
        } else if fasting >= FASTING_TARGET_LOW {
            findings.insights.push(format!(
                "Your average fasting glucose of {:.1} mg/dL is within the recommended {:.0}-{:.0} mg/dL.",
                fasting, FASTING_TARGET_LOW, FASTING_TARGET_HIGH
            ));
        } else {
            findings.concerns.push(format!(
                "Your average fasting glucose of {:.1} mg/dL is below the recommended {:.0}-{:.0} mg/dL.",
                fasting, FASTING_TARGET_LOW, FASTING_TARGET_HIGH
            ));
        }
    }

    if let Some(variability) = &result.variability {
        match variability.classification {
            VariabilityClass::Low => findings.insights.push(format!(
                "Your glucose levels are stable with low variability (CV {:.1}%).",
                variability.coefficient_of_variation
            )),
            VariabilityClass::High => findings.concerns.push(format!(
                "Your glucose levels swing widely (CV {:.1}%, above the {:.0}% stability target).",
                variability.coefficient_of_variation, config.high_variability_cv
            )),
            VariabilityClass::Moderate => {}
        }
    }

    if let (Some(trend), Some(overall)) = (&result.trend, result.averages.overall) {
        let weekly = trend.slope_per_week.abs();
        match trend.direction {
            TrendDirection::Rising if overall >= hypo => findings.concerns.push(format!(
                "Your glucose is trending up by {:.1} mg/dL per week.",
                weekly
            )),
            TrendDirection::Rising => findings.insights.push(format!(
                "Your glucose is recovering from low levels, rising {:.1} mg/dL per week.",
                weekly
            )),
            TrendDirection::Falling if overall > hypo => findings.insights.push(format!(
                "Your glucose is trending down by {:.1} mg/dL per week.",
                weekly
            )),
            TrendDirection::Falling => findings.concerns.push(format!(
                "Your glucose is still falling ({:.1} mg/dL per week) while already averaging below {:.0} mg/dL.",
                weekly, hypo
            )),
            TrendDirection::Stable => findings
                .insights
                .push("Your glucose levels have been steady over this period.".to_string()),
        }
    }

    let patterns = &result.patterns;
    if let Some(tir) = &result.time_in_range {
        if patterns.consistently_high {
            findings.concerns.push(format!(
                "{:.1}% of your readings are above {:.0} mg/dL.",
                tir.above_percentage, hyper
            ));
        }
        if patterns.consistently_low {
            findings.concerns.push(format!(
                "{:.1}% of your readings are below {:.0} mg/dL. Discuss these lows with your healthcare provider.",
                tir.below_percentage, hypo
            ));
        }
    }

    if patterns.post_meal_spikes {
        let message = match (post_meal_delta(&result.averages), result.averages.post_meal) {
            (Some(delta), _) => format!(
                "Your post-meal readings average {:.1} mg/dL higher than your pre-meal readings. Smaller portions or lower-glycemic carbohydrates may help.",
                delta
            ),
            (None, Some(post)) => format!(
                "Your post-meal readings average {:.1} mg/dL. Smaller portions or lower-glycemic carbohydrates may help.",
                post
            ),
            (None, None) => "Your post-meal readings are elevated.".to_string(),
        };
        findings.concerns.push(message);
    }

    if let Some(range) = &result.ranges {
        if patterns.hypoglycemia_risk == RiskLevel::High {
            findings.concerns.push(format!(
                "High risk of hypoglycemia: your lowest reading was {:.1} mg/dL.",
                range.min
            ));
        }
        if patterns.hyperglycemia_risk == RiskLevel::High {
            findings.concerns.push(format!(
                "High risk of hyperglycemia: your highest reading was {:.1} mg/dL.",
                range.max
            ));
        }
    }

    let populated: Vec<_> = result
        .time_of_day
        .iter()
        .filter_map(|(bucket, stats)| stats.average.map(|avg| (bucket, avg)))
        .collect();
    if populated.len() >= 2 {
        let mut peak = populated[0];
        for candidate in &populated[1..] {
            if candidate.1 > peak.1 {
                peak = *candidate;
            }
        }
        findings.insights.push(format!(
            "Your highest readings tend to occur in the {} (average {:.1} mg/dL).",
            peak.0.as_str(),
            peak.1
        ));
    }

    if result.total_readings < config.min_readings_for_confidence {
        findings.insights.push(format!(
            "Log at least {} readings for a more reliable analysis.",
            config.min_readings_for_confidence
        ));
    }

    findings
}

/// Pick a target-range template from the detected patterns; first match wins
pub fn recommend_goals(patterns: &Patterns, config: &AnalysisConfig) -> GlucoseGoals {
    if patterns.consistently_low || patterns.hypoglycemia_risk >= RiskLevel::Moderate {
        GlucoseGoals {
            target: "80-150 mg/dL".to_string(),
            reasoning: "Frequent low readings call for a slightly higher target to reduce the risk of hypoglycemia.".to_string(),
        }
    } else if patterns.high_variability {
        GlucoseGoals {
            target: "80-160 mg/dL".to_string(),
            reasoning: "Large swings between readings; focus on steadier levels before tightening the target.".to_string(),
        }
    } else if patterns.consistently_high {
        GlucoseGoals {
            target: "80-180 mg/dL".to_string(),
            reasoning: "Many readings are above range; bring them into this interim range first, then work toward a tighter target.".to_string(),
        }
    } else {
        GlucoseGoals {
            target: format!(
                "{:.0}-{:.0} mg/dL",
                config.hypo_threshold, config.hyper_threshold
            ),
            reasoning: "Most readings are within range; keep the current target.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Averages, GlucoseRange, TimeInRange, Trend};

    fn in_range_result() -> AnalysisResult {
        let mut result = AnalysisResult::empty(30);
        result.has_data = true;
        result.total_readings = 10;
        result.averages = Averages {
            fasting: Some(100.0),
            overall: Some(100.0),
            ..Default::default()
        };
        result.time_in_range = Some(TimeInRange {
            percentage: 100.0,
            above_percentage: 0.0,
            below_percentage: 0.0,
            in_range_count: 10,
            above_count: 0,
            below_count: 0,
            total: 10,
        });
        result
    }

    #[test]
    fn test_no_findings_without_data() {
        let findings = generate_findings(&AnalysisResult::empty(30), &AnalysisConfig::default());
        assert!(findings.insights.is_empty());
        assert!(findings.concerns.is_empty());
    }

    #[test]
    fn test_in_range_order() {
        let findings = generate_findings(&in_range_result(), &AnalysisConfig::default());
        assert!(findings.concerns.is_empty());
        assert_eq!(findings.insights.len(), 2);
        assert!(findings.insights[0].starts_with("100.0% of your readings"));
        assert!(findings.insights[1].contains("fasting glucose of 100.0"));
    }

    #[test]
    fn test_low_time_in_range_is_concern() {
        let mut result = in_range_result();
        result.time_in_range = Some(TimeInRange {
            percentage: 50.0,
            above_percentage: 50.0,
            below_percentage: 0.0,
            in_range_count: 5,
            above_count: 5,
            below_count: 0,
            total: 10,
        });
        result.patterns.consistently_high = true;

        let findings = generate_findings(&result, &AnalysisConfig::default());
        assert!(findings.concerns[0].starts_with("Only 50.0%"));
        assert!(findings.concerns[1].starts_with("50.0% of your readings are above 140"));
    }

    fn falling(overall: f64) -> AnalysisResult {
        let mut result = in_range_result();
        result.averages.fasting = None;
        result.averages.overall = Some(overall);
        result.trend = Some(Trend {
            slope_per_day: -1.5,
            slope_per_week: -10.5,
            direction: TrendDirection::Falling,
            first_value: overall + 10.0,
            last_value: overall - 10.0,
        });
        result
    }

    #[test]
    fn test_falling_trend_above_hypo_is_insight() {
        let findings = generate_findings(&falling(120.0), &AnalysisConfig::default());
        assert!(findings
            .insights
            .contains(&"Your glucose is trending down by 10.5 mg/dL per week.".to_string()));
        assert!(!findings.concerns.iter().any(|c| c.contains("falling")));
    }

    #[test]
    fn test_falling_trend_below_hypo_is_concern() {
        let findings = generate_findings(&falling(65.0), &AnalysisConfig::default());
        assert!(findings.concerns.contains(
            &"Your glucose is still falling (10.5 mg/dL per week) while already averaging below 70 mg/dL."
                .to_string()
        ));
        assert!(!findings.insights.iter().any(|i| i.contains("trending down")));
    }

    #[test]
    fn test_low_fasting_between_hypo_and_target_is_concern() {
        let mut result = in_range_result();
        result.averages.fasting = Some(75.0);

        let findings = generate_findings(&result, &AnalysisConfig::default());
        assert_eq!(findings.insights.len(), 1);
        assert_eq!(
            findings.concerns,
            vec!["Your average fasting glucose of 75.0 mg/dL is below the recommended 80-130 mg/dL."]
        );
    }

    #[test]
    fn test_high_hyper_risk_concern() {
        let mut result = in_range_result();
        result.ranges = Some(GlucoseRange { min: 95.0, max: 287.0 });
        result.patterns.hyperglycemia_risk = RiskLevel::High;

        let findings = generate_findings(&result, &AnalysisConfig::default());
        assert_eq!(
            findings.concerns,
            vec!["High risk of hyperglycemia: your highest reading was 287.0 mg/dL."]
        );
    }

    #[test]
    fn test_goal_templates() {
        let config = AnalysisConfig::default();
        assert_eq!(recommend_goals(&Patterns::default(), &config).target, "70-140 mg/dL");

        let low = Patterns {
            consistently_low: true,
            high_variability: true,
            ..Default::default()
        };
        assert_eq!(recommend_goals(&low, &config).target, "80-150 mg/dL");

        let swings = Patterns {
            high_variability: true,
            consistently_high: true,
            ..Default::default()
        };
        assert_eq!(recommend_goals(&swings, &config).target, "80-160 mg/dL");

        let high = Patterns {
            consistently_high: true,
            hypoglycemia_risk: RiskLevel::Low,
            ..Default::default()
        };
        assert_eq!(recommend_goals(&high, &config).target, "80-180 mg/dL");
    }
}
