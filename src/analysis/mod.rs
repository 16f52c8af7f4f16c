//! Glucose time-series analysis
//!
//! Aggregates a window of readings into averages, spread, time in range and a
//! linear trend, then layers pattern detection, natural-language findings and
//! a target-range recommendation on top.
//!
//! Pipeline: readings → window selection → statistics → patterns → findings

pub mod engine;
pub mod insights;
pub mod patterns;
pub mod statistics;

pub use engine::{analyze, GlucoseAnalyzer};
pub use insights::{generate_findings, recommend_goals, Findings};
pub use patterns::{classify_variability, detect_patterns};
