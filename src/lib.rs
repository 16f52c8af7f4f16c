//! Gluco Flux - Glucose analysis and chat delivery engine for a diabetes assistant
//!
//! Gluco Flux turns a user's blood glucose log into a structured summary
//! through a deterministic pipeline: record ingestion → validation and unit
//! normalization → statistics → pattern detection → findings and goals.
//!
//! ## Modules
//!
//! - **Analysis**: Averages, time in range, variability, trend, patterns and goals
//! - **Messaging**: Chunk long replies, convert markdown to chat HTML and deliver them paced

pub mod analysis;
pub mod config;
pub mod error;
pub mod messaging;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use analysis::{analyze, GlucoseAnalyzer};
pub use config::{AnalysisConfig, DispatchConfig, GlucoFluxConfig};
pub use error::{ComputeError, ConfigError, DispatchError, TransportError};
pub use pipeline::{readings_to_analysis, GlucoseProcessor};
pub use types::{AnalysisResult, GlucoseReading, ReadingType};

// Schema exports
pub use schema::{ReadingRecord, ReadingRecordAdapter, SCHEMA_VERSION};

// Messaging exports
pub use messaging::{markdown_to_html, split, ChatTransport, Dispatcher, StreamingDispatcher};

/// Library version reported by the CLI and FFI
pub const GLUCO_FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in CLI reports
pub const PRODUCER_NAME: &str = "gluco-flux";
