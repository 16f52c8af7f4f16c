//! glucose.reading.v1 ingestion schema
//!
//! Defines the wire format readings arrive in, its validation rules and the
//! adapter that turns a batch of records into normalized engine readings.

mod adapter;
mod reading_record;

pub use adapter::*;
pub use reading_record::*;
