//! Aggregate-only reporting for integrity signals.
//!
//! Raw submissions are validated and normalized into canonical records;
//! stored records are only ever reported back as (window, type) counts with a
//! trailing baseline, a trend and a coarse review status.

pub mod aggregate;
pub mod baseline;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod normality;
pub mod report;
pub mod time;
pub mod validation;

pub use aggregate::{aggregate, aggregate_with, RecordLike};
pub use error::SignalError;
pub use models::{AggregatedStat, Granularity, SignalRecord, SignalType, Status, Trend};
pub use validation::{normalize, validate};
