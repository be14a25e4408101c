//! Group-only aggregation: (window, type) counts with baseline, trend and
//! review status. Nothing here can point back at an individual record.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde_json::Value;
use tracing::debug;

use crate::baseline::{compute_trend, trailing_baselines};
use crate::config::AnalysisConfig;
use crate::error::SignalError;
use crate::models::{AggregatedStat, Granularity, SignalRecord};
use crate::normality::evaluate_normality;
use crate::time;

/// The two fields aggregation reads from a stored record.
pub trait RecordLike {
    fn signal_type(&self) -> Option<&str>;
    fn occurred_at(&self) -> Option<DateTime<Utc>>;
}

impl RecordLike for Value {
    fn signal_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str).filter(|key| !key.is_empty())
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.get("timestamp")
            .and_then(Value::as_str)
            .and_then(time::parse_iso8601)
    }
}

impl RecordLike for SignalRecord {
    fn signal_type(&self) -> Option<&str> {
        Some(self.signal_type.key())
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        Some(self.timestamp)
    }
}

pub fn window_key(timestamp: DateTime<Utc>, granularity: Granularity) -> NaiveDate {
    let date = timestamp.date_naive();
    match granularity {
        Granularity::Day => date,
        Granularity::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
    }
}

/// Per-cell counts plus the sorted axes they span.
#[derive(Debug, Default)]
pub struct WindowCounts {
    pub windows: BTreeSet<NaiveDate>,
    pub types: BTreeSet<String>,
    counts: HashMap<(NaiveDate, String), u64>,
    pub skipped: usize,
}

impl WindowCounts {
    pub fn get(&self, window: NaiveDate, signal_type: &str) -> u64 {
        self.counts
            .get(&(window, signal_type.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Counts for one type across every observed window, oldest first.
    pub fn series(&self, signal_type: &str) -> Vec<u64> {
        self.windows
            .iter()
            .map(|window| self.get(*window, signal_type))
            .collect()
    }
}

/// Buckets records into (window, type) cells. Malformed records are skipped.
pub fn count_by_window<R: RecordLike>(records: &[R], granularity: Granularity) -> WindowCounts {
    let mut counts = WindowCounts::default();

    for record in records {
        let (Some(signal_type), Some(occurred_at)) = (record.signal_type(), record.occurred_at())
        else {
            counts.skipped += 1;
            continue;
        };

        let window = window_key(occurred_at, granularity);
        *counts
            .counts
            .entry((window, signal_type.to_string()))
            .or_insert(0) += 1;
        counts.windows.insert(window);
        counts.types.insert(signal_type.to_string());
    }

    if counts.skipped > 0 {
        debug!(skipped = counts.skipped, "skipped malformed records during aggregation");
    }

    counts
}

/// Aggregates with the default thresholds. `window` must be `day` or `week`.
pub fn aggregate<R: RecordLike>(records: &[R], window: &str) -> Result<Vec<AggregatedStat>, SignalError> {
    let granularity: Granularity = window.parse()?;
    Ok(aggregate_with(records, granularity, &AnalysisConfig::default()))
}

/// Stats sorted by type, then window. Each type is baselined on its own series.
pub fn aggregate_with<R: RecordLike>(
    records: &[R],
    granularity: Granularity,
    config: &AnalysisConfig,
) -> Vec<AggregatedStat> {
    let counts = count_by_window(records, granularity);
    let mut results = Vec::with_capacity(counts.windows.len() * counts.types.len());

    for signal_type in &counts.types {
        let series = counts.series(signal_type);
        let baselines = trailing_baselines(&series, config.baseline_windows);

        for ((window, count), baseline) in counts.windows.iter().zip(series).zip(baselines) {
            results.push(AggregatedStat {
                window: *window,
                signal_type: signal_type.clone(),
                count,
                baseline,
                trend: compute_trend(count, baseline, config),
                status: evaluate_normality(count, baseline, config),
            });
        }
    }

    debug!(
        %granularity,
        windows = counts.windows.len(),
        types = counts.types.len(),
        cells = results.len(),
        "aggregated signals"
    );

    results
}
