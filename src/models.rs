use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::SignalError;
use crate::time;

/// Closed catalog of signal types accepted at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    SuspiciousTimingPattern,
    RepeatedUnusualSubmissions,
    SuddenScoreSpikes,
    MultipleSubmissionsSameDevice,
}

impl SignalType {
    pub const ALL: [SignalType; 4] = [
        SignalType::SuspiciousTimingPattern,
        SignalType::RepeatedUnusualSubmissions,
        SignalType::SuddenScoreSpikes,
        SignalType::MultipleSubmissionsSameDevice,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SignalType::SuspiciousTimingPattern => "suspicious_timing_pattern",
            SignalType::RepeatedUnusualSubmissions => "repeated_unusual_submissions",
            SignalType::SuddenScoreSpikes => "sudden_score_spikes",
            SignalType::MultipleSubmissionsSameDevice => "multiple_submissions_same_device",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SignalType::SuspiciousTimingPattern => {
                "Submissions clustered in unlikely time windows."
            }
            SignalType::RepeatedUnusualSubmissions => {
                "Multiple unusual submissions within a short period."
            }
            SignalType::SuddenScoreSpikes => {
                "Abrupt increases in scores beyond typical variance."
            }
            SignalType::MultipleSubmissionsSameDevice => {
                "High volume of submissions from a single device."
            }
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|signal_type| signal_type.key() == key)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where a submission entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Form,
    Api,
    Import,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Form, Source::Api, Source::Import];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Form => "form",
            Source::Api => "api",
            Source::Import => "import",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.as_str() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// A validated, normalized signal. Only `validation::normalize` builds these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    pub signal_id: String,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub context: SignalContext,
    pub source: Source,
    pub version: i64,
}

fn serialize_timestamp<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time::format_iso8601(*value))
}

/// Bucket width used when grouping signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Day,
    Week,
}

impl FromStr for Granularity {
    type Err = SignalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            _ => Err(SignalError::InvalidArgument(
                "window must be 'day' or 'week'".to_string(),
            )),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => f.write_str("day"),
            Granularity::Week => f.write_str("week"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Normal,
    #[serde(rename = "Needs Review")]
    NeedsReview,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Normal => f.write_str("Normal"),
            Status::NeedsReview => f.write_str("Needs Review"),
        }
    }
}

/// One (window, type) cell of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedStat {
    pub window: NaiveDate,
    #[serde(rename = "type")]
    pub signal_type: String,
    pub count: u64,
    #[serde(serialize_with = "serialize_rounded")]
    pub baseline: f64,
    pub trend: Trend,
    pub status: Status,
}

fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn catalog_keys_round_trip() {
        for signal_type in SignalType::ALL {
            assert_eq!(SignalType::from_key(signal_type.key()), Some(signal_type));
        }
        assert_eq!(SignalType::from_key("made_up"), None);
    }

    #[test]
    fn granularity_rejects_unknown_window() {
        assert_eq!("day".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("week".parse::<Granularity>().unwrap(), Granularity::Week);
        let err = "month".parse::<Granularity>().unwrap_err();
        assert!(matches!(err, SignalError::InvalidArgument(_)));
    }

    #[test]
    fn record_serializes_to_external_shape() {
        let record = SignalRecord {
            signal_id: "abc".to_string(),
            signal_type: SignalType::SuddenScoreSpikes,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 8, 9, 30, 0).unwrap(),
            context: SignalContext {
                note: None,
                event_id: Some("evt-1".to_string()),
            },
            source: Source::Form,
            version: 1,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "signalId": "abc",
                "type": "sudden_score_spikes",
                "timestamp": "2026-01-08T09:30:00Z",
                "context": {"eventId": "evt-1"},
                "source": "form",
                "version": 1
            })
        );
    }

    #[test]
    fn stat_rounds_baseline_and_renames_status() {
        let stat = AggregatedStat {
            window: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            signal_type: "sudden_score_spikes".to_string(),
            count: 4,
            baseline: 4.0 / 3.0,
            trend: Trend::Steady,
            status: Status::NeedsReview,
        };
        let value = serde_json::to_value(&stat).unwrap();
        assert_eq!(value["window"], "2026-01-05");
        assert_eq!(value["baseline"], 1.33);
        assert_eq!(value["trend"], "steady");
        assert_eq!(value["status"], "Needs Review");
    }
}
