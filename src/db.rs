use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::aggregate::RecordLike;
use crate::models::SignalRecord;
use crate::time::Clock;
use crate::validation;

/// The slice of a stored row that aggregation needs.
#[derive(Debug, Clone)]
pub struct StoredSignal {
    pub signal_type: String,
    pub occurred_at: DateTime<Utc>,
}

impl RecordLike for StoredSignal {
    fn signal_type(&self) -> Option<&str> {
        Some(self.signal_type.as_str()).filter(|key| !key.is_empty())
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        Some(self.occurred_at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: Vec<RejectedRow>,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Appends one canonical record. Returns `false` when the id already exists.
pub async fn append_signal(pool: &PgPool, record: &SignalRecord) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO integrity_signals.signals
        (signal_id, signal_type, occurred_at, note, event_id, source, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (signal_id) DO NOTHING
        "#,
    )
    .bind(&record.signal_id)
    .bind(record.signal_type.key())
    .bind(record.timestamp)
    .bind(record.context.note.as_deref())
    .bind(record.context.event_id.as_deref())
    .bind(record.source.as_str())
    .bind(record.version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_signals(pool: &PgPool) -> anyhow::Result<Vec<StoredSignal>> {
    let rows = sqlx::query(
        "SELECT signal_type, occurred_at FROM integrity_signals.signals ORDER BY occurred_at",
    )
    .fetch_all(pool)
    .await?;

    let mut signals = Vec::with_capacity(rows.len());
    for row in rows {
        signals.push(StoredSignal {
            signal_type: row.try_get("signal_type")?,
            occurred_at: row.try_get("occurred_at")?,
        });
    }

    Ok(signals)
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "type")]
    signal_type: String,
    timestamp: String,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    signal_id: Option<String>,
}

impl CsvRow {
    fn into_payload(self) -> Value {
        let mut context = Map::new();
        if let Some(event_id) = self.event_id {
            context.insert("eventId".to_string(), Value::String(event_id));
        }
        if let Some(note) = self.note {
            context.insert("note".to_string(), Value::String(note));
        }

        let mut payload = json!({
            "type": self.signal_type,
            "timestamp": self.timestamp,
            "context": context,
            "source": "import",
            "version": 1,
        });
        if let Some(signal_id) = self.signal_id {
            payload["signalId"] = Value::String(signal_id);
        }
        payload
    }
}

/// Reads and normalizes a CSV export. Rows that fail policy are returned
/// separately; a malformed CSV file is an error.
pub fn read_csv_signals(
    csv_path: &Path,
    clock: &dyn Clock,
) -> anyhow::Result<(Vec<SignalRecord>, Vec<RejectedRow>)> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = result.with_context(|| format!("malformed CSV at line {line}"))?;
        match validation::normalize(&row.into_payload(), clock) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push(RejectedRow {
                line,
                reason: e.to_string(),
            }),
        }
    }

    Ok((records, rejected))
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &Path,
    clock: &dyn Clock,
) -> anyhow::Result<ImportSummary> {
    let (records, rejected) = read_csv_signals(csv_path, clock)?;
    let mut summary = ImportSummary {
        rejected,
        ..ImportSummary::default()
    };

    for record in &records {
        if append_signal(pool, record).await? {
            summary.inserted += 1;
        } else {
            summary.duplicates += 1;
        }
    }

    if !summary.rejected.is_empty() {
        warn!(rejected = summary.rejected.len(), "some CSV rows failed validation");
    }
    info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        path = %csv_path.display(),
        "imported signals"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignalType, Source};
    use crate::time::FixedClock;
    use chrono::TimeZone;
    use std::io::Write;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn csv_rows_become_import_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "type,timestamp,event_id,note,signal_id").unwrap();
        writeln!(file, "sudden_score_spikes,2026-01-30T10:00:00Z,evt-1, jump ,seed-001").unwrap();
        writeln!(file, "suspicious_timing_pattern,2026-01-31T03:15:00+01:00,,,").unwrap();
        writeln!(file, "late_homework,2026-01-31T03:15:00Z,,,").unwrap();
        file.flush().unwrap();

        let (records, rejected) = read_csv_signals(file.path(), &clock()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].signal_id, "seed-001");
        assert_eq!(records[0].signal_type, SignalType::SuddenScoreSpikes);
        assert_eq!(records[0].context.note.as_deref(), Some("jump"));
        assert_eq!(records[0].source, Source::Import);
        assert_eq!(records[1].context.event_id, None);

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].line, 4);
        assert!(rejected[0].reason.contains("late_homework"));
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "type,timestamp").unwrap();
        writeln!(file, "sudden_score_spikes,2026-01-30T10:00:00Z").unwrap();
        file.flush().unwrap();

        let (records, rejected) = read_csv_signals(file.path(), &clock()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(rejected.is_empty());
    }

    #[test]
    fn stored_signals_feed_aggregation() {
        let stored = vec![StoredSignal {
            signal_type: "sudden_score_spikes".to_string(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 8, 0, 0, 0).unwrap(),
        }];
        let stats = crate::aggregate::aggregate(&stored, "week").unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].window.to_string(), "2026-01-05");
    }
}
