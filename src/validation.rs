//! Submission policy checks and normalization into canonical records.
//!
//! Validation collects every violation instead of stopping at the first one,
//! so a caller can fix a submission in a single round trip.

use chrono::{Duration, SubsecRound};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::SignalError;
use crate::models::{SignalContext, SignalRecord, SignalType, Source};
use crate::time::{self, Clock};

pub const MAX_NOTE_LENGTH: usize = 280;
pub const MAX_EVENT_ID_LENGTH: usize = 64;
pub const MAX_DAYS_PAST: i64 = 365;
pub const MAX_MINUTES_FUTURE: i64 = 10;

pub fn validate(payload: &Value, clock: &dyn Clock) -> Vec<String> {
    let Some(payload) = payload.as_object() else {
        return vec!["Payload must be a JSON object.".to_string()];
    };

    let mut errors = Vec::new();

    match payload.get("type").and_then(Value::as_str) {
        None | Some("") => errors.push("Signal type is required.".to_string()),
        Some(key) if SignalType::from_key(key).is_none() => {
            errors.push(format!("Signal type '{key}' is not allowed."));
        }
        Some(_) => {}
    }

    match payload.get("timestamp").and_then(Value::as_str) {
        None | Some("") => errors.push("Timestamp is required and must be a string.".to_string()),
        Some(raw) => match time::parse_iso8601(raw) {
            None => errors.push("Timestamp must be valid ISO-8601.".to_string()),
            Some(timestamp) => {
                let now = clock.now();
                if timestamp < now - Duration::days(MAX_DAYS_PAST) {
                    errors.push("Timestamp is too far in the past.".to_string());
                }
                if timestamp > now + Duration::minutes(MAX_MINUTES_FUTURE) {
                    errors.push("Timestamp is too far in the future.".to_string());
                }
            }
        },
    }

    match payload.get("context") {
        None | Some(Value::Null) => {}
        Some(Value::Object(context)) => check_context(context, &mut errors),
        Some(_) => errors.push("Context must be an object when provided.".to_string()),
    }

    match payload.get("source") {
        None | Some(Value::Null) => {}
        Some(Value::String(source)) if Source::from_key(source).is_some() => {}
        Some(Value::String(_)) => errors.push("Source is not allowed.".to_string()),
        Some(_) => errors.push("Source must be a string.".to_string()),
    }

    match payload.get("version") {
        None | Some(Value::Null) => {}
        Some(Value::Number(number)) if number.is_i64() || number.is_u64() => {
            // The store keeps versions as BIGINT, so i64 is the ceiling.
            match number.as_i64() {
                Some(version) if version >= 1 => {}
                Some(_) => errors.push("Version must be >= 1.".to_string()),
                None => errors.push("Version is out of range.".to_string()),
            }
        }
        Some(_) => errors.push("Version must be an integer.".to_string()),
    }

    errors
}

fn check_context(context: &Map<String, Value>, errors: &mut Vec<String>) {
    check_bounded_text(context.get("note"), "note", MAX_NOTE_LENGTH, errors);
    check_bounded_text(context.get("eventId"), "eventId", MAX_EVENT_ID_LENGTH, errors);
}

fn check_bounded_text(value: Option<&Value>, field: &str, max_len: usize, errors: &mut Vec<String>) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(text)) => {
            if text.trim().chars().count() > max_len {
                errors.push(format!("Context {field} exceeds {max_len} characters."));
            }
        }
        Some(_) => errors.push(format!("Context {field} must be a string.")),
    }
}

/// Validates `payload` and converts it into a canonical [`SignalRecord`].
pub fn normalize(payload: &Value, clock: &dyn Clock) -> Result<SignalRecord, SignalError> {
    let errors = validate(payload, clock);
    if !errors.is_empty() {
        return Err(SignalError::Validation(errors));
    }

    // validate() guarantees the shapes read below.
    let signal_type = payload
        .get("type")
        .and_then(Value::as_str)
        .and_then(SignalType::from_key)
        .ok_or_else(|| SignalError::Validation(vec!["Signal type is required.".to_string()]))?;
    let timestamp = payload
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(time::parse_iso8601)
        .ok_or_else(|| SignalError::Validation(vec!["Timestamp must be valid ISO-8601.".to_string()]))?;

    let context = payload.get("context").and_then(Value::as_object);
    let context = SignalContext {
        note: context.and_then(|c| trimmed_text(c.get("note"))),
        event_id: context.and_then(|c| trimmed_text(c.get("eventId"))),
    };

    let signal_id = payload
        .get("signalId")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let source = payload
        .get("source")
        .and_then(Value::as_str)
        .and_then(Source::from_key)
        .unwrap_or_default();

    let version = payload
        .get("version")
        .and_then(Value::as_i64)
        .unwrap_or(1);

    Ok(SignalRecord {
        signal_id,
        signal_type,
        timestamp: timestamp.trunc_subsecs(0),
        context,
        source,
        version,
    })
}

fn trimmed_text(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
