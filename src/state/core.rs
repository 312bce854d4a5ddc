// Copyright (c) 2025 - Cowboy AI, Inc.
//! Built-in events and the core reducer
//!
//! The core reducer runs before any caller-supplied reducer and owns the
//! `progress` field.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{EventKind, StateError};

/// A typed event payload with a fixed kind
pub trait EventPayload: Serialize {
    const KIND: &'static str;

    fn kind() -> EventKind {
        EventKind::from(Self::KIND)
    }
}

/// `PROGRESS_UPDATE`: set `progress` to a value in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub value: f64,
}

impl EventPayload for ProgressUpdate {
    const KIND: &'static str = "PROGRESS_UPDATE";
}

/// `TRANSACTION_CREATED`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCreated {
    pub id: String,
    pub to: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EventPayload for TransactionCreated {
    const KIND: &'static str = "TRANSACTION_CREATED";
}

/// `TRANSACTION_COMPLETED`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCompleted {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EventPayload for TransactionCompleted {
    const KIND: &'static str = "TRANSACTION_COMPLETED";
}

/// `TRANSACTION_ERROR`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionError {
    pub id: String,
    pub error: Value,
}

impl EventPayload for TransactionError {
    const KIND: &'static str = "TRANSACTION_ERROR";
}

/// Partial state produced by the core reducer, if it handles `kind`
pub(crate) fn reduce(kind: &EventKind, payload: &Value) -> Option<Result<Value, StateError>> {
    match kind {
        EventKind::ProgressUpdate => Some(reduce_progress(payload)),
        _ => None,
    }
}

fn reduce_progress(payload: &Value) -> Result<Value, StateError> {
    let update =
        ProgressUpdate::deserialize(payload).map_err(|source| StateError::InvalidPayload {
            kind: ProgressUpdate::KIND.to_string(),
            source,
        })?;

    let value = validate_progress(update.value)?;
    Ok(json!({ "progress": value }))
}

/// Accept only finite values in `[0, 1]`; NaN is out of range
fn validate_progress(value: f64) -> Result<f64, StateError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(StateError::ProgressOutOfRange { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0 ; "lower bound")]
    #[test_case(0.5 ; "midpoint")]
    #[test_case(1.0 ; "upper bound")]
    fn test_progress_in_range(value: f64) {
        let partial = reduce(&EventKind::ProgressUpdate, &json!({ "value": value }))
            .unwrap()
            .unwrap();
        assert_eq!(partial, json!({ "progress": value }));
    }

    #[test_case(1.5 ; "above")]
    #[test_case(-0.1 ; "below")]
    fn test_progress_out_of_range(value: f64) {
        let err = reduce(&EventKind::ProgressUpdate, &json!({ "value": value }))
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, StateError::ProgressOutOfRange { value: v } if v == value));
    }

    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinity")]
    #[test_case(f64::NEG_INFINITY ; "negative infinity")]
    fn test_non_finite_progress_is_out_of_range(value: f64) {
        let err = validate_progress(value).unwrap_err();
        assert!(matches!(err, StateError::ProgressOutOfRange { .. }));
    }

    #[test]
    fn test_nan_progress_payload_is_rejected() {
        // JSON has no NaN; a serialized NaN arrives as null.
        let payload = serde_json::to_value(ProgressUpdate { value: f64::NAN }).unwrap();
        let result = reduce(&EventKind::ProgressUpdate, &payload).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_progress_payload_shape() {
        let err = reduce(&EventKind::ProgressUpdate, &json!({ "percent": 5 }))
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidPayload { .. }));
    }

    #[test]
    fn test_other_kinds_pass_through() {
        assert!(reduce(&EventKind::TransactionCreated, &json!({})).is_none());
        assert!(reduce(&EventKind::custom("MINE"), &json!({})).is_none());
    }
}
