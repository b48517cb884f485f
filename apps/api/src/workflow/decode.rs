//! Normalizes the vendor's result payloads and completion signals.
//!
//! The vendor reports completion inconsistently: sometimes a status string,
//! sometimes an `is_completed` flag, sometimes only the presence of `data`.
//! Everything that inspects those shapes lives here so callers only ever see
//! an `ExecutionResult`.

use serde_json::Value;
use tracing::debug;

use crate::vendor::VendorEnvelope;
use crate::workflow::models::ExecutionResult;

const COMPLETED_MARKERS: &[&str] = &["completed", "success", "done", "succeeded"];
const FAILED_MARKERS: &[&str] = &["failed", "fail", "error", "cancelled", "canceled"];
const STATUS_FIELDS: &[&str] = &["status", "state", "execution_status"];

/// Unwraps a result payload into display text.
///
/// A string payload is tried as JSON: an object with a non-empty `data`
/// field yields that field, a JSON string yields its contents. Anything
/// else, including text that is not JSON at all, is returned verbatim.
/// Returns `None` when there is no usable payload.
pub fn unwrap_payload(raw: &Value) -> Option<String> {
    match raw {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(decoded) => Some(unwrap_decoded(&decoded).unwrap_or_else(|| text.clone())),
            Err(e) => {
                debug!("Payload is not JSON ({e}); using raw text");
                Some(text.clone())
            }
        },
        other => Some(unwrap_decoded(other).unwrap_or_else(|| other.to_string())),
    }
}

fn unwrap_decoded(decoded: &Value) -> Option<String> {
    match decoded {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("data").and_then(render_nested),
        _ => None,
    }
}

/// Renders a nested `data` field, skipping the values JSON callers treat as empty.
fn render_nested(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Maps one execution-history response onto `Running | Success | Error`.
///
/// A non-empty payload is the only accepted proof of success; completion
/// markers without a payload keep the run in `Running`.
pub fn normalize_history(envelope: VendorEnvelope) -> ExecutionResult {
    if !envelope.is_ok() {
        return ExecutionResult::Error {
            message: envelope.message_or("Workflow query failed"),
            debug_url: envelope.debug_url,
        };
    }

    let Some(data) = envelope.data.as_ref().filter(|d| !d.is_null()) else {
        return ExecutionResult::Running;
    };
    let Some(record) = history_record(data) else {
        // A record list with no usable record is not a payload.
        if is_record_list(data) {
            return ExecutionResult::Running;
        }
        // A bare payload with no record around it.
        return match unwrap_payload(data) {
            Some(output) => ExecutionResult::Success {
                output,
                debug_url: envelope.debug_url,
            },
            None => ExecutionResult::Running,
        };
    };
    let debug_url = envelope.debug_url.clone().or_else(|| {
        record
            .get("debug_url")
            .and_then(Value::as_str)
            .map(String::from)
    });

    let status = STATUS_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .map(|s| s.trim().to_ascii_lowercase());

    if let Some(status) = status.as_deref() {
        if FAILED_MARKERS.contains(&status) {
            let message = ["error_message", "error"]
                .iter()
                .find_map(|field| record.get(*field).and_then(Value::as_str))
                .filter(|m| !m.trim().is_empty())
                .map(String::from)
                .unwrap_or_else(|| envelope.message_or("Workflow execution failed"));
            return ExecutionResult::Error { message, debug_url };
        }
    }

    match record.get("data").and_then(unwrap_payload) {
        Some(output) => ExecutionResult::Success { output, debug_url },
        None => {
            let marked_done = status.as_deref().is_some_and(|s| COMPLETED_MARKERS.contains(&s))
                || record.get("is_completed").and_then(Value::as_bool) == Some(true);
            if marked_done {
                debug!("Run marked complete without a payload; polling again");
            }
            ExecutionResult::Running
        }
    }
}

/// The history `data` arrives as an object, or as a list whose first
/// record is the run; a JSON-encoded string of either is also accepted.
fn history_record(data: &Value) -> Option<Value> {
    match data {
        Value::Object(_) => Some(data.clone()),
        Value::Array(items) => items.first().filter(|v| v.is_object()).cloned(),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .ok()
            .filter(|v| v.is_object() || v.is_array())
            .and_then(|v| history_record(&v)),
        _ => None,
    }
}

fn is_record_list(data: &Value) -> bool {
    match data {
        Value::Array(_) => true,
        Value::String(text) => matches!(serde_json::from_str::<Value>(text), Ok(Value::Array(_))),
        _ => false,
    }
}
