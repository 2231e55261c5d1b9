//! Response envelopes. Every reply carries the request id and an `ok` flag,
//! then either `result` or `error {code, message, details?}`.

use crate::store::StorageError;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Result { result: Value },
    Error { error: ErrorBody },
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: &'a str,
    ok: bool,
    #[serde(flatten)]
    outcome: Outcome,
}

fn envelope(id: &str, outcome: Outcome) -> Value {
    let ok = matches!(outcome, Outcome::Result { .. });
    serde_json::to_value(Envelope { id, ok, outcome })
        .unwrap_or_else(|_| json!({ "id": id, "ok": false }))
}

pub fn ok(id: &str, result: Value) -> Value {
    envelope(id, Outcome::Result { result })
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    envelope(
        id,
        Outcome::Error {
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                details,
            },
        },
    )
}

/// Stored data that will not decode is `store_corrupt`; anything else the
/// store rejects is `db_write_failed`.
pub fn storage_error_code(e: &StorageError) -> &'static str {
    match e {
        StorageError::Corrupt { .. } => "store_corrupt",
        StorageError::Backend(_) | StorageError::Encode { .. } => "db_write_failed",
    }
}
