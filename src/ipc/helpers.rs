use crate::db::SqliteStore;
use crate::ipc::error::{err, storage_error_code};
use crate::ipc::types::{AppState, Request};
use crate::repository::{SortKey, StudentRepository};
use crate::store::StorageError;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn repo<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a StudentRepository<SqliteStore>, serde_json::Value> {
    state
        .repo
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// `params.sortBy`, with anything unrecognised meaning "keep stored order".
pub fn sort_key(req: &Request) -> SortKey {
    req.params
        .get("sortBy")
        .and_then(|v| v.as_str())
        .map(SortKey::parse)
        .unwrap_or(SortKey::Unsorted)
}

pub fn storage_err(req: &Request, e: &StorageError) -> serde_json::Value {
    err(
        &req.id,
        storage_error_code(e),
        e.to_string(),
        Some(json!({ "method": req.method })),
    )
}
