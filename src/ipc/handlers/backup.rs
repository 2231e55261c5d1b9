use crate::backup;
use crate::db::{SqliteStore, DB_FILE_NAME};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::repository::StudentRepository;
use serde_json::json;
use std::path::PathBuf;

fn workspace_param(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    req.params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone())
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn handle_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let workspace_path = match workspace_param(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Some(repo) = state.repo.as_ref() {
        if let Err(e) = repo
            .store()
            .conn()
            .execute_batch("PRAGMA wal_checkpoint(FULL)")
        {
            tracing::warn!(error = %e, "wal checkpoint failed; bundle may miss recent writes");
        }
    }

    let export = match backup::export_workspace_bundle(
        &workspace_path,
        DB_FILE_NAME,
        &PathBuf::from(&out_path),
    ) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            )
        }
    };
    tracing::info!(path = %out_path, "workspace bundle exported");

    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbSha256": export.db_sha256,
        }),
    )
}

fn handle_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let workspace_path = match workspace_param(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Drop open handle before replacing file.
    state.repo = None;

    let import = match backup::import_workspace_bundle(&src, &workspace_path, DB_FILE_NAME) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %in_path, error = %e, "workspace import failed");
            // Reattach whatever database is still in place.
            if let Ok(store) = SqliteStore::open(&workspace_path) {
                state.workspace = Some(workspace_path.clone());
                state.repo = Some(StudentRepository::new(store));
            }
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": in_path })),
            );
        }
    };

    match SqliteStore::open(&workspace_path) {
        Ok(store) => {
            state.workspace = Some(workspace_path.clone());
            state.repo = Some(StudentRepository::new(store));
        }
        Err(e) => {
            return err(
                &req.id,
                "db_open_failed",
                format!("{e:?}"),
                Some(json!({ "path": workspace_path.to_string_lossy() })),
            )
        }
    }
    tracing::info!(path = %in_path, format = %import.bundle_format_detected, "workspace bundle imported");

    ok(
        &req.id,
        json!({
            "workspacePath": workspace_path.to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_workspace_bundle(state, req)),
        _ => None,
    }
}
