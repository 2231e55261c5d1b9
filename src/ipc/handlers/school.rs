use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{repo, storage_err};
use crate::ipc::types::{AppState, Request};
use crate::model::SchoolInfo;
use serde_json::json;

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match repo(state, req) {
        Ok(repo) => ok(&req.id, json!({ "school": repo.school_info() })),
        Err(resp) => resp,
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(raw) = req.params.get("school") else {
        return err(&req.id, "bad_params", "missing school", None);
    };
    let mut info: SchoolInfo = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid school: {e}"), None),
    };
    info.name = info.name.trim().to_string();
    info.address = info.address.trim().to_string();
    // An empty logo field clears the slot.
    info.logo1 = info.logo1.filter(|v| !v.trim().is_empty());
    info.logo2 = info.logo2.filter(|v| !v.trim().is_empty());

    match repo.save_school_info(&info) {
        Ok(()) => ok(&req.id, json!({ "school": info })),
        Err(e) => storage_err(req, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "school.get" => Some(handle_get(state, req)),
        "school.save" => Some(handle_save(state, req)),
        _ => None,
    }
}
