use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{repo, required_str, sort_key, storage_err};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, StudentDraft};
use crate::repository::sort_students;
use serde::de::DeserializeOwned;
use serde_json::json;

fn student_param<T: DeserializeOwned>(req: &Request) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get("student") else {
        return Err(err(&req.id, "bad_params", "missing student", None));
    };
    serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid student: {e}"),
            Some(json!({ "field": "student" })),
        )
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let key = sort_key(req);
    let students = sort_students(&repo.list(), key);
    ok(
        &req.id,
        json!({ "students": students, "sortBy": key.as_str() }),
    )
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match repo.find_by_id(&student_id) {
        Some(student) => ok(&req.id, json!({ "student": student })),
        None => err(
            &req.id,
            "not_found",
            "student not found",
            Some(json!({ "studentId": student_id })),
        ),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft: StudentDraft = match student_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match repo.create(draft) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => storage_err(req, &e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student: Student = match student_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = student.id.clone();
    match repo.update(student) {
        Ok(updated) => ok(
            &req.id,
            json!({ "updated": updated, "studentId": student_id }),
        ),
        Err(e) => storage_err(req, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match repo.delete(&student_id) {
        Ok(deleted) => ok(
            &req.id,
            json!({ "deleted": deleted, "studentId": student_id }),
        ),
        Err(e) => storage_err(req, &e),
    }
}

fn handle_create_sample(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match repo.create_sample() {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => storage_err(req, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.get" => Some(handle_get(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "students.createSample" => Some(handle_create_sample(state, req)),
        _ => None,
    }
}
