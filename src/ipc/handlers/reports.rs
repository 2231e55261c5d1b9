use crate::calc::{self, InvalidStudentError};
use crate::export::{self, ExportError};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{repo, required_str, sort_key};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, SubjectKey};
use crate::repository::sort_students;
use serde_json::json;
use std::path::PathBuf;

fn invalid_student(req: &Request, e: &InvalidStudentError) -> serde_json::Value {
    err(
        &req.id,
        "invalid_student",
        e.to_string(),
        Some(json!({ "studentId": e.student_id })),
    )
}

fn subject_labels() -> serde_json::Value {
    let mut labels = serde_json::Map::new();
    for key in SubjectKey::ALL {
        labels.insert(key.as_str().to_string(), json!(key.label()));
    }
    serde_json::Value::Object(labels)
}

fn handle_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(student) = repo.find_by_id(&student_id) else {
        return err(
            &req.id,
            "not_found",
            "student not found",
            Some(json!({ "studentId": student_id })),
        );
    };

    match calc::generate_report(&student) {
        Ok(report) => ok(
            &req.id,
            json!({
                "report": report,
                "school": repo.school_info(),
                "subjectLabels": subject_labels(),
            }),
        ),
        Err(e) => invalid_student(req, &e),
    }
}

fn handle_generate_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let students = sort_students(&repo.list(), sort_key(req));
    match calc::generate_reports(&students) {
        Ok(reports) => ok(
            &req.id,
            json!({
                "reports": reports,
                "school": repo.school_info(),
                "subjectLabels": subject_labels(),
            }),
        ),
        Err(e) => invalid_student(req, &e),
    }
}

/// `params.studentIds` narrows the export; every listed id must exist.
fn select_students(req: &Request, all: Vec<Student>) -> Result<Vec<Student>, serde_json::Value> {
    let Some(raw) = req.params.get("studentIds") else {
        return Ok(all);
    };
    let Some(ids) = raw.as_array() else {
        return Err(err(&req.id, "bad_params", "studentIds must be an array", None));
    };
    let mut wanted = Vec::with_capacity(ids.len());
    for v in ids {
        let Some(id) = v.as_str() else {
            return Err(err(
                &req.id,
                "bad_params",
                "studentIds must contain strings",
                None,
            ));
        };
        wanted.push(id.to_string());
    }

    let missing: Vec<&String> = wanted
        .iter()
        .filter(|id| !all.iter().any(|s| &s.id == *id))
        .collect();
    if !missing.is_empty() {
        return Err(err(
            &req.id,
            "not_found",
            "some students were not found",
            Some(json!({ "studentIds": missing })),
        ));
    }

    Ok(all.into_iter().filter(|s| wanted.contains(&s.id)).collect())
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let out_path = match required_str(req, "outPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let students = match select_students(req, repo.list()) {
        Ok(v) => sort_students(&v, sort_key(req)),
        Err(resp) => return resp,
    };
    let reports = match calc::generate_reports(&students) {
        Ok(v) => v,
        Err(e) => return invalid_student(req, &e),
    };

    let school = repo.school_info();
    match export::export_report_bundle(&PathBuf::from(&out_path), &reports, &school) {
        Ok(summary) => {
            tracing::info!(
                path = %out_path,
                reports = summary.report_count,
                "report bundle exported"
            );
            ok(
                &req.id,
                json!({
                    "path": out_path,
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "reportCount": summary.report_count,
                }),
            )
        }
        Err(e) => {
            let code = match e {
                ExportError::InvalidLogo { .. } => "export_failed",
                _ => "io_failed",
            };
            tracing::warn!(path = %out_path, error = %e, "report bundle export failed");
            err(&req.id, code, e.to_string(), Some(json!({ "path": out_path })))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.generate" => Some(handle_generate(state, req)),
        "reports.generateAll" => Some(handle_generate_all(state, req)),
        "reports.exportBundle" => Some(handle_export_bundle(state, req)),
        _ => None,
    }
}
