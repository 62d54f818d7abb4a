use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::query;
use serde_json::json;

fn handle_subjects(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };
    let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing params.studentId", None);
    };

    match query::subjects_for_student(conn, student_id) {
        Ok(subjects) => {
            let subjects: Vec<serde_json::Value> = subjects
                .iter()
                .map(|s| {
                    json!({
                        "id": s.id,
                        "subjName": s.subj_name,
                        "description": s.description,
                        "deptId": s.dept_id,
                        "teacherId": s.teacher_id
                    })
                })
                .collect();
            ok(&req.id, json!({ "subjects": subjects }))
        }
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };
    let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing params.studentId", None);
    };
    let Some(subject_id) = req.params.get("subjectId").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing params.subjectId", None);
    };

    match query::delete_enrollment(conn, student_id, subject_id) {
        Ok(()) => ok(
            &req.id,
            json!({
                "success": true,
                "message": "Enrollment Deleted Successfully!"
            }),
        ),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.subjects" => Some(handle_subjects(state, req)),
        "enrollments.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
