use crate::ingest::{self, RowAction};
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };
    let Some(format) = req.params.get("format").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.format", None);
    };
    let Some(content) = req.params.get("content").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.content", None);
    };

    match format {
        "csv" => match ingest::ingest_csv(conn, content.as_bytes()) {
            Ok(rows) => {
                let success = rows.iter().all(|r| r.action != RowAction::Failed);
                ok(
                    &req.id,
                    json!({
                        "success": success,
                        "message": "Data Inserted Successfully!",
                        "rows": rows
                    }),
                )
            }
            Err(e) => domain_err(&req.id, &e),
        },
        "json" => match ingest::ingest_json(conn, content.as_bytes()) {
            Ok(summary) => ok(
                &req.id,
                json!({
                    "success": true,
                    "message": "Data Inserted Successfully!",
                    "inserted": summary.inserted,
                    "unrecognized": summary.unrecognized
                }),
            ),
            Err(e) => domain_err(&req.id, &e),
        },
        other => err(
            &req.id,
            "bad_params",
            format!("invalid format: {} (expected csv or json)", other),
            None,
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "upload" => Some(handle_upload(state, req)),
        _ => None,
    }
}
