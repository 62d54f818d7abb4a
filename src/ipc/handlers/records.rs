use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::update::{self, UpdateItem};
use serde_json::json;

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };
    let Some(raw) = req.params.get("updates") else {
        return err(&req.id, "bad_params", "missing params.updates", None);
    };
    let updates: Vec<UpdateItem> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("invalid updates list: {}", e),
                None,
            )
        }
    };

    match update::update_records(conn, &updates) {
        Ok(applied) => ok(
            &req.id,
            json!({
                "success": true,
                "message": "Records Updated Successfully!",
                "updated": applied
            }),
        ),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.update" => Some(handle_update(state, req)),
        _ => None,
    }
}
