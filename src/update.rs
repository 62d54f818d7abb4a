//! Batch record updates. The whole list applies inside one transaction;
//! any unknown table, unknown column, or missing record rolls back every
//! update already applied in the same call.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde::Deserialize;
use serde_json::Value;

use crate::error::DomainError;

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItem {
    pub table_name: String,
    pub record_id: i64,
    pub updated_fields: serde_json::Map<String, Value>,
}

/// Updatable columns per table. Surrogate ids are never updatable, and
/// enrollments have no non-key fields at all.
fn updatable_columns(table: &str) -> Option<&'static [&'static str]> {
    match table {
        "students" => Some(&["std_name", "email", "dept_id"]),
        "teachers" => Some(&["teacher_name", "email", "dept_id"]),
        "departments" => Some(&["dept_name"]),
        "subjects" => Some(&["subj_name", "description", "dept_id", "teacher_id"]),
        _ => None,
    }
}

fn to_sql_value(table: &str, column: &str, value: &Value) -> Result<SqlValue, DomainError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(DomainError::malformed(format!(
                    "unrepresentable number for {}.{}",
                    table, column
                )))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(DomainError::malformed(format!(
            "value for {}.{} must be a scalar",
            table, column
        ))),
    }
}

pub fn update_records(conn: &Connection, updates: &[UpdateItem]) -> Result<usize, DomainError> {
    let tx = conn.unchecked_transaction()?;
    let applied = match apply_updates(&tx, updates) {
        Ok(n) => n,
        Err(e) => {
            let _ = tx.rollback();
            return Err(e);
        }
    };
    tx.commit()?;
    Ok(applied)
}

fn apply_updates(conn: &Connection, updates: &[UpdateItem]) -> Result<usize, DomainError> {
    let mut applied = 0;

    for item in updates {
        let Some(allowed) = updatable_columns(&item.table_name) else {
            return Err(DomainError::UnknownTable(item.table_name.clone()));
        };
        if item.updated_fields.is_empty() {
            return Err(DomainError::malformed(format!(
                "no fields to update for {} id {}",
                item.table_name, item.record_id
            )));
        }

        let mut assignments = Vec::with_capacity(item.updated_fields.len());
        let mut params: Vec<SqlValue> = Vec::with_capacity(item.updated_fields.len() + 1);
        for (column, value) in &item.updated_fields {
            if !allowed.contains(&column.as_str()) {
                return Err(DomainError::UnknownField {
                    table: item.table_name.clone(),
                    column: column.clone(),
                });
            }
            assignments.push(format!("{} = ?", column));
            params.push(to_sql_value(&item.table_name, column, value)?);
        }
        params.push(SqlValue::Integer(item.record_id));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            item.table_name,
            assignments.join(", ")
        );
        let changed = conn.execute(&sql, params_from_iter(params))?;
        if changed == 0 {
            return Err(DomainError::RecordNotFound {
                table: item.table_name.clone(),
                id: item.record_id,
            });
        }
        applied += 1;
    }

    Ok(applied)
}
