//! Bulk ingestion. Two modes with different partial-failure policies:
//!
//! - lenient (tabular/CSV): skip-on-duplicate, continue-on-error, each
//!   successful insert commits on its own. A failed run keeps whatever
//!   inserted before the failure.
//! - strict (record-list/JSON): one transaction for the whole batch,
//!   abort on the first duplicate or insert failure, commit at the end.

use csv::{ReaderBuilder, Trim};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{DomainError, EntityKind};
use crate::rows::{
    self, CsvRow, NewDepartment, NewEnrollment, NewStudent, NewSubject, NewTeacher, RecordRow,
};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Inserted,
    Skipped,
    Failed,
}

/// Outcome of one action in the lenient path. A denormalized row can
/// trigger several actions, so outcomes may share a row index.
#[derive(Debug, Clone, Serialize)]
pub struct RowOutcome {
    pub row: usize,
    pub kind: EntityKind,
    pub action: RowAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StrictSummary {
    pub inserted: usize,
    pub unrecognized: usize,
}

fn insert_department(conn: &Connection, dept: &NewDepartment) -> Result<(), DomainError> {
    store::insert_department(conn, &dept.dept_name)?;
    Ok(())
}

fn insert_teacher(conn: &Connection, teacher: &NewTeacher) -> Result<(), DomainError> {
    if store::department_by_id(conn, teacher.dept_id)?.is_none() {
        return Err(DomainError::ReferenceNotFound {
            kind: EntityKind::Teacher,
            referenced_kind: EntityKind::Department,
            referenced_key: teacher.dept_id,
        });
    }
    store::insert_teacher(conn, &teacher.teacher_name, &teacher.email, teacher.dept_id)?;
    Ok(())
}

fn insert_student(conn: &Connection, student: &NewStudent) -> Result<(), DomainError> {
    if store::department_by_id(conn, student.dept_id)?.is_none() {
        return Err(DomainError::ReferenceNotFound {
            kind: EntityKind::Student,
            referenced_kind: EntityKind::Department,
            referenced_key: student.dept_id,
        });
    }
    store::insert_student(conn, &student.std_name, &student.email, student.dept_id)?;
    Ok(())
}

fn insert_subject(conn: &Connection, subject: &NewSubject) -> Result<(), DomainError> {
    if store::department_by_id(conn, subject.dept_id)?.is_none() {
        return Err(DomainError::ReferenceNotFound {
            kind: EntityKind::Subject,
            referenced_kind: EntityKind::Department,
            referenced_key: subject.dept_id,
        });
    }
    if store::teacher_by_id(conn, subject.teacher_id)?.is_none() {
        return Err(DomainError::ReferenceNotFound {
            kind: EntityKind::Subject,
            referenced_kind: EntityKind::Teacher,
            referenced_key: subject.teacher_id,
        });
    }
    store::insert_subject(
        conn,
        &subject.subj_name,
        &subject.description,
        subject.dept_id,
        subject.teacher_id,
    )?;
    Ok(())
}

fn insert_enrollment(conn: &Connection, enrollment: &NewEnrollment) -> Result<(), DomainError> {
    if store::student_by_id(conn, enrollment.student_id)?.is_none() {
        return Err(DomainError::ReferenceNotFound {
            kind: EntityKind::Enrollment,
            referenced_kind: EntityKind::Student,
            referenced_key: enrollment.student_id,
        });
    }
    if store::subject_by_id(conn, enrollment.subject_id)?.is_none() {
        return Err(DomainError::ReferenceNotFound {
            kind: EntityKind::Enrollment,
            referenced_kind: EntityKind::Subject,
            referenced_key: enrollment.subject_id,
        });
    }
    store::insert_enrollment(conn, enrollment.student_id, enrollment.subject_id)?;
    Ok(())
}

fn insert_record(conn: &Connection, record: &RecordRow) -> Result<(), DomainError> {
    match record {
        RecordRow::Department(d) => insert_department(conn, d),
        RecordRow::Teacher(t) => insert_teacher(conn, t),
        RecordRow::Student(s) => insert_student(conn, s),
        RecordRow::Subject(s) => insert_subject(conn, s),
        RecordRow::Enrollment(e) => insert_enrollment(conn, e),
    }
}

/// Natural-key existence check for one decoded record. Returns the key
/// that collided, if any.
fn existing_key(conn: &Connection, record: &RecordRow) -> Result<Option<String>, DomainError> {
    let key = match record {
        RecordRow::Department(d) => store::department_by_name(conn, &d.dept_name)?
            .map(|_| d.dept_name.clone()),
        RecordRow::Teacher(t) => store::teacher_by_email(conn, &t.email)?.map(|_| t.email.clone()),
        RecordRow::Student(s) => store::student_by_email(conn, &s.email)?.map(|_| s.email.clone()),
        RecordRow::Subject(s) => {
            store::subject_by_name(conn, &s.subj_name)?.map(|_| s.subj_name.clone())
        }
        RecordRow::Enrollment(e) => {
            if store::enrollment_exists(conn, e.student_id, e.subject_id)? {
                Some(format!("({}, {})", e.student_id, e.subject_id))
            } else {
                None
            }
        }
    };
    Ok(key)
}

/// Strict mode: decode every record up front, then apply the batch inside
/// one transaction. The first duplicate or failed insert aborts the whole
/// batch and nothing from it commits.
pub fn ingest_json(conn: &Connection, bytes: &[u8]) -> Result<StrictSummary, DomainError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DomainError::malformed(format!("payload is not utf-8: {}", e)))?;
    let raw: Vec<Map<String, Value>> = serde_json::from_str(text)
        .map_err(|e| DomainError::malformed(format!("invalid JSON payload: {}", e)))?;

    let tx = conn.unchecked_transaction()?;
    let summary = match apply_strict(&tx, &raw) {
        Ok(summary) => summary,
        Err(e) => {
            let _ = tx.rollback();
            return Err(e);
        }
    };
    tx.commit()?;

    info!(
        inserted = summary.inserted,
        unrecognized = summary.unrecognized,
        "strict batch committed"
    );
    Ok(summary)
}

fn apply_strict(conn: &Connection, raw: &[Map<String, Value>]) -> Result<StrictSummary, DomainError> {
    let mut summary = StrictSummary {
        inserted: 0,
        unrecognized: 0,
    };

    for row in raw {
        let Some(record) = rows::decode_record(row)? else {
            summary.unrecognized += 1;
            continue;
        };
        if let Some(key) = existing_key(conn, &record)? {
            return Err(DomainError::Duplicate {
                kind: record.kind(),
                key,
            });
        }
        insert_record(conn, &record)?;
        summary.inserted += 1;
    }

    Ok(summary)
}

/// Lenient mode: per-column signals, skip on duplicate, record failures
/// and keep going. Each insert commits on its own; nothing is rolled
/// back afterwards.
pub fn ingest_csv(conn: &Connection, bytes: &[u8]) -> Result<Vec<RowOutcome>, DomainError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DomainError::malformed(format!("payload is not utf-8: {}", e)))?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| DomainError::malformed(format!("invalid CSV header: {}", e)))?
        .clone();

    // Materialize before touching the store, so a structurally bad file
    // aborts the whole request without partial progress.
    let mut parsed: Vec<CsvRow> = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| DomainError::malformed(format!("invalid CSV row {}: {}", i + 1, e)))?;
        let cols = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        parsed.push(CsvRow::new(cols));
    }

    let mut outcomes = Vec::new();
    for (i, row) in parsed.iter().enumerate() {
        for col in row.columns() {
            let acted = match col {
                "dept_name" => Some((EntityKind::Department, csv_department(conn, row))),
                "teacher_name" => Some((EntityKind::Teacher, csv_teacher(conn, row))),
                "subj_name" => Some((EntityKind::Subject, csv_subject(conn, row))),
                "std_name" => Some((EntityKind::Student, csv_student(conn, row))),
                _ => None,
            };
            if let Some((kind, result)) = acted {
                outcomes.push(outcome_for(i, kind, result));
            }
        }

        // Denormalized subject+student rows also describe an enrollment.
        if row.cell("subj_name").is_some() && row.cell("std_name").is_some() {
            let result = csv_enrollment(conn, row);
            outcomes.push(outcome_for(i, EntityKind::Enrollment, result));
        }
    }

    let inserted = outcomes
        .iter()
        .filter(|o| o.action == RowAction::Inserted)
        .count();
    let failed = outcomes
        .iter()
        .filter(|o| o.action == RowAction::Failed)
        .count();
    info!(rows = parsed.len(), inserted, failed, "bulk batch finished");

    Ok(outcomes)
}

fn outcome_for(row: usize, kind: EntityKind, result: Result<RowAction, DomainError>) -> RowOutcome {
    match result {
        Ok(action) => RowOutcome {
            row,
            kind,
            action,
            detail: None,
        },
        Err(e) => {
            warn!(row, kind = kind.as_str(), error = %e, "bulk row action failed");
            RowOutcome {
                row,
                kind,
                action: RowAction::Failed,
                detail: Some(e.to_string()),
            }
        }
    }
}

fn csv_department(conn: &Connection, row: &CsvRow) -> Result<RowAction, DomainError> {
    let Some(name) = row.cell("dept_name") else {
        return Ok(RowAction::Skipped);
    };
    if store::department_by_name(conn, name)?.is_some() {
        return Ok(RowAction::Skipped);
    }
    insert_department(conn, &rows::department_from_csv(row)?)?;
    Ok(RowAction::Inserted)
}

fn csv_teacher(conn: &Connection, row: &CsvRow) -> Result<RowAction, DomainError> {
    if row.cell("teacher_name").is_none() {
        return Ok(RowAction::Skipped);
    }
    if let Some(email) = row.cell("teacher_email") {
        if store::teacher_by_email(conn, email)?.is_some() {
            return Ok(RowAction::Skipped);
        }
    }
    insert_teacher(conn, &rows::teacher_from_csv(row)?)?;
    Ok(RowAction::Inserted)
}

fn csv_student(conn: &Connection, row: &CsvRow) -> Result<RowAction, DomainError> {
    if row.cell("std_name").is_none() {
        return Ok(RowAction::Skipped);
    }
    if let Some(email) = row.cell("std_email") {
        if store::student_by_email(conn, email)?.is_some() {
            return Ok(RowAction::Skipped);
        }
    }
    insert_student(conn, &rows::student_from_csv(row)?)?;
    Ok(RowAction::Inserted)
}

fn csv_subject(conn: &Connection, row: &CsvRow) -> Result<RowAction, DomainError> {
    let Some(name) = row.cell("subj_name") else {
        return Ok(RowAction::Skipped);
    };
    if store::subject_by_name(conn, name)?.is_some() {
        return Ok(RowAction::Skipped);
    }
    insert_subject(conn, &rows::subject_from_csv(row)?)?;
    Ok(RowAction::Inserted)
}

fn csv_enrollment(conn: &Connection, row: &CsvRow) -> Result<RowAction, DomainError> {
    let enrollment = rows::enrollment_from_csv(row)?;
    if store::enrollment_exists(conn, enrollment.student_id, enrollment.subject_id)? {
        return Ok(RowAction::Skipped);
    }
    insert_enrollment(conn, &enrollment)?;
    Ok(RowAction::Inserted)
}
