//! Row classification and decoding for bulk payloads.
//!
//! Incoming batches mix entity kinds in one payload, and rows from a
//! denormalized export may carry columns for several kinds at once. A row
//! is classified by field presence with a fixed priority, then decoded
//! into a typed record before any store access happens.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{DomainError, EntityKind};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewDepartment {
    pub dept_name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewTeacher {
    pub teacher_name: String,
    pub email: String,
    pub dept_id: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewStudent {
    pub std_name: String,
    pub email: String,
    pub dept_id: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewSubject {
    pub subj_name: String,
    #[serde(default)]
    pub description: String,
    pub dept_id: i64,
    pub teacher_id: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewEnrollment {
    pub student_id: i64,
    pub subject_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordRow {
    Department(NewDepartment),
    Teacher(NewTeacher),
    Student(NewStudent),
    Subject(NewSubject),
    Enrollment(NewEnrollment),
}

impl RecordRow {
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordRow::Department(_) => EntityKind::Department,
            RecordRow::Teacher(_) => EntityKind::Teacher,
            RecordRow::Student(_) => EntityKind::Student,
            RecordRow::Subject(_) => EntityKind::Subject,
            RecordRow::Enrollment(_) => EntityKind::Enrollment,
        }
    }
}

/// Classify an untyped record by field presence. First match wins; the
/// order matters because denormalized rows carry superfluous fields.
/// `None` means unrecognized, which is a silent skip, not an error.
pub fn classify(row: &Map<String, Value>) -> Option<EntityKind> {
    if row.contains_key("dept_name") {
        Some(EntityKind::Department)
    } else if row.contains_key("teacher_name") {
        Some(EntityKind::Teacher)
    } else if row.contains_key("subj_name") {
        Some(EntityKind::Subject)
    } else if row.contains_key("std_name") {
        Some(EntityKind::Student)
    } else if row.contains_key("subject_id") && row.contains_key("student_id") {
        Some(EntityKind::Enrollment)
    } else {
        None
    }
}

fn valid_email(email: &str) -> bool {
    email.contains('@')
}

/// Decode an untyped record into its typed variant. `Ok(None)` is an
/// unrecognized row; a row that classifies but fails variant decode is
/// malformed.
pub fn decode_record(row: &Map<String, Value>) -> Result<Option<RecordRow>, DomainError> {
    let Some(kind) = classify(row) else {
        return Ok(None);
    };

    let value = Value::Object(row.clone());
    let decoded = match kind {
        EntityKind::Department => {
            serde_json::from_value::<NewDepartment>(value).map(RecordRow::Department)
        }
        EntityKind::Teacher => serde_json::from_value::<NewTeacher>(value).map(RecordRow::Teacher),
        EntityKind::Student => serde_json::from_value::<NewStudent>(value).map(RecordRow::Student),
        EntityKind::Subject => serde_json::from_value::<NewSubject>(value).map(RecordRow::Subject),
        EntityKind::Enrollment => {
            serde_json::from_value::<NewEnrollment>(value).map(RecordRow::Enrollment)
        }
    };
    let record = decoded
        .map_err(|e| DomainError::malformed(format!("invalid {} record: {}", kind, e)))?;

    match &record {
        RecordRow::Department(d) if d.dept_name.trim().is_empty() => {
            return Err(DomainError::malformed("dept_name must be non-empty"));
        }
        RecordRow::Teacher(t) if !valid_email(&t.email) => {
            return Err(DomainError::malformed(format!(
                "invalid teacher email: {}",
                t.email
            )));
        }
        RecordRow::Student(s) if !valid_email(&s.email) => {
            return Err(DomainError::malformed(format!(
                "invalid student email: {}",
                s.email
            )));
        }
        _ => {}
    }

    Ok(Some(record))
}

/// One decoded CSV row with its cells in header order. Per-column
/// classification needs the original column order, so this is not a map.
#[derive(Debug, Clone)]
pub struct CsvRow {
    cols: Vec<(String, String)>,
}

impl CsvRow {
    pub fn new(cols: Vec<(String, String)>) -> Self {
        CsvRow { cols }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cols.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cols
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, v)| v.as_str())
    }

    /// Non-empty cell value, if the column exists and carries one.
    pub fn cell(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str, DomainError> {
        self.cell(name)
            .ok_or_else(|| DomainError::malformed(format!("missing value for column {}", name)))
    }

    fn required_id(&self, name: &str) -> Result<i64, DomainError> {
        let raw = self.required(name)?;
        raw.parse::<i64>()
            .map_err(|_| DomainError::malformed(format!("column {} is not an id: {}", name, raw)))
    }
}

/// Builders for the per-column signals of the bulk (CSV) path. Column
/// names follow the denormalized export: teachers carry `teacher_email`,
/// students `std_email`, and the derived enrollment uses `std_id` and
/// `subj_id`.
pub fn department_from_csv(row: &CsvRow) -> Result<NewDepartment, DomainError> {
    Ok(NewDepartment {
        dept_name: row.required("dept_name")?.to_string(),
    })
}

pub fn teacher_from_csv(row: &CsvRow) -> Result<NewTeacher, DomainError> {
    let email = row.required("teacher_email")?;
    if !valid_email(email) {
        return Err(DomainError::malformed(format!(
            "invalid teacher email: {}",
            email
        )));
    }
    Ok(NewTeacher {
        teacher_name: row.required("teacher_name")?.to_string(),
        email: email.to_string(),
        dept_id: row.required_id("dept_id")?,
    })
}

pub fn student_from_csv(row: &CsvRow) -> Result<NewStudent, DomainError> {
    let email = row.required("std_email")?;
    if !valid_email(email) {
        return Err(DomainError::malformed(format!(
            "invalid student email: {}",
            email
        )));
    }
    Ok(NewStudent {
        std_name: row.required("std_name")?.to_string(),
        email: email.to_string(),
        dept_id: row.required_id("dept_id")?,
    })
}

pub fn subject_from_csv(row: &CsvRow) -> Result<NewSubject, DomainError> {
    Ok(NewSubject {
        subj_name: row.required("subj_name")?.to_string(),
        description: row.cell("description").unwrap_or("").to_string(),
        dept_id: row.required_id("dept_id")?,
        teacher_id: row.required_id("teacher_id")?,
    })
}

pub fn enrollment_from_csv(row: &CsvRow) -> Result<NewEnrollment, DomainError> {
    Ok(NewEnrollment {
        student_id: row.required_id("std_id")?,
        subject_id: row.required_id("subj_id")?,
    })
}
