use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Entity kinds the ingestion pipeline can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Department,
    Teacher,
    Student,
    Subject,
    Enrollment,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Department => "department",
            EntityKind::Teacher => "teacher",
            EntityKind::Student => "student",
            EntityKind::Subject => "subject",
            EntityKind::Enrollment => "enrollment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{kind} already exists: {key}")]
    Duplicate { kind: EntityKind, key: String },

    #[error("{kind} references missing {referenced_kind} {referenced_key}")]
    ReferenceNotFound {
        kind: EntityKind,
        referenced_kind: EntityKind,
        referenced_key: i64,
    },

    #[error("malformed payload: {reason}")]
    Malformed { reason: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column {column} for table {table}")]
    UnknownField { table: String, column: String },

    #[error("no {table} record with id {id}")]
    RecordNotFound { table: String, id: i64 },

    #[error("student {0} does not exist")]
    StudentNotFound(i64),

    #[error("enrollment ({student_id}, {subject_id}) not found")]
    EnrollmentNotFound { student_id: i64, subject_id: i64 },

    #[error(transparent)]
    Store(#[from] rusqlite::Error),
}

impl DomainError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        DomainError::Malformed {
            reason: reason.into(),
        }
    }

    /// Stable error code for the IPC envelope.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Duplicate { .. } => "duplicate_entity",
            DomainError::ReferenceNotFound { .. } => "reference_not_found",
            DomainError::Malformed { .. } => "malformed_payload",
            DomainError::UnknownTable(_) => "unknown_table",
            DomainError::UnknownField { .. } => "unknown_field",
            DomainError::RecordNotFound { .. }
            | DomainError::StudentNotFound(_)
            | DomainError::EnrollmentNotFound { .. } => "not_found",
            DomainError::Store(_) => "db_failed",
        }
    }
}
