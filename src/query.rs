//! The student–subject relationship: enrolled-subject listing and the
//! enrollment delete that goes with it.

use rusqlite::Connection;
use tracing::warn;

use crate::error::DomainError;
use crate::store::{self, SubjectRecord};

/// Subjects the student is enrolled in, in enrollment scan order. An
/// enrollment whose subject has vanished is skipped, not an error.
pub fn subjects_for_student(
    conn: &Connection,
    student_id: i64,
) -> Result<Vec<SubjectRecord>, DomainError> {
    if store::student_by_id(conn, student_id)?.is_none() {
        return Err(DomainError::StudentNotFound(student_id));
    }

    let mut subjects = Vec::new();
    for subject_id in store::enrolled_subject_ids(conn, student_id)? {
        match store::subject_by_id(conn, subject_id)? {
            Some(subject) => subjects.push(subject),
            None => {
                warn!(student_id, subject_id, "skipping enrollment with missing subject");
            }
        }
    }
    Ok(subjects)
}

pub fn delete_enrollment(
    conn: &Connection,
    student_id: i64,
    subject_id: i64,
) -> Result<(), DomainError> {
    if !store::enrollment_exists(conn, student_id, subject_id)? {
        return Err(DomainError::EnrollmentNotFound {
            student_id,
            subject_id,
        });
    }

    let tx = conn.unchecked_transaction()?;
    if let Err(e) = store::delete_enrollment(&tx, student_id, subject_id) {
        let _ = tx.rollback();
        return Err(e.into());
    }
    tx.commit()?;
    Ok(())
}
