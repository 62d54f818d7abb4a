//! Thin accessors over the roster tables. Constraint checks and batch
//! policy live in the pipeline; these only read and write single rows.
//!
//! Every function takes the connection it should run against, so the same
//! accessor works inside or outside a transaction scope.

use rusqlite::{Connection, OptionalExtension};

#[derive(Debug, Clone)]
pub struct DepartmentRecord {
    pub id: i64,
    pub dept_name: String,
}

#[derive(Debug, Clone)]
pub struct TeacherRecord {
    pub id: i64,
    pub teacher_name: String,
    pub email: String,
    pub dept_id: i64,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: i64,
    pub std_name: String,
    pub email: String,
    pub dept_id: i64,
}

#[derive(Debug, Clone)]
pub struct SubjectRecord {
    pub id: i64,
    pub subj_name: String,
    pub description: String,
    pub dept_id: i64,
    pub teacher_id: i64,
}

pub fn department_by_name(
    conn: &Connection,
    dept_name: &str,
) -> rusqlite::Result<Option<DepartmentRecord>> {
    conn.query_row(
        "SELECT id, dept_name FROM departments WHERE dept_name = ?",
        [dept_name],
        |row| {
            Ok(DepartmentRecord {
                id: row.get(0)?,
                dept_name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn department_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<DepartmentRecord>> {
    conn.query_row(
        "SELECT id, dept_name FROM departments WHERE id = ?",
        [id],
        |row| {
            Ok(DepartmentRecord {
                id: row.get(0)?,
                dept_name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn insert_department(conn: &Connection, dept_name: &str) -> rusqlite::Result<i64> {
    conn.execute("INSERT INTO departments(dept_name) VALUES (?)", [dept_name])?;
    Ok(conn.last_insert_rowid())
}

pub fn teacher_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<TeacherRecord>> {
    conn.query_row(
        "SELECT id, teacher_name, email, dept_id FROM teachers WHERE email = ?",
        [email],
        |row| {
            Ok(TeacherRecord {
                id: row.get(0)?,
                teacher_name: row.get(1)?,
                email: row.get(2)?,
                dept_id: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn teacher_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<TeacherRecord>> {
    conn.query_row(
        "SELECT id, teacher_name, email, dept_id FROM teachers WHERE id = ?",
        [id],
        |row| {
            Ok(TeacherRecord {
                id: row.get(0)?,
                teacher_name: row.get(1)?,
                email: row.get(2)?,
                dept_id: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn insert_teacher(
    conn: &Connection,
    teacher_name: &str,
    email: &str,
    dept_id: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO teachers(teacher_name, email, dept_id) VALUES (?, ?, ?)",
        (teacher_name, email, dept_id),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn student_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<StudentRecord>> {
    conn.query_row(
        "SELECT id, std_name, email, dept_id FROM students WHERE email = ?",
        [email],
        |row| {
            Ok(StudentRecord {
                id: row.get(0)?,
                std_name: row.get(1)?,
                email: row.get(2)?,
                dept_id: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn student_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<StudentRecord>> {
    conn.query_row(
        "SELECT id, std_name, email, dept_id FROM students WHERE id = ?",
        [id],
        |row| {
            Ok(StudentRecord {
                id: row.get(0)?,
                std_name: row.get(1)?,
                email: row.get(2)?,
                dept_id: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn insert_student(
    conn: &Connection,
    std_name: &str,
    email: &str,
    dept_id: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO students(std_name, email, dept_id) VALUES (?, ?, ?)",
        (std_name, email, dept_id),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn subject_by_name(
    conn: &Connection,
    subj_name: &str,
) -> rusqlite::Result<Option<SubjectRecord>> {
    conn.query_row(
        "SELECT id, subj_name, description, dept_id, teacher_id FROM subjects WHERE subj_name = ?",
        [subj_name],
        |row| {
            Ok(SubjectRecord {
                id: row.get(0)?,
                subj_name: row.get(1)?,
                description: row.get(2)?,
                dept_id: row.get(3)?,
                teacher_id: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn subject_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<SubjectRecord>> {
    conn.query_row(
        "SELECT id, subj_name, description, dept_id, teacher_id FROM subjects WHERE id = ?",
        [id],
        |row| {
            Ok(SubjectRecord {
                id: row.get(0)?,
                subj_name: row.get(1)?,
                description: row.get(2)?,
                dept_id: row.get(3)?,
                teacher_id: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn insert_subject(
    conn: &Connection,
    subj_name: &str,
    description: &str,
    dept_id: i64,
    teacher_id: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO subjects(subj_name, description, dept_id, teacher_id) VALUES (?, ?, ?, ?)",
        (subj_name, description, dept_id, teacher_id),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn enrollment_exists(
    conn: &Connection,
    student_id: i64,
    subject_id: i64,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM enrollments WHERE student_id = ? AND subject_id = ?",
        [student_id, subject_id],
        |_| Ok(()),
    )
    .optional()
    .map(|v| v.is_some())
}

pub fn insert_enrollment(
    conn: &Connection,
    student_id: i64,
    subject_id: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO enrollments(student_id, subject_id) VALUES (?, ?)",
        [student_id, subject_id],
    )?;
    Ok(())
}

pub fn delete_enrollment(
    conn: &Connection,
    student_id: i64,
    subject_id: i64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM enrollments WHERE student_id = ? AND subject_id = ?",
        [student_id, subject_id],
    )
}

/// Enrollment subject ids for one student, in scan (rowid) order.
pub fn enrolled_subject_ids(conn: &Connection, student_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT subject_id FROM enrollments WHERE student_id = ? ORDER BY rowid")?;
    let ids = stmt
        .query_map([student_id], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
