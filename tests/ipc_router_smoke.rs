use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

const STRICT_BATCH: &str = r#"[
    {"dept_name": "CS"},
    {"teacher_name": "Amy", "email": "a@x.com", "dept_id": 1},
    {"subj_name": "Algo", "description": "algorithms", "dept_id": 1, "teacher_id": 1},
    {"std_name": "Bo", "email": "b@x.com", "dept_id": 1},
    {"subject_id": 1, "student_id": 1}
]"#;

#[test]
fn router_dispatch_covers_every_method() {
    let workspace = temp_dir("rosterd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let uploaded = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "upload",
        json!({ "format": "json", "content": STRICT_BATCH }),
    );
    assert_eq!(uploaded.get("success"), Some(&json!(true)));
    assert_eq!(uploaded.get("inserted"), Some(&json!(5)));

    let subjects = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.subjects",
        json!({ "studentId": 1 }),
    );
    let list = subjects
        .get("subjects")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("subjects array");
    assert_eq!(list.len(), 1);
    assert_eq!(
        list[0].get("subjName").and_then(|v| v.as_str()),
        Some("Algo")
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "records.update",
        json!({ "updates": [
            { "table_name": "students", "record_id": 1, "updated_fields": { "std_name": "Beau" } }
        ]}),
    );
    assert_eq!(updated.get("updated"), Some(&json!(1)));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "enrollments.delete",
        json!({ "studentId": 1, "subjectId": 1 }),
    );
    assert_eq!(deleted.get("success"), Some(&json!(true)));

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.subjects",
        json!({ "studentId": 1 }),
    );
    assert_eq!(
        after.get("subjects").and_then(|v| v.as_array()).map(Vec::len),
        Some(0)
    );

    let gone = request(
        &mut stdin,
        &mut reader,
        "8",
        "enrollments.delete",
        json!({ "studentId": 1, "subjectId": 1 }),
    );
    assert_eq!(error_code(&gone), "not_found");

    let bad_format = request(
        &mut stdin,
        &mut reader,
        "9",
        "upload",
        json!({ "format": "xml", "content": "" }),
    );
    assert_eq!(error_code(&bad_format), "bad_params");

    let unknown = request(&mut stdin, &mut reader, "10", "no.such.method", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn upload_without_workspace_is_rejected() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "upload",
        json!({ "format": "json", "content": "[]" }),
    );
    assert_eq!(error_code(&resp), "no_workspace");

    drop(stdin);
    let _ = child.wait();
}
