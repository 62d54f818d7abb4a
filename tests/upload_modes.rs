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

fn result_of(value: serde_json::Value) -> serde_json::Value {
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "request failed: {}",
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn row_actions(result: &serde_json::Value) -> Vec<String> {
    result
        .get("rows")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|r| {
            r.get("action")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        })
        .collect()
}

const STRICT_BATCH: &str = r#"[
    {"dept_name": "CS"},
    {"teacher_name": "Amy", "email": "a@x.com", "dept_id": 1},
    {"subj_name": "Algo", "description": "algorithms", "dept_id": 1, "teacher_id": 1},
    {"std_name": "Bo", "email": "b@x.com", "dept_id": 1},
    {"subject_id": 1, "student_id": 1}
]"#;

#[test]
fn strict_resubmit_conflicts_and_leaves_state_unchanged() {
    let workspace = temp_dir("rosterd-strict-resubmit");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = result_of(request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));

    let first = result_of(request(
        &mut stdin,
        &mut reader,
        "2",
        "upload",
        json!({ "format": "json", "content": STRICT_BATCH }),
    ));
    assert_eq!(first.get("inserted"), Some(&json!(5)));

    let second = request(
        &mut stdin,
        &mut reader,
        "3",
        "upload",
        json!({ "format": "json", "content": STRICT_BATCH }),
    );
    assert_eq!(second.get("ok"), Some(&json!(false)));
    let error = second.get("error").expect("error object");
    assert_eq!(
        error.get("code").and_then(|v| v.as_str()),
        Some("duplicate_entity")
    );
    assert!(
        error
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .contains("CS"),
        "conflict names the offending key: {}",
        second
    );

    // Nothing from the failed run landed: Bo still has exactly one subject.
    let subjects = result_of(request(
        &mut stdin,
        &mut reader,
        "4",
        "students.subjects",
        json!({ "studentId": 1 }),
    ));
    assert_eq!(
        subjects
            .get("subjects")
            .and_then(|v| v.as_array())
            .map(Vec::len),
        Some(1)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn lenient_reupload_skips_and_failures_do_not_abort() {
    let workspace = temp_dir("rosterd-lenient-modes");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = result_of(request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));

    let csv = "dept_name\nCS\nEE\n";
    let first = result_of(request(
        &mut stdin,
        &mut reader,
        "2",
        "upload",
        json!({ "format": "csv", "content": csv }),
    ));
    assert_eq!(first.get("success"), Some(&json!(true)));
    assert_eq!(
        first.get("message").and_then(|v| v.as_str()),
        Some("Data Inserted Successfully!")
    );
    assert_eq!(row_actions(&first), vec!["inserted", "inserted"]);

    let second = result_of(request(
        &mut stdin,
        &mut reader,
        "3",
        "upload",
        json!({ "format": "csv", "content": csv }),
    ));
    assert_eq!(second.get("success"), Some(&json!(true)));
    assert_eq!(row_actions(&second), vec!["skipped", "skipped"]);

    // A subject with a dangling teacher reference fails its own action
    // but the department signal on the next row still lands.
    let csv = "dept_name,subj_name,description,dept_id,teacher_id\n\
               ,Algo,algorithms,1,9\n\
               ME,,,,\n";
    let mixed = result_of(request(
        &mut stdin,
        &mut reader,
        "4",
        "upload",
        json!({ "format": "csv", "content": csv }),
    ));
    assert_eq!(mixed.get("success"), Some(&json!(false)));
    let actions = row_actions(&mixed);
    assert!(actions.contains(&"failed".to_string()), "{:?}", actions);
    assert!(actions.contains(&"inserted".to_string()), "{:?}", actions);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
