#![cfg(feature = "cli")]

use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};
use std::thread::{self, JoinHandle};

use amqnotify_frame::{Command as StompCommand, Frame, FrameReader, FrameWriter};
use serde_json::Value;

fn amqnotify() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_amqnotify"));
    command
        .env_remove("AMQNOTIFY_SCHEMA_DIR")
        .env_remove("AMQNOTIFY_USERNAME")
        .env_remove("AMQNOTIFY_PASSWORD")
        .args(["--log-level", "error", "--format", "json"]);
    command
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|err| {
        panic!("stdout should be JSON ({err}): {stdout}");
    })
}

fn schema_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir should be creatable");
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).expect("schema should be writable");
    }
    dir
}

/// Accepts one session, acknowledges CONNECT and DISCONNECT, returns every SEND frame.
fn fake_broker() -> (String, JoinHandle<Vec<Frame>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let port = listener.local_addr().expect("local addr").port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept should succeed");
        let mut reader = FrameReader::new(stream.try_clone().expect("clone stream"));
        let mut writer = FrameWriter::new(stream);

        let connect = reader.read_frame().expect("CONNECT expected");
        assert_eq!(connect.command, StompCommand::Connect);
        writer
            .write_frame(&Frame::new(StompCommand::Connected).with_header("version", "1.2"))
            .expect("CONNECTED should be written");

        let mut sends = Vec::new();
        while let Ok(frame) = reader.read_frame() {
            match frame.command {
                StompCommand::Send => sends.push(frame),
                StompCommand::Disconnect => {
                    if let Some(id) = frame.header("receipt") {
                        let receipt = Frame::new(StompCommand::Receipt).with_header("receipt-id", id);
                        let _ = writer.write_frame(&receipt);
                    }
                    break;
                }
                _ => {}
            }
        }
        sends
    });

    (format!("127.0.0.1:{port}"), handle)
}

fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("127.0.0.1:{port}")
}

fn send_args(dir: &Path, json: &str) -> Vec<String> {
    vec![
        "send".into(),
        "--topic".into(),
        "/topic/cms.jobs".into(),
        "--producer".into(),
        "crab".into(),
        "--type".into(),
        "cms_job".into(),
        "--schema-dir".into(),
        dir.display().to_string(),
        "--json".into(),
        json.into(),
    ]
}

#[test]
fn version_prints_package_version() {
    let output = amqnotify().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("amqnotify {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn validate_reports_offending_and_unknown_keys() {
    let dir = schema_dir(&[("status.json", r#"{"status": ["ok", "fail"]}"#)]);
    let output = amqnotify()
        .args(["validate", "--schema", "status", "--schema-dir"])
        .arg(dir.path())
        .args(["--json", r#"{"status": "bad", "extra": 1}"#])
        .output()
        .expect("validate should run");

    assert_eq!(output.status.code(), Some(60));
    let report = stdout_json(&output);
    assert_eq!(report["offending"], serde_json::json!(["status"]));
    assert_eq!(report["unknown"], serde_json::json!(["extra"]));
}

#[test]
fn validate_clean_document_succeeds() {
    let dir = schema_dir(&[("status.json", r#"{"status": ["ok", "fail"], "site": "T2"}"#)]);
    let output = amqnotify()
        .args(["validate", "--schema", "status.json", "--schema-dir"])
        .arg(dir.path())
        .args(["--json", r#"{"status": "ok", "site": "T1_US_FNAL"}"#])
        .output()
        .expect("validate should run");

    assert_eq!(output.status.code(), Some(0));
    let report = stdout_json(&output);
    assert_eq!(report["offending"], serde_json::json!([]));
}

#[test]
fn validate_unknown_schema_fails() {
    let dir = schema_dir(&[]);
    let output = amqnotify()
        .args(["validate", "--schema", "missing", "--schema-dir"])
        .arg(dir.path())
        .args(["--json", "{}"])
        .output()
        .expect("validate should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("schema not found"));
}

#[test]
fn schemas_lists_registry_entries() {
    let dir = schema_dir(&[
        ("jobs.json", r#"{"a": 1, "b": "x"}"#),
        ("ignored.txt", "{}"),
    ]);
    let output = amqnotify()
        .arg("schemas")
        .arg("--schema-dir")
        .arg(dir.path())
        .output()
        .expect("schemas should run");

    assert!(output.status.success());
    let rows = stdout_json(&output);
    let rows = rows.as_array().expect("rows should be an array");
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["name"].as_str().unwrap().ends_with("jobs.json"));
    assert_eq!(rows[0]["format"], "keys");
    assert_eq!(rows[0]["keys"], 2);
}

#[test]
fn dry_run_prints_envelopes_without_connecting() {
    let dir = schema_dir(&[]);
    let output = amqnotify()
        .args(send_args(dir.path(), r#"{"a": 1}"#))
        .arg("--dry-run")
        .output()
        .expect("send should run");

    assert!(output.status.success());
    let notification = stdout_json(&output);
    assert_eq!(notification["headers"]["type"], "cms_job");
    assert_eq!(notification["headers"]["version"], "0.3");
    assert_eq!(notification["body"]["data"], serde_json::json!({"a": 1}));
    assert_eq!(
        notification["body"]["metadata"]["_id"],
        notification["body"]["metadata"]["uuid"]
    );
}

#[test]
fn dry_run_logs_at_info_level() {
    let dir = schema_dir(&[]);
    let output = Command::new(env!("CARGO_BIN_EXE_amqnotify"))
        .env_remove("AMQNOTIFY_SCHEMA_DIR")
        .args(["--log-level", "info", "--format", "json"])
        .args(send_args(dir.path(), r#"[{"a": 1}, {"a": 2}]"#))
        .arg("--dry-run")
        .output()
        .expect("send should run");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dry run, not connecting"), "stderr: {stderr}");
}

#[test]
fn send_delivers_batch_to_broker() {
    let dir = schema_dir(&[("cms_job.json", r#"{"status": ["ok", "fail"]}"#)]);
    let (endpoint, broker) = fake_broker();

    let output = amqnotify()
        .args(send_args(
            dir.path(),
            r#"[{"status": "ok"}, {"status": "bad", "extra": true}]"#,
        ))
        .args(["--schema", "cms_job", "--drop-unknown", "--merge"])
        .args(["--endpoint", &endpoint])
        .args(["--username", "svc", "--password", "secret"])
        .args(["--header", "persistent=true"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["attempted"], true);
    assert_eq!(report["delivered"], 2);
    assert_eq!(report["findings"][0]["index"], 1);
    assert_eq!(report["findings"][0]["offending"], serde_json::json!(["status"]));

    let sends = broker.join().expect("broker thread should complete");
    assert_eq!(sends.len(), 2);
    for frame in &sends {
        assert_eq!(frame.header("destination"), Some("/topic/cms.jobs"));
        assert_eq!(frame.header("type"), Some("cms_job"));
        assert_eq!(frame.header("producer"), Some("crab"));
        assert_eq!(frame.header("persistent"), Some("true"));
    }
    let second: Value = serde_json::from_str(&sends[1].body_text()).expect("body should be JSON");
    assert_eq!(second["status"], "bad");
    assert!(second.get("extra").is_none());
    assert_eq!(second["metadata"]["producer"], "crab");
}

#[test]
fn send_without_reachable_broker_is_transport_error() {
    let dir = schema_dir(&[]);
    let output = amqnotify()
        .args(send_args(dir.path(), r#"{"a": 1}"#))
        .args(["--endpoint", &closed_endpoint(), "--timeout", "2s"])
        .args(["--username", "svc", "--password", "secret"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
    let report = stdout_json(&output);
    assert_eq!(report["attempted"], false);
    assert_eq!(report["failures"], serde_json::json!([]));
}

#[test]
fn send_without_credentials_is_usage_error() {
    let dir = schema_dir(&[]);
    let output = amqnotify()
        .args(send_args(dir.path(), r#"{"a": 1}"#))
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_rejects_invalid_json() {
    let dir = schema_dir(&[]);
    let output = amqnotify()
        .args(send_args(dir.path(), "{ nope"))
        .arg("--dry-run")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(60));
}
