#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::{Command, Output};

const GOODBYE_JSON: &str = r#"[6, {}, "wamp.close.normal"]"#;

fn wampser(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wampser"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("wampser should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn unique_temp_file(tag: &str) -> PathBuf {
    PathBuf::from(format!(
        "/tmp/wampser-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn formats_lists_every_serializer() {
    let output = wampser(&["--format", "json", "formats"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    let names: Vec<&str> = json
        .as_array()
        .expect("array of serializers")
        .iter()
        .map(|entry| entry["name"].as_str().expect("name"))
        .collect();
    assert_eq!(
        names,
        [
            "json",
            "msgpack",
            "cbor",
            "ubjson",
            "json.batched",
            "msgpack.batched",
            "cbor.batched",
            "ubjson.batched"
        ]
    );
    assert_eq!(json[1]["subprotocol"], "wamp.2.msgpack");
    assert_eq!(json[0]["binary"], false);
}

#[test]
fn transcode_then_inspect_round_trips() {
    for serializer in ["json", "msgpack.batched", "cbor"] {
        let output = wampser(&["--format", "json", "transcode", GOODBYE_JSON, "--to", serializer]);
        assert!(output.status.success(), "{serializer}");
        let json = stdout_json(&output);
        assert_eq!(json["message_type"], "GOODBYE");
        let payload_hex = json["payload_hex"].as_str().expect("hex payload").to_string();

        let output = wampser(&[
            "--format",
            "json",
            "inspect",
            "--serializer",
            serializer,
            "--hex",
            payload_hex.as_str(),
        ]);
        assert!(output.status.success(), "{serializer}");
        let json = stdout_json(&output);
        assert_eq!(
            json["messages"][0],
            serde_json::json!([6, {}, "wamp.close.normal"])
        );
        assert_eq!(json["stats"]["messages"], 1);
    }
}

#[test]
fn raw_transcode_output_can_be_inspected_from_file() {
    let output = wampser(&["--format", "raw", "transcode", GOODBYE_JSON, "--to", "cbor"]);
    assert!(output.status.success());
    let path = unique_temp_file("raw");
    std::fs::write(&path, &output.stdout).expect("payload should be writable");

    let inspected = wampser(&[
        "--format",
        "json",
        "inspect",
        "--serializer",
        "cbor",
        "--file",
        path.to_str().expect("utf-8 path"),
    ]);
    let _ = std::fs::remove_file(&path);
    assert!(inspected.status.success());
    assert_eq!(stdout_json(&inspected)["messages"][0][0], 6);
}

#[test]
fn invalid_message_exits_with_data_invalid() {
    let output = wampser(&["transcode", "[48, 0, {}, \"com.myapp.echo\"]", "--to", "json"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid message"));
}

#[test]
fn malformed_payload_exits_with_data_invalid() {
    let output = wampser(&["inspect", "--serializer", "msgpack", "--hex", "c1"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn unknown_serializer_is_a_usage_error() {
    let output = wampser(&["transcode", GOODBYE_JSON, "--to", "flatbuffers"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_extended_lists_formats() {
    let output = wampser(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: wampser"));
    assert!(stdout.contains("formats: json, msgpack, cbor, ubjson"));
}
