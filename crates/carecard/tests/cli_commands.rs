#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const JANE: &str = r#"{
  "personalInfo": { "fullName": "Jane Doe", "email": "jane@example.com", "phone": "+15550100" },
  "emergencyContact": { "Name": "Ann", "Mobile": "555" }
}"#;

const MALLORY: &str = r#"{
  "personalInfo": { "fullName": "Mallory", "email": "mallory@example.com", "phone": "+15550199" }
}"#;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "carecard-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture should be writable");
    path
}

/// Run the binary with JSON output and no delays.
fn carecard(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_carecard"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .env("CARECARD_SETTLE_MS", "0")
        .env("CARECARD_BACKOFF_MS", "0")
        .env_remove("CARECARD_READER")
        .output()
        .expect("carecard should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are utf-8")
}

#[test]
fn write_then_read_image() {
    let dir = unique_temp_dir("roundtrip");
    let image = dir.join("tag.bin");
    let payload = write_file(&dir, "jane.json", JANE);

    let output = carecard(&[
        "write",
        path_arg(&payload),
        "--image",
        path_arg(&image),
        "--pre-read-ms",
        "0",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let written: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("write prints JSON");
    assert_eq!(written["status"], "success");
    assert_eq!(written["recordsWritten"], 3);

    let output = carecard(&["read", "--image", path_arg(&image)]);
    assert!(output.status.success());
    let data: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("read prints JSON");
    assert_eq!(data["personalInfo"]["Full Name"], "Jane Doe");
    assert_eq!(data["emergencyContact"]["Name"], "Ann");
    assert_eq!(data["vCardUrl"], "https://vcard.tecgs.com:3000/profile/jane");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn foreign_write_exits_with_permission_denied() {
    let dir = unique_temp_dir("denied");
    let image = dir.join("tag.bin");
    let jane = write_file(&dir, "jane.json", JANE);
    let mallory = write_file(&dir, "mallory.json", MALLORY);

    let first = carecard(&["write", path_arg(&jane), "--image", path_arg(&image), "--pre-read-ms", "0"]);
    assert!(first.status.success());
    let before = std::fs::read(&image).expect("image should exist");

    let output = carecard(&[
        "write",
        path_arg(&mallory),
        "--image",
        path_arg(&image),
        "--pre-read-ms",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(50));
    assert!(stdout(&output).contains("\"status\":\"access_denied\""));
    assert_eq!(std::fs::read(&image).expect("image should exist"), before);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn read_missing_image_is_usage_error() {
    let dir = unique_temp_dir("missing");
    let output = carecard(&["read", "--image", path_arg(&dir.join("absent.bin"))]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed reading"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn diff_reports_remote_only_policies() {
    let dir = unique_temp_dir("diff");
    let tag = write_file(
        &dir,
        "tag.json",
        r#"{"insurancePolicies":[{"Policy Number":"P1","Status":"Active"}]}"#,
    );
    let remote = write_file(
        &dir,
        "remote.json",
        r#"[{"policyNumber":"p1","status":"Lapsed"},{"policyNumber":"P2"}]"#,
    );

    let output = carecard(&["diff", path_arg(&tag), path_arg(&remote)]);
    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("diff prints JSON");
    assert_eq!(report["needsSync"], true);
    assert_eq!(report["remoteOnly"][0]["Policy Number"], "P2");
    assert_eq!(report["fieldDifferences"][0]["field"], "Status");
    assert_eq!(report["fieldDifferences"][0]["remoteValue"], "Lapsed");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sync_adds_remote_policies_and_lists_tag_only() {
    let dir = unique_temp_dir("sync");
    let image = dir.join("tag.bin");
    let payload = write_file(
        &dir,
        "jane.json",
        r#"{"personalInfo":{"fullName":"Jane"},"insurancePolicies":[{"Policy Number":"P9"}]}"#,
    );
    let remote = write_file(&dir, "remote.json", r#"[{"policyNumber":"P1"}]"#);

    let first = carecard(&["write", path_arg(&payload), "--image", path_arg(&image), "--pre-read-ms", "0"]);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));

    let output = carecard(&[
        "sync",
        path_arg(&remote),
        "--image",
        path_arg(&image),
        "--pre-read-ms",
        "0",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let outcome: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("sync prints JSON");
    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["tagOnly"][0]["Policy Number"], "P9");

    let output = carecard(&["read", "--image", path_arg(&image)]);
    let data: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("read prints JSON");
    assert_eq!(data["insurancePolicies"][0]["Policy Number"], "P9");
    assert_eq!(data["insurancePolicies"][1]["Policy Number"], "P1");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn encode_then_decode_hex() {
    let dir = unique_temp_dir("codec");
    let payload = write_file(&dir, "url.json", r#"{"vCardUrl":"https://example.com/jane"}"#);

    let output = carecard(&["encode", path_arg(&payload)]);
    assert!(output.status.success());
    let encoded: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("encode prints JSON");
    assert_eq!(encoded["records"], 1);
    let tlv = encoded["tlv"].as_str().expect("short message has a TLV frame");
    assert!(tlv.starts_with("03"));

    let dump = write_file(&dir, "dump.hex", tlv);
    let output = carecard(&["decode", path_arg(&dump)]);
    assert!(output.status.success());
    let decoded: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("decode prints JSON");
    assert_eq!(decoded["records"][0]["type"], "U");
    assert_eq!(decoded["data"]["vCardUrl"], "https://example.com/jane");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn watch_image_taps_once_in_write_mode() {
    let dir = unique_temp_dir("watch");
    let image = dir.join("tag.bin");
    let payload = write_file(&dir, "jane.json", JANE);

    let output = carecard(&[
        "watch",
        "--image",
        path_arg(&image),
        "--write",
        path_arg(&payload),
        "--read-delay",
        "0ms",
        "--pre-read-ms",
        "0",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    let mut lines = text.lines();
    let tap: serde_json::Value =
        serde_json::from_str(lines.next().expect("tap report")).expect("tap is JSON");
    assert_eq!(tap["status"], "success");
    assert_eq!(tap["mode"], "WRITE");
    assert_eq!(tap["uid"], "04A23B5C6D7E80");
    let removed: serde_json::Value =
        serde_json::from_str(lines.next().expect("removal report")).expect("removal is JSON");
    assert_eq!(removed["status"], "removed");
    assert!(image.exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = carecard(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        format!("carecard {}", env!("CARGO_PKG_VERSION"))
    );
}
