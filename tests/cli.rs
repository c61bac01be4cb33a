use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn solrh_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("solrh");
    path
}

/// Config pointing at a port nothing listens on.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_content = format!(
        r#"[backend]
url = "http://127.0.0.1:{}"
timeout_secs = 5

[profile]
host = "localhost"
port = "8983"
core_name = "docs"
"#,
        port
    );
    let config_path = config_dir.join("solrh.toml");
    fs::write(&config_path, config_content).unwrap();

    fs::write(root.join("batch.json"), r#"[{"a":1},{"a":2},{"a":3}]"#).unwrap();
    fs::write(root.join("broken.json"), r#"{"a":"#).unwrap();

    (tmp, config_path)
}

fn run_solrh(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = solrh_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run solrh binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_analyze_prints_batch_summary() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("batch.json");
    let (stdout, stderr, ok) = run_solrh(&config, &["analyze", file.to_str().unwrap()]);
    assert!(ok, "analyze failed: {}", stderr);
    assert!(stdout.contains("file_name:      batch.json"));
    assert!(stdout.contains("document_count: 3"));
    assert!(stdout.contains("fields:         a"));
}

#[test]
fn test_analyze_json_output() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("batch.json");
    let (stdout, stderr, ok) = run_solrh(&config, &["--json", "analyze", file.to_str().unwrap()]);
    assert!(ok, "analyze failed: {}", stderr);

    let meta: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(meta["document_count"], 3);
    assert_eq!(meta["fields"], serde_json::json!(["a"]));
    assert_eq!(meta["preview"].as_array().unwrap().len(), 2);
    assert_eq!(meta["content_sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn test_analyze_malformed_json_fails() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("broken.json");
    let (_stdout, stderr, ok) = run_solrh(&config, &["analyze", file.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("Error [local_validation]"), "stderr: {}", stderr);
}

#[test]
fn test_analyze_rejects_media_type() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("batch.json");
    let (stdout, _stderr, ok) = run_solrh(
        &config,
        &[
            "--json",
            "analyze",
            file.to_str().unwrap(),
            "--media-type",
            "image/png",
        ],
    );
    assert!(!ok);
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["error"]["kind"], "local_validation");
}

#[test]
fn test_metadata_unreachable_backend() {
    let (_tmp, config) = setup_test_env();
    let (_stdout, stderr, ok) = run_solrh(&config, &["metadata"]);
    assert!(!ok);
    assert!(stderr.contains("Error [transport_unreachable]"), "stderr: {}", stderr);
    assert!(stderr.contains("backend unreachable"));
}

#[test]
fn test_upload_with_missing_core_is_local() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("batch.json");
    let (stdout, _stderr, ok) = run_solrh(
        &config,
        &["--json", "--core", "", "upload", file.to_str().unwrap()],
    );
    assert!(!ok);
    let body: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(body["error"]["kind"], "local_validation");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("core name"));
}

#[test]
fn test_refresh_requires_positive_times() {
    let (_tmp, config) = setup_test_env();
    let (_stdout, stderr, ok) = run_solrh(&config, &["refresh", "--times", "0"]);
    assert!(!ok);
    assert!(stderr.contains("--times"));
}
