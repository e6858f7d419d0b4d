//! Integration tests for the `convo-cluster` binary
//!
//! All tests spawn the real CLI binary against JSON files written to a
//! temporary directory. The working directory is the temp dir, so the
//! layered `config/` lookup finds nothing and defaults apply.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_UNSUCCESSFUL: i32 = 2;

// =============================================================================
// Helpers
// =============================================================================

/// Result of a CLI invocation
#[derive(Debug)]
struct Invocation {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

impl Invocation {
    fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, self.stdout))
    }
}

fn invoke(dir: &Path, args: &[&str]) -> Invocation {
    let output: Output = Command::new(env!("CARGO_BIN_EXE_convo-cluster"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("CONVO_CLUSTER_ENV")
        .output()
        .expect("failed to spawn convo-cluster");

    Invocation {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).expect("failed to write fixture");
    path
}

/// Two well-separated topics, three conversations each, with opposite
/// directions inside the second topic.
fn write_batch(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
    let embeddings = json!([
        {"conversation_id": "c1", "vector": [1.0, 0.0, 0.0]},
        {"conversation_id": "c2", "vector": [0.98, 0.05, 0.0]},
        {"conversation_id": "c3", "vector": [0.97, 0.0, 0.04]},
        {"conversation_id": "c4", "vector": [0.0, 1.0, 0.0]},
        {"conversation_id": "c5", "vector": [0.03, 0.99, 0.0]},
        {"conversation_id": "c6", "vector": [0.0, 0.98, 0.05]},
    ]);
    let facets = json!([
        {"conversation_id": "c1", "action_type": "bug_report", "direction": "excess"},
        {"conversation_id": "c2", "action_type": "bug_report", "direction": "excess"},
        {"conversation_id": "c3", "action_type": "complaint", "direction": "excess"},
        {"conversation_id": "c4", "action_type": "bug_report", "direction": "excess"},
        {"conversation_id": "c5", "action_type": "bug_report", "direction": "deficit"},
        {"conversation_id": "c6", "action_type": "bug_report", "direction": "deficit"},
    ]);
    let themes = json!([
        {"conversation_id": "c1", "product_area": "billing", "component": "invoices"},
        {"conversation_id": "c2", "product_area": "billing", "component": "invoices"},
        {"conversation_id": "c3", "product_area": "billing", "component": "refunds"},
        {"conversation_id": "c4", "product_area": "publishing", "component": "feed"},
        {"conversation_id": "c5", "product_area": "publishing", "component": "feed"},
        {"conversation_id": "c6", "product_area": "publishing", "component": "feed"},
    ]);
    (
        write(dir, "embeddings.json", &embeddings),
        write(dir, "facets.json", &facets),
        write(dir, "themes.json", &themes),
    )
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

// =============================================================================
// run
// =============================================================================

#[test]
fn test_run_prints_successful_result() {
    let dir = TempDir::new().unwrap();
    let (embeddings, facets, themes) = write_batch(&dir);

    let result = invoke(
        dir.path(),
        &[
            "run",
            "--embeddings",
            path_str(&embeddings),
            "--facets",
            path_str(&facets),
            "--themes",
            path_str(&themes),
            "--run-id",
            "00000000-0000-0000-0000-000000000000",
        ],
    );
    assert_eq!(result.exit_code, EXIT_SUCCESS, "stderr: {}", result.stderr);

    let json = result.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["total_conversations"], 6);
    assert_eq!(json["embedding_clusters_count"], 2);
    assert_eq!(json["run_id"], "00000000-0000-0000-0000-000000000000");

    let ids: Vec<&str> = json["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["cluster_id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "emb_0_excess_billing",
            "emb_1_deficit_publishing",
            "emb_1_excess_publishing"
        ]
    );
    println!("[VERIFIED] cluster ids: {:?}", ids);
}

#[test]
fn test_run_without_themes_uses_facet_key() {
    let dir = TempDir::new().unwrap();
    let (embeddings, facets, _) = write_batch(&dir);

    let result = invoke(
        dir.path(),
        &[
            "run",
            "--embeddings",
            path_str(&embeddings),
            "--facets",
            path_str(&facets),
        ],
    );
    assert_eq!(result.exit_code, EXIT_SUCCESS, "stderr: {}", result.stderr);

    let json = result.json();
    let ids: Vec<&str> = json["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["cluster_id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"emb_0_bug_report_excess"));
    assert!(ids.contains(&"emb_0_complaint_excess"));
    assert!(ids.contains(&"emb_1_bug_report_deficit"));
    println!("[PASS] test_run_without_themes_uses_facet_key");
}

#[test]
fn test_run_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let (embeddings, facets, themes) = write_batch(&dir);
    let output = dir.path().join("out.json");

    let result = invoke(
        dir.path(),
        &[
            "run",
            "--embeddings",
            path_str(&embeddings),
            "--facets",
            path_str(&facets),
            "--themes",
            path_str(&themes),
            "--output",
            path_str(&output),
            "--pretty",
        ],
    );
    assert_eq!(result.exit_code, EXIT_SUCCESS, "stderr: {}", result.stderr);
    assert!(result.stdout.is_empty());

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["success"], true);
    println!("[PASS] test_run_writes_output_file");
}

#[test]
fn test_run_empty_embeddings_is_unsuccessful() {
    let dir = TempDir::new().unwrap();
    let embeddings = write(&dir, "embeddings.json", &json!([]));
    let facets = write(
        &dir,
        "facets.json",
        &json!([{"conversation_id": "c1", "action_type": "inquiry", "direction": "neutral"}]),
    );

    let result = invoke(
        dir.path(),
        &[
            "run",
            "--embeddings",
            path_str(&embeddings),
            "--facets",
            path_str(&facets),
        ],
    );
    assert_eq!(result.exit_code, EXIT_UNSUCCESSFUL, "stderr: {}", result.stderr);

    let json = result.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0], "No embeddings provided");
    assert_eq!(json["clusters"].as_array().unwrap().len(), 0);
    assert_eq!(json["fallback_conversations"][0], "c1");
    println!("[PASS] test_run_empty_embeddings_is_unsuccessful");
}

#[test]
fn test_run_missing_file_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let result = invoke(
        dir.path(),
        &["run", "--embeddings", "missing.json", "--facets", "missing.json"],
    );
    assert_eq!(result.exit_code, EXIT_ERROR);
    assert!(result.stdout.is_empty());
    assert!(result.stderr.contains("missing.json"), "stderr: {}", result.stderr);
    println!("[PASS] test_run_missing_file_exits_with_error");
}

#[test]
fn test_run_rejects_unknown_linkage() {
    let dir = TempDir::new().unwrap();
    let (embeddings, facets, _) = write_batch(&dir);

    let result = invoke(
        dir.path(),
        &[
            "run",
            "--embeddings",
            path_str(&embeddings),
            "--facets",
            path_str(&facets),
            "--linkage",
            "ward",
        ],
    );
    // clap usage errors exit with 2 before any clustering happens.
    assert_ne!(result.exit_code, EXIT_SUCCESS);
    assert!(result.stdout.is_empty());
    println!("[PASS] test_run_rejects_unknown_linkage");
}

#[test]
fn test_run_rejects_inverted_size_window() {
    let dir = TempDir::new().unwrap();
    let (embeddings, facets, _) = write_batch(&dir);

    let result = invoke(
        dir.path(),
        &[
            "run",
            "--embeddings",
            path_str(&embeddings),
            "--facets",
            path_str(&facets),
            "--min-size",
            "9",
            "--max-size",
            "4",
        ],
    );
    assert_eq!(result.exit_code, EXIT_ERROR);
    println!("[PASS] test_run_rejects_inverted_size_window");
}

// =============================================================================
// show-config
// =============================================================================

#[test]
fn test_show_config_prints_defaults() {
    let dir = TempDir::new().unwrap();
    let result = invoke(dir.path(), &["show-config"]);
    assert_eq!(result.exit_code, EXIT_SUCCESS, "stderr: {}", result.stderr);

    let parsed: toml::Value = toml::from_str(&result.stdout).unwrap();
    assert_eq!(parsed["clustering"]["distance_threshold"].as_float(), Some(0.5));
    assert_eq!(parsed["clustering"]["linkage"].as_str(), Some("complete"));
    assert_eq!(parsed["consolidation"]["max_size"].as_integer(), Some(8));
    assert!(!parsed["consolidation"]["rules"].as_array().unwrap().is_empty());
    println!("[PASS] test_show_config_prints_defaults");
}

#[test]
fn test_show_config_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        "[clustering]\ndistance_threshold = 0.3\nlinkage = \"average\"\n",
    )
    .unwrap();

    let result = invoke(dir.path(), &["show-config", "--config", path_str(&path)]);
    assert_eq!(result.exit_code, EXIT_SUCCESS, "stderr: {}", result.stderr);

    let parsed: toml::Value = toml::from_str(&result.stdout).unwrap();
    assert_eq!(parsed["clustering"]["linkage"].as_str(), Some("average"));
    let threshold = parsed["clustering"]["distance_threshold"].as_float().unwrap();
    assert!((threshold - 0.3).abs() < 1e-6);
    println!("[PASS] test_show_config_reads_file");
}

#[test]
fn test_invalid_config_file_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[clustering]\ndistance_threshold = 0.0\n").unwrap();

    let result = invoke(dir.path(), &["show-config", "--config", path_str(&path)]);
    assert_eq!(result.exit_code, EXIT_ERROR);
    assert!(result.stdout.is_empty());
    println!("[PASS] test_invalid_config_file_exits_with_error");
}
