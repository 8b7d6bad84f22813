use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use receptionist_kb::store::{FileBackend, LogBackend};
use receptionist_kb_core::{ChunkMetadata, TenantId, VectorStore};
use tempfile::TempDir;

fn rkb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rkb");
    path
}

fn setup_test_env(backend: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let kb_dir = root.join("knowledge_base").join("helpflow");
    fs::create_dir_all(kb_dir.join("faq")).unwrap();
    fs::write(
        kb_dir.join("hours.txt"),
        "Our hours are 9 to 5. We are closed Sundays.",
    )
    .unwrap();
    fs::write(
        kb_dir.join("faq").join("parking.md"),
        "Free parking is behind the building. Street parking is metered.",
    )
    .unwrap();
    fs::write(kb_dir.join("logo.png"), [0u8, 1, 2, 3]).unwrap();

    let config_content = format!(
        r#"[store]
backend = "{backend}"
root = "{root}/data"

[chunking]
max_words = 500

[knowledge_base]
root = "{root}/knowledge_base"

[tenants.helpflow]
bot_name = "HelpFlow AI"
"#,
        backend = backend,
        root = root.display(),
    );

    let config_path = config_dir.join("rkb.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rkb(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rkb_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rkb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

async fn seed(store: VectorStore) {
    let t = TenantId::new("helpflow").unwrap();
    store
        .upsert(
            &t,
            vec![1.0, 0.0, 0.0],
            ChunkMetadata::new("hours.txt", "Our hours are 9 to 5."),
        )
        .await
        .unwrap();
    store
        .upsert(
            &t,
            vec![0.0, 1.0, 0.0],
            ChunkMetadata::new("hours.txt", "We are closed Sundays."),
        )
        .await
        .unwrap();
    store
        .upsert(
            &t,
            vec![0.0, 1.0, 0.0],
            ChunkMetadata::new("faq/parking.md", "We are closed Sundays."),
        )
        .await
        .unwrap();
}

#[test]
fn test_ingest_with_disabled_provider_skips_every_chunk() {
    let (_tmp, config_path) = setup_test_env("files");

    let (stdout, stderr, success) = run_rkb(&config_path, &["ingest", "helpflow"]);
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("documents: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("faq/parking.md: written 0, failed 1"));
    assert!(stdout.contains("hours.txt: written 0, failed 1"));
    assert!(stdout.contains("chunks written: 0"));
    assert!(stdout.contains("chunks failed: 2"));
    assert!(stdout.trim_end().ends_with("ok"));

    let (stdout, _, success) = run_rkb(&config_path, &["stats", "helpflow"]);
    assert!(success);
    assert!(stdout.contains("chunks: 0"));
}

#[test]
fn test_ingest_missing_tenant_dir_fails() {
    let (_tmp, config_path) = setup_test_env("files");
    let (_, stderr, success) = run_rkb(&config_path, &["ingest", "nobody"]);
    assert!(!success);
    assert!(stderr.contains("Knowledge base directory does not exist"));
}

#[test]
fn test_invalid_tenant_rejected() {
    let (_tmp, config_path) = setup_test_env("files");
    let (_, _, success) = run_rkb(&config_path, &["stats", "../etc"]);
    assert!(!success);
}

#[test]
fn test_probe_empty_tenant() {
    let (_tmp, config_path) = setup_test_env("log");
    let (stdout, stderr, success) = run_rkb(&config_path, &["probe", "helpflow"]);
    assert!(success, "probe failed: {}", stderr);
    assert!(stdout.contains("entries: 0"));
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_requires_embedding_provider() {
    let (_tmp, config_path) = setup_test_env("files");
    let (_, stderr, success) = run_rkb(&config_path, &["search", "helpflow", "hours"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_ask_requires_generation_provider() {
    let (_tmp, config_path) = setup_test_env("files");
    let (_, stderr, success) = run_rkb(&config_path, &["ask", "helpflow", "hi"]);
    assert!(!success);
    assert!(stderr.contains("generation"));
}

#[tokio::test]
async fn test_seeded_files_index_stats_probe_clear() {
    let (tmp, config_path) = setup_test_env("files");
    seed(VectorStore::new(Arc::new(FileBackend::new(tmp.path().join("data"))))).await;

    let (stdout, stderr, success) = run_rkb(&config_path, &["stats", "helpflow"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("backend: files"));
    assert!(stdout.contains("name: helpflow"));
    assert!(stdout.contains("chunks: 3"));
    assert!(stdout.contains("embeddings: 3"));
    assert!(stdout.contains("dims: 3"));
    assert!(stdout.contains("duplicates: 1"));
    assert!(stdout.contains("faq/parking.md"));

    let (stdout, _, success) = run_rkb(&config_path, &["probe", "helpflow", "--k", "2"]);
    assert!(success);
    assert!(stdout.contains("self-match: yes"));
    assert!(stdout.contains("1. [1.0000] hours.txt#0"));

    let (stdout, _, success) = run_rkb(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("tenants: 1"));
    assert!(stdout.contains("helpflow"));

    let (stdout, _, success) = run_rkb(&config_path, &["clear", "helpflow"]);
    assert!(success);
    assert!(stdout.contains("removed: 3"));

    let (stdout, _, _) = run_rkb(&config_path, &["stats", "helpflow"]);
    assert!(stdout.contains("chunks: 0"));
}

#[tokio::test]
async fn test_seeded_log_index_probe() {
    let (tmp, config_path) = setup_test_env("log");
    seed(VectorStore::new(Arc::new(LogBackend::new(tmp.path().join("data"))))).await;

    let (stdout, stderr, success) = run_rkb(&config_path, &["probe", "helpflow"]);
    assert!(success, "probe failed: {}", stderr);
    assert!(stdout.contains("entries: 3"));
    assert!(stdout.contains("self-match: yes"));
}

#[test]
fn test_corrupt_index_is_reported_not_emptied() {
    let (tmp, config_path) = setup_test_env("files");
    let index = tmp.path().join("data").join("helpflow").join("index.json");
    fs::create_dir_all(index.parent().unwrap()).unwrap();
    fs::write(&index, "{\"chunks\": [").unwrap();

    let (stdout, stderr, success) = run_rkb(&config_path, &["probe", "helpflow"]);
    assert!(!success, "stdout: {}", stdout);
    assert!(stderr.contains("corrupt index"), "stderr: {}", stderr);
}
