use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

fn codemap_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("codemap");
    path
}

fn setup_test_env(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[backend]
base_url = "{}"
api_prefix = "/api"
timeout_secs = 5

[render]
max_chunk_lines = 4
show_layers = true
"#,
        base_url
    );

    let config_path = config_dir.join("codemap.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

/// A base URL nothing is listening on.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn run_codemap(config_path: &Path, args: &[&str], stdin: &str) -> (String, String, bool) {
    let binary = codemap_binary();
    let mut child = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run codemap binary at {:?}: {}", binary, e));

    {
        use std::io::Write;
        let mut input = child.stdin.take().unwrap();
        input.write_all(stdin.as_bytes()).unwrap();
    }
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_completions_need_no_config() {
    let (stdout, stderr, success) = run_codemap(
        Path::new("/nonexistent/codemap.toml"),
        &["completions", "bash"],
        "",
    );
    assert!(success, "completions failed: stderr={}", stderr);
    assert!(stdout.contains("codemap"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env("localhost:8000");
    let (_, stderr, success) = run_codemap(&config_path, &["shell"], "quit\n");
    assert!(!success);
    assert!(stderr.contains("base_url"), "stderr={}", stderr);
}

#[test]
fn test_shell_guards_search_without_project() {
    let (_tmp, config_path) = setup_test_env(&dead_url());
    let (stdout, stderr, success) =
        run_codemap(&config_path, &["shell"], "status\nsearch parser\nquit\n");

    assert!(success, "shell failed: stderr={}", stderr);
    assert_eq!(stdout, "no project\nerror: no active project\n");
}

#[test]
fn test_import_unreachable_backend_fails() {
    let (_tmp, config_path) = setup_test_env(&dead_url());
    let (_, stderr, success) = run_codemap(&config_path, &["import", "/repo"], "");
    assert!(!success);
    assert!(stderr.contains("import failed"), "stderr={}", stderr);
}

#[test]
fn test_shell_reports_failed_import_and_stays_empty() {
    let (_tmp, config_path) = setup_test_env(&dead_url());
    let (stdout, _, success) = run_codemap(&config_path, &["shell"], "import /repo\nstatus\n");
    assert!(success);
    assert!(stdout.starts_with("error: import failed"));
    assert!(stdout.ends_with("no project\n"));
}

async fn stub_backend() -> String {
    async fn import(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({
            "stats": {
                "project_id": "p1",
                "files_processed": 2,
                "code_files": 1,
                "doc_files": 1,
                "chunks_generated": 3,
                "code_chunks": 2,
                "doc_chunks": 1,
                "repo_url": body["repo_url"],
            }
        }))
    }

    async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(params.get("project_id").map(String::as_str), Some("p1"));
        Json(json!({
            "tree": {
                "id": "root",
                "name": "root",
                "type": "folder",
                "is_active": true,
                "children": [
                    {
                        "id": "root/app",
                        "name": "app",
                        "type": "folder",
                        "is_active": true,
                        "children": [{
                            "id": "app/routes.py",
                            "name": "routes.py",
                            "type": "file",
                            "layer": 1,
                            "is_hit": true,
                            "is_active": true,
                            "matched_chunks": [{
                                "id": "c1",
                                "content": "def login():\n    check()\n    issue()\n    log()\n    audit()\n    return ok",
                                "metadata": {
                                    "name": "login",
                                    "type": "code",
                                    "file_path": "app/routes.py",
                                    "start_line": 10,
                                    "end_line": 15
                                },
                                "distance": 0.25
                            }]
                        }]
                    },
                    {
                        "id": "root/docs",
                        "name": "docs",
                        "type": "folder",
                        "children": [{ "id": "docs/auth.md", "name": "auth.md", "type": "file", "layer": 0 }]
                    }
                ]
            },
            "stats": { "hits_found": 1, "vector_results": 30 }
        }))
    }

    async fn clear() -> Json<Value> {
        Json(json!({ "deleted_count": 3 }))
    }

    let app = Router::new()
        .route("/api/import", post(import))
        .route("/api/search", get(search))
        .route("/api/clear", post(clear));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shell_session_against_backend() {
    let (_tmp, config_path) = setup_test_env(&stub_backend().await);

    let mut child = tokio::process::Command::new(codemap_binary())
        .arg("--config")
        .arg(&config_path)
        .arg("shell")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(
            b"import https://example.com/shop.git\nsearch login flow\nchunks app/routes.py\nexpand root/docs\nclear\nstatus\n",
        )
        .await
        .unwrap();
    drop(stdin);

    let output = child.wait_with_output().await.unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(stdout.contains("Processed 2 files (1 code, 1 docs), 3 chunks (2 code, 1 docs). Project: p1"));
    assert!(stdout.contains("Codemap for \"login flow\" (1 hits, 30 vector results)"));
    assert!(stdout.contains("routes.py  <api>  [match] 1 chunk"));
    assert!(stdout.contains("| Lines 10-15  Relevance 0.25"));
    assert!(stdout.contains("| ... (2 more lines)"));
    assert!(stdout.contains("[+] docs/"));
    assert!(stdout.contains("auth.md  <docs>"));
    assert!(stdout.contains("Project cleared (3 chunks deleted)"));
    assert!(stdout.ends_with("no project\n"));
}
