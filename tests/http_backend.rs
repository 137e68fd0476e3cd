use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use codemap::client::HttpBackend;
use codemap::config::BackendConfig;
use codemap_core::backend::Backend;
use codemap_core::lifecycle::LifecycleState;
use codemap_core::models::SearchResponse;
use codemap_core::session::{Rendered, SearchOutcome, Session};
use codemap_core::CodemapError;
use serde_json::{json, Value};

type Params = Query<HashMap<String, String>>;

/// Serve `app` on an ephemeral port and return its base URL.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn backend(base_url: String) -> HttpBackend {
    HttpBackend::new(&BackendConfig {
        base_url,
        api_prefix: "/api".to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

async fn import_ok(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let repo = body["repo_url"].as_str().unwrap_or_default().to_string();
    if repo == "/missing" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Directory not found: /missing" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "stats": {
                "project_id": "p1",
                "files_processed": 42,
                "code_files": 30,
                "doc_files": 12,
                "chunks_generated": 120,
                "code_chunks": 90,
                "doc_chunks": 30,
                "repo_url": repo,
            }
        })),
    )
}

/// Answers with a tree whose only file is named after the query, with the
/// folder hit flags left for the client to derive.
async fn search_tree(Query(params): Params) -> Json<Value> {
    let query = params.get("query").cloned().unwrap_or_default();
    let project = params.get("project_id").cloned().unwrap_or_default();
    match query.as_str() {
        "broken" => Json(json!({ "error": "Project tree not found. Please ingest project first." })),
        "flat" => Json(json!({
            "fallback": true,
            "results": [{
                "id": "c1",
                "content": "fn flat() {}",
                "metadata": {
                    "name": "flat",
                    "type": "code",
                    "file_path": "src/flat.rs",
                    "language": "rust",
                    "start_line": 1,
                    "end_line": 1
                },
                "distance": 0.3
            }]
        })),
        _ => Json(json!({
            "tree": {
                "id": "root",
                "name": project,
                "type": "folder",
                "children": [{
                    "id": "root/src",
                    "name": "src",
                    "type": "folder",
                    "children": [{
                        "id": "src/hit.rs",
                        "name": format!("{}.rs", query),
                        "type": "file",
                        "layer": 2,
                        "is_hit": true,
                        "matched_chunks": [{
                            "id": "c9",
                            "content": "fn hit() {}",
                            "metadata": {
                                "name": "hit",
                                "type": "code",
                                "file_path": "src/hit.rs",
                                "start_line": 4,
                                "end_line": 6
                            },
                            "distance": 0.12
                        }]
                    }]
                }]
            },
            "stats": { "hits_found": 1, "vector_results": 30 }
        })),
    }
}

async fn clear_ok(Query(params): Params) -> (StatusCode, Json<Value>) {
    match params.get("project_id").map(String::as_str) {
        Some("p1") => (StatusCode::OK, Json(json!({ "deleted_count": 37 }))),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "unknown project" })),
        ),
    }
}

fn service() -> Router {
    Router::new()
        .route("/api/import", post(import_ok))
        .route("/api/search", get(search_tree))
        .route("/api/clear", post(clear_ok))
}

#[tokio::test]
async fn test_import_unwraps_stats() {
    let client = backend(spawn(service()).await);
    let stats = client.import("https://example.com/acme.git").await.unwrap();

    assert_eq!(stats.project_id, "p1");
    assert_eq!(stats.files_processed, 42);
    assert_eq!(stats.doc_chunks, 30);
    assert_eq!(stats.repo_url.as_deref(), Some("https://example.com/acme.git"));
}

#[tokio::test]
async fn test_import_accepts_bare_stats() {
    let app = Router::new().route(
        "/api/import",
        post(|| async { Json(json!({ "project_id": "p7", "files_processed": 3 })) }),
    );
    let client = backend(spawn(app).await);
    let stats = client.import("/repo").await.unwrap();
    assert_eq!(stats.project_id, "p7");
    assert_eq!(stats.files_processed, 3);
}

#[tokio::test]
async fn test_import_error_uses_detail() {
    let client = backend(spawn(service()).await);
    let err = client.import("/missing").await.unwrap_err();
    assert_eq!(
        err,
        CodemapError::Import("Directory not found: /missing".to_string())
    );
}

#[tokio::test]
async fn test_search_sends_query_and_project() {
    let client = backend(spawn(service()).await);
    match client.search("p1", "parser").await.unwrap() {
        SearchResponse::Tree { tree, stats } => {
            assert_eq!(tree.name, "p1");
            assert_eq!(tree.children[0].children[0].name, "parser.rs");
            assert_eq!(stats.map(|s| s.vector_results), Some(30));
        }
        other => panic!("expected a tree, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_error_body() {
    let client = backend(spawn(service()).await);
    let err = client.search("p1", "broken").await.unwrap_err();
    assert!(matches!(err, CodemapError::Search(m) if m.contains("Project tree not found")));
}

#[tokio::test]
async fn test_search_fallback() {
    let client = backend(spawn(service()).await);
    match client.search("p1", "flat").await.unwrap() {
        SearchResponse::Fallback { results } => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].metadata.file_path, "src/flat.rs");
        }
        other => panic!("expected fallback, got {:?}", other),
    }
}

#[tokio::test]
async fn test_clear_reports_deleted_count() {
    let client = backend(spawn(service()).await);
    assert_eq!(client.clear("p1").await.unwrap().deleted_count, 37);
    assert_eq!(
        client.clear("nope").await.unwrap_err(),
        CodemapError::Clear("unknown project".to_string())
    );
}

#[tokio::test]
async fn test_plain_text_failure_keeps_status() {
    let app = Router::new().route(
        "/api/clear",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let client = backend(spawn(app).await);
    let err = client.clear("p1").await.unwrap_err();
    assert_eq!(
        err,
        CodemapError::Clear("HTTP 500 Internal Server Error: boom".to_string())
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_import_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = backend(format!("http://{}", addr));
    let err = client.import("/repo").await.unwrap_err();
    assert!(matches!(err, CodemapError::Import(m) if m.starts_with("request failed")));
}

#[tokio::test]
async fn test_session_over_http() {
    let session = Session::new(backend(spawn(service()).await));

    session.import("/repo").await.unwrap();
    assert_eq!(session.state(), LifecycleState::Active);

    let outcome = session.search("parser").await.unwrap();
    assert!(matches!(outcome, SearchOutcome::Tree(s) if s.hit_files == 1 && !s.empty));

    // The stub leaves folder hits unset; the session fills them in.
    session.with_rendered(|r| {
        let Some(Rendered::Tree(map)) = r else {
            panic!("expected a tree");
        };
        let src = map.tree.find("root/src").unwrap();
        assert!(map.tree.node(src).is_hit);
        assert!(map.tree.root().is_hit);
    });
    assert!(session.toggle_chunks("src/hit.rs"));

    let err = session.search("broken").await.unwrap_err();
    assert!(matches!(err, CodemapError::Search(_)));
    assert!(session.with_rendered(|r| matches!(r, Some(Rendered::Tree(m)) if m.query == "parser")));

    assert_eq!(session.clear().await.unwrap().deleted_count, 37);
    assert_eq!(session.state(), LifecycleState::NoProject);
    assert!(session.with_rendered(|r| r.is_none()));
}
