use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use index_core::analyzer::analyze_documents;
use index_core::config::EngineConfig;
use index_core::index::build;
use index_core::persist::{IndexMeta, IndexStore};
use index_core::Document;
use serde_json::Value;
use server::{build_app, AppOptions};
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path, config: &EngineConfig) {
    let analyzer = config.analyzer().unwrap();
    let mut docs = vec![
        Document::new("doc0", "Rust is great. Rust systems programming, rust ownership."),
        Document::new("doc1", "Learning rust ownership."),
        Document::new("doc2", "Python scripting."),
    ];
    analyze_documents(&mut docs, &analyzer);
    let (index, counts) = build(&docs, analyzer.ngrams).unwrap();
    let store = IndexStore::new(dir);
    store.save(&index, &counts, analyzer.ngrams).unwrap();
    store.save_meta(&IndexMeta::new(&index, &counts, analyzer)).unwrap();
}

fn app(dir: &std::path::Path, admin_token: Option<&str>) -> Router {
    let config = EngineConfig::default();
    build_tiny_index(dir, &config);
    build_app(AppOptions {
        index_dir: dir.to_path_buf(),
        config,
        admin_token: admin_token.map(str::to_string),
    })
    .unwrap()
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), None);

    let (status, json) = call(app, get("/search?q=rust&k=2&model=bm25")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model"], "bm25");
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], "doc0");
    assert_eq!(arr[1]["doc_id"], "doc1");
    assert_eq!(arr[0]["rank"], 1);
}

#[tokio::test]
async fn empty_query_has_no_hits() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), None);
    let (status, json) = call(app, get("/search?q=&model=tfidf")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn feedback_expands_the_query() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), None);
    let (status, json) = call(app, get("/feedback?q=python&qid=3&top_k=1&expansion_terms=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query_id"], 3);
    assert_eq!(json["expanded_query"], "python scripting");
    assert_eq!(json["initial_hits"], 1);
    assert_eq!(json["results"][0]["doc_id"], "doc2");
}

#[tokio::test]
async fn reload_requires_the_admin_token() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), Some("secret"));

    let req = Request::post("/index/reload").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = call(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"], 3);
}

#[test]
fn missing_index_fails_startup() {
    let dir = tempdir().unwrap();
    let result = build_app(AppOptions {
        index_dir: dir.path().to_path_buf(),
        config: EngineConfig::default(),
        admin_token: None,
    });
    assert!(result.is_err());
}
