use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use index_core::config::EngineConfig;
use index_core::feedback::FeedbackEngine;
use index_core::index::IndexSnapshot;
use index_core::model::{ModelKind, Ranking, RetrievalModel};
use index_core::persist::IndexStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_qid")]
    pub qid: u32,
    pub model: Option<ModelKind>,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_qid() -> u32 { 1 }
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct FeedbackParams {
    pub q: String,
    #[serde(default = "default_qid")]
    pub qid: u32,
    pub model: Option<ModelKind>,
    #[serde(default = "default_k")]
    pub k: usize,
    pub top_k: Option<usize>,
    pub expansion_terms: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub query_id: u32,
    pub model: &'static str,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub rank: usize,
    pub score: f64,
}

#[derive(Serialize)]
pub struct ExpansionTerm {
    pub term: String,
    pub weight: f64,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub query: String,
    pub query_id: u32,
    pub model: &'static str,
    pub expanded_query: String,
    pub expansion: Vec<ExpansionTerm>,
    pub initial_hits: usize,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

/// A loaded index and one scorer per model kind. Immutable once built;
/// a reload replaces the whole engine.
pub struct Engine {
    pub snapshot: Arc<IndexSnapshot>,
    models: HashMap<ModelKind, Box<dyn RetrievalModel>>,
}

impl Engine {
    pub fn load(root: &Path, ngrams: usize) -> Result<Self> {
        let snapshot = Arc::new(IndexStore::new(root).load_snapshot(ngrams)?);
        let models = ModelKind::ALL.into_iter().map(|k| (k, k.build(snapshot.clone()))).collect();
        tracing::info!(root = %root.display(), ngrams, docs = snapshot.num_docs(), terms = snapshot.index.len(), "engine loaded");
        Ok(Self { snapshot, models })
    }

    pub fn model(&self, kind: ModelKind) -> &dyn RetrievalModel {
        self.models[&kind].as_ref()
    }
}

pub struct AppOptions {
    pub index_dir: PathBuf,
    pub config: EngineConfig,
    pub admin_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub index_root: PathBuf,
    pub config: Arc<EngineConfig>,
    pub engine: Arc<RwLock<Arc<Engine>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    /// The current engine. Callers keep using it even if a reload swaps in a
    /// newer one meanwhile.
    fn engine(&self) -> Arc<Engine> {
        self.engine.read().clone()
    }
}

pub fn build_app(options: AppOptions) -> Result<Router> {
    options.config.validate()?;
    // Load the index at startup
    let engine = Engine::load(&options.index_dir, options.config.ngrams)?;
    let app_state = AppState {
        index_root: options.index_dir,
        config: Arc::new(options.config),
        engine: Arc::new(RwLock::new(Arc::new(engine))),
        admin_token: options.admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/feedback", get(feedback_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let engine = state.engine();
    let model = engine.model(params.model.unwrap_or(state.config.model));
    let ranking = model.rank(&params.q, params.qid);
    let results = hits(&ranking, params.k);
    let elapsed = start.elapsed();
    Json(SearchResponse {
        query: params.q,
        query_id: params.qid,
        model: model.name(),
        took_s: elapsed.as_secs_f64(),
        total_hits: ranking.len(),
        results,
    })
}

pub async fn feedback_handler(State(state): State<AppState>, Query(params): Query<FeedbackParams>) -> Json<FeedbackResponse> {
    let start = std::time::Instant::now();
    let engine = state.engine();
    let model = engine.model(params.model.unwrap_or(state.config.model));
    let feedback = FeedbackEngine::new(
        engine.snapshot.clone(),
        params.top_k.unwrap_or(state.config.top_k),
        params.expansion_terms.unwrap_or(state.config.expansion_terms),
    );
    let outcome = feedback.expand(model, &params.q, params.qid);
    let results = hits(&outcome.ranking, params.k);
    let elapsed = start.elapsed();
    Json(FeedbackResponse {
        query: params.q,
        query_id: params.qid,
        model: model.name(),
        expanded_query: outcome.expanded_query,
        expansion: outcome.expansion.into_iter().map(|(term, weight)| ExpansionTerm { term, weight }).collect(),
        initial_hits: outcome.initial.len(),
        took_s: elapsed.as_secs_f64(),
        total_hits: outcome.ranking.len(),
        results,
    })
}

fn hits(ranking: &Ranking, k: usize) -> Vec<SearchHit> {
    let k = k.clamp(1, 100);
    ranking
        .top(k)
        .into_iter()
        .enumerate()
        .map(|(i, (doc_id, score))| SearchHit { doc_id: doc_id.clone(), rank: i + 1, score })
        .collect()
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let engine = Engine::load(&state.index_root, state.config.ngrams).map_err(|e| {
        tracing::warn!(err = %e, "index reload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e}"))
    })?;
    let body = serde_json::json!({
        "num_docs": engine.snapshot.num_docs(),
        "num_terms": engine.snapshot.index.len(),
    });
    *state.engine.write() = Arc::new(engine);
    Ok(Json(body))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
