use anyhow::Result;
use axum::Router;
use clap::Parser;
use index_core::config::EngineConfig;
use index_core::model::ModelKind;
use server::{build_app, AppOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// N-gram width of the index to serve
    #[arg(long, default_value_t = 1)]
    ngrams: usize,
    /// Model used when a request does not name one
    #[arg(long, default_value_t = ModelKind::Bm25)]
    model: ModelKind,
    /// Feedback: documents taken from the first ranking
    #[arg(long, default_value_t = 10)]
    top_k: usize,
    /// Feedback: terms appended to the query
    #[arg(long, default_value_t = 5)]
    expansion_terms: usize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = EngineConfig {
        ngrams: args.ngrams,
        model: args.model,
        top_k: args.top_k,
        expansion_terms: args.expansion_terms,
        ..EngineConfig::default()
    };
    let app: Router = build_app(AppOptions {
        index_dir: args.index,
        config,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    })?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
