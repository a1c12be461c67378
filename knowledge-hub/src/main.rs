use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use knowledge_hub::api;
use knowledge_hub_core::{
    ai::{GeminiModel, TextService},
    auth::{DisabledVerifier, Hs256Verifier, TokenVerifier},
    search::SearchIndex,
    service::DocumentService,
    store::DocumentStore,
    users::UserDirectory,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "knowledge-hub")]
#[command(about = "Team knowledge base with AI-assisted summaries, tags, and Q&A")]
struct Cli {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Directory where documents are persisted
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for the full-text index
    #[arg(long, default_value = "index")]
    index_dir: PathBuf,
}

struct Secrets {
    gemini_api_key: Option<String>,
    jwt_secret: Option<String>,
}

fn load_secrets() -> Secrets {
    let env_nonempty =
        |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    Secrets {
        gemini_api_key: env_nonempty("GEMINI_API_KEY"),
        jwt_secret: env_nonempty("KNOWLEDGE_HUB_JWT_SECRET"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let secrets = load_secrets();

    let store = Arc::new(RwLock::new(DocumentStore::new(&cli.data_dir)?));
    let index = Arc::new(SearchIndex::new(&cli.index_dir)?);
    {
        let store_guard = store.read().await;
        index.index_all(&store_guard)?;
    }

    let ai = match secrets.gemini_api_key {
        Some(key) => Arc::new(TextService::new(Arc::new(GeminiModel::new(key)))),
        None => {
            tracing::warn!("GEMINI_API_KEY not set, AI features run in fallback mode");
            Arc::new(TextService::fallback_only())
        }
    };

    let verifier: Arc<dyn TokenVerifier> = match secrets.jwt_secret {
        Some(secret) => Arc::new(Hs256Verifier::new(secret)),
        None => {
            tracing::warn!(
                "KNOWLEDGE_HUB_JWT_SECRET not set, bearer tokens are rejected"
            );
            Arc::new(DisabledVerifier)
        }
    };

    let users = Arc::new(UserDirectory::new());
    let service = Arc::new(DocumentService::new(store, index, ai, users.clone()));

    let app = Router::new()
        .merge(api::router(service, verifier, users))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&cli.addr).await?;
    tracing::info!("listening on {}", cli.addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
