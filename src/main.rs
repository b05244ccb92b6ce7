//! Rain Tree Trimming Classifier Service
//!
//! Accepts an uploaded tree photo, runs it through a pretrained two-class
//! ONNX model, and answers with a label ("needs trimming" / "does not need
//! trimming") plus a confidence score.
//!
//! Data flow: upload -> extension validation -> save -> preprocess ->
//! forward pass -> JSON response.

mod classifier;
mod config;
mod error;
mod handlers;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classifier::Classifier;

pub use error::{AppError, AppResult};

/// Uploads above this size are rejected by the extractor layer
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raintree_trim=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Rain Tree Trimming Classifier starting...");

    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("failed to create upload dir {}", config.upload_dir.display()))?;

    // Load model once; a failed load still leaves a serving process
    let classifier = Arc::new(Classifier::load(&config));

    tracing::info!("Device: {}", classifier.device());
    tracing::info!("Model loaded: {}", classifier.is_loaded());
    tracing::info!("Classes: {:?}", classifier::CLASSES);

    let state = AppState {
        classifier,
        config: config.clone(),
    };

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index::index))
        .route("/upload", post(handlers::upload::upload))
        .route("/health", get(handlers::health::check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
