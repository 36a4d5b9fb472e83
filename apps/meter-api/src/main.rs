//! Meter reading API server.
//!
//! Accepts utility-meter readings (water/gas) submitted as base64-tagged
//! photographs, extracts the numeric reading through an external image
//! recognition service, persists the record, and lets a human confirm or
//! correct the extracted value. Endpoints:
//!
//! - `POST /upload` — submit a reading image
//! - `PATCH /confirm` — confirm/correct an extracted value (one-shot)
//! - `GET /:customer_code/list` — all readings for a customer

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{get, patch, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod handlers;
mod imaging;
mod models;
mod recognition;
mod repository;
mod service;
mod state;

use recognition::GeminiRecognizer;
use state::AppState;

const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Command-line arguments for the meter API server
#[derive(Parser, Debug)]
#[command(name = "meter-api")]
#[command(about = "HTTP service for photo-submitted utility meter readings")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "PORT")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory for stored reading images
    #[arg(long, default_value = "public/images")]
    content_dir: PathBuf,

    /// Recognition call timeout in milliseconds
    #[arg(long, default_value = "15000")]
    recognition_timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Build the service router.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload_measure))
        .route("/confirm", patch(handlers::confirm_measure))
        .route("/:customer_code/list", get(handlers::list_measures))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:meter.db?mode=rwc".to_string());

    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY must be set for the recognition service")?;
    let api_url =
        std::env::var("GEMINI_API_URL").unwrap_or_else(|_| DEFAULT_GEMINI_URL.to_string());

    let recognizer = GeminiRecognizer::new(
        api_key,
        api_url,
        Duration::from_millis(args.recognition_timeout_ms),
    )
    .context("failed to build recognition client")?;

    info!("Initializing meter API...");
    let state = AppState::new(&database_url, args.content_dir, Arc::new(recognizer)).await?;
    let app = router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Meter API listening on http://{}", addr);
    info!("Recognition timeout: {}ms", args.recognition_timeout_ms);

    axum::serve(listener, app).await?;

    Ok(())
}
