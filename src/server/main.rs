//! HTTP API server for hoarding management.
//!
//! CRUD over the document store, route-relative lookups, image-backed
//! create/update and the contact-form mail relay.

mod config;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hoardmap::elasticsearch::{create_index, EsClient, HoardingStore};
use hoardmap::hoardings::HoardingService;
use hoardmap::imagery::ImageHost;
use hoardmap::mail::Mailer;
use hoardmap::vision::{GeminiVision, VisionAnalyzer};

use crate::config::Config;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Hoarding management API server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "hoardmap.toml")]
    config: PathBuf,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,

    /// Create the index with its mapping if it does not exist yet
    #[arg(long)]
    create_index: bool,
}

/// Application state shared across handlers
struct AppState {
    service: HoardingService,
    mailer: Mailer,
    es: EsClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let listen = args.listen.unwrap_or_else(|| config.server.listen.clone());

    info!("HoardMap API Server");
    info!("Connecting to Elasticsearch at {}", config.elasticsearch.url);

    let es = EsClient::connect(&config.elasticsearch.url, &config.elasticsearch.index).await?;
    if !es.is_healthy().await? {
        anyhow::bail!("Elasticsearch cluster is not healthy");
    }

    if args.create_index {
        create_index(&es, false).await?;
    }

    let doc_count = es.doc_count().await?;
    info!(
        "Connected to index '{}' with {} documents",
        config.elasticsearch.index, doc_count
    );

    let vision: Option<Box<dyn VisionAnalyzer>> = config
        .vision
        .clone()
        .map(|v| Box::new(GeminiVision::new(v)) as Box<dyn VisionAnalyzer>);
    if vision.is_none() {
        info!("Vision autofill disabled (no [vision] config section)");
    }

    let service = HoardingService::new(
        HoardingStore::new(es.clone()),
        ImageHost::new(config.imagery.clone()),
        vision,
    );
    let mailer = Mailer::new(config.mail.clone());

    let state = Arc::new(AppState {
        service,
        mailer,
        es,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/hoardings",
            post(handlers::create_hoarding).get(handlers::list_hoardings),
        )
        .route(
            "/hoardings/find-in-between",
            post(handlers::find_in_between),
        )
        .route(
            "/hoardings/route-hoardings",
            post(handlers::route_hoardings),
        )
        .route(
            "/hoardings/{id}",
            get(handlers::get_hoarding)
                .patch(handlers::update_hoarding)
                .delete(handlers::delete_hoarding),
        )
        .route("/mail/send", post(handlers::send_mail))
        .layer(DefaultBodyLimit::max(handlers::MAX_IMAGE_BYTES + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let healthy = state.es.is_healthy().await.unwrap_or(false);
    let documents = state.es.doc_count().await.unwrap_or(0);

    Ok(Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        elasticsearch: healthy,
        documents,
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    elasticsearch: bool,
    documents: u64,
}
