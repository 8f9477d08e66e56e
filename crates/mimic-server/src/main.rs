mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use mimic_archive::Archiver;
use mimic_db::Database;
use mimic_replay::{Player, WebhookSink};

use crate::config::Config;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mimic=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let archiver = Archiver::new(db.clone());
    let sink = Arc::new(WebhookSink::new(config.webhook_url.clone()));
    let player = Arc::new(Player::new(
        db.clone(),
        sink,
        config.selection_policy,
        config.throttle,
    ));

    let state = Arc::new(AppState {
        db,
        archiver,
        player,
    });

    let app = Router::new()
        .route("/events/messages", post(routes::ingest_message))
        .route("/events/edits", post(routes::reconcile_edit))
        .route("/channels/{external_id}/index", post(routes::index_channel))
        .route("/authors/{external_id}/sessions", get(routes::list_sessions))
        .route("/replay", post(routes::run_replay))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Mimic archive listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
