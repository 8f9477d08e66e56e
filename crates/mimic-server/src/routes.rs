use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use mimic_archive::{ArchiveError, Archiver, IngestOutcome};
use mimic_db::Database;
use mimic_replay::{Player, ReplayError, segment_sessions};
use mimic_types::api::{IndexChannelRequest, ReplayRequest, SessionSummary};
use mimic_types::events::{MessageCreated, MessageEdited};
use mimic_types::models::Message;

pub struct AppState {
    pub db: Arc<Database>,
    pub archiver: Archiver,
    pub player: Arc<Player>,
}

/// Ingestion entry point, one inbound "message created" event per call.
/// The skip outcome (unindexed channel) is 202, distinct from both success
/// and failure.
pub async fn ingest_message(
    State(state): State<Arc<AppState>>,
    Json(event): Json<MessageCreated>,
) -> Result<Response, StatusCode> {
    let archiver = state.archiver.clone();

    // Run blocking DB work off the async runtime
    let outcome = tokio::task::spawn_blocking(move || archiver.ingest(&event))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Ingest failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(match outcome {
        IngestOutcome::Archived(message) => (StatusCode::CREATED, Json(message)).into_response(),
        IngestOutcome::Duplicate(message) => (StatusCode::OK, Json(message)).into_response(),
        IngestOutcome::Skipped => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "outcome": "skipped" })),
        )
            .into_response(),
    })
}

/// Edit entry point. Contract violations map to 400, unknown messages to 404.
pub async fn reconcile_edit(
    State(state): State<Arc<AppState>>,
    Json(event): Json<MessageEdited>,
) -> Result<StatusCode, StatusCode> {
    let archiver = state.archiver.clone();

    let result = tokio::task::spawn_blocking(move || archiver.reconcile_edit(&event))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match result {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(ArchiveError::MissingEditTimestamp(_)) => Err(StatusCode::BAD_REQUEST),
        Err(ArchiveError::UnknownMessage(_)) => Err(StatusCode::NOT_FOUND),
        Err(ArchiveError::Store(e)) => {
            error!("Edit reconciliation failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// The explicit opt-in that makes a channel archivable.
pub async fn index_channel(
    State(state): State<Arc<AppState>>,
    Path(external_id): Path<String>,
    Json(req): Json<IndexChannelRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let archiver = state.archiver.clone();

    let channel = tokio::task::spawn_blocking(move || {
        archiver.index_channel(&external_id, &req.guild_external_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Channel indexing failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((StatusCode::CREATED, Json(channel)))
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub channel: Option<String>,
}

/// Read-only segmentation view: what a replay request would choose from.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(author_external_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<SessionSummary>>, StatusCode> {
    let db = state.db.clone();

    let summaries = tokio::task::spawn_blocking(move || {
        let sessions = segment_sessions(&db, &author_external_id, query.channel.as_deref())?;
        // BTreeMap iteration is already ordered by session start
        let summaries = sessions
            .iter()
            .map(|(start, messages)| SessionSummary {
                started_at: *start,
                message_count: messages.len(),
                last_timestamp: messages.last().map(|m| m.origin_timestamp).unwrap_or(*start),
            })
            .collect::<Vec<_>>();
        Ok::<_, ReplayError>(summaries)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Segmentation failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(summaries))
}

/// Playback entry point. Responds with the delivered prefix, which on a
/// downstream delivery failure is shorter than the selected session.
pub async fn run_replay(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReplayRequest>,
) -> Result<Json<Vec<Message>>, Response> {
    match state
        .player
        .replay(&req.author_external_id, req.channel_external_id.as_deref())
        .await
    {
        Ok(delivered) => Ok(Json(delivered)),
        Err(ReplayError::NoSessionsAvailable(author)) => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("no sessions available for author {}", author),
            })),
        )
            .into_response()),
        Err(ReplayError::Store(e)) => {
            error!("Replay failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}
