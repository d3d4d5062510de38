//! WebSocket server + REST endpoints for wizard sessions.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::finalize::Finalizer;
use super::machine::Selection;
use super::session::{SessionEvent, SessionRegistry, SessionSnapshot, WizardSession};
use crate::api::{ApiError, finalize_response};

/// Shared state for the wizard handlers.
#[derive(Clone)]
pub struct WizardState {
    pub sessions: Arc<SessionRegistry>,
    pub finalizer: Finalizer,
}

/// Build the router for wizard sessions and their WebSocket feed.
pub fn wizard_routes(sessions: Arc<SessionRegistry>, finalizer: Finalizer) -> Router {
    let state = WizardState {
        sessions,
        finalizer,
    };

    Router::new()
        .route("/api/wizard/sessions", post(create_session))
        .route("/api/wizard/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/wizard/sessions/{id}/message", post(send_message))
        .route("/api/wizard/sessions/{id}/select", post(select_option))
        .route("/api/wizard/sessions/{id}/reset", post(reset_session))
        .route("/api/wizard/sessions/{id}/finalize", post(finalize_session))
        .route("/ws/wizard/{id}", get(ws_handler))
        .with_state(state)
}

async fn session(state: &WizardState, id: &str) -> Result<Arc<WizardSession>, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::BadRequest("Invalid session ID".into()))?;
    Ok(state.sessions.get(id).await?)
}

// ── REST Endpoints ──────────────────────────────────────────────────────

async fn create_session(State(state): State<WizardState>) -> Json<SessionSnapshot> {
    let session = state.sessions.create().await;
    Json(session.snapshot().await)
}

async fn get_session(
    State(state): State<WizardState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = session(&state, &id).await?;
    Ok(Json(session.snapshot().await))
}

async fn delete_session(
    State(state): State<WizardState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = session(&state, &id).await?;
    session.reset().await;
    state.sessions.remove(session.id()).await;
    info!(session_id = %session.id(), "Wizard session removed");
    Ok(Json(serde_json::json!({"status": "removed"})))
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

async fn send_message(
    State(state): State<WizardState>,
    Path(id): Path<String>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = session(&state, &id).await?;
    session.send_text(&body.text).await?;
    Ok(Json(session.snapshot().await))
}

#[derive(Deserialize)]
struct SelectRequest {
    kind: String,
    value: String,
}

async fn select_option(
    State(state): State<WizardState>,
    Path(id): Path<String>,
    Json(body): Json<SelectRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = session(&state, &id).await?;
    let selection = Selection::parse(&body.kind, &body.value)?;
    session.select(selection).await?;
    Ok(Json(session.snapshot().await))
}

async fn reset_session(
    State(state): State<WizardState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = session(&state, &id).await?;
    session.reset().await;
    Ok(Json(session.snapshot().await))
}

async fn finalize_session(
    State(state): State<WizardState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let session = session(&state, &id).await?;
    let outcome = session.finalize(&state.finalizer).await?;
    Ok(finalize_response(outcome))
}

// ── WebSocket ───────────────────────────────────────────────────────────

/// Full state, sent on connect and after lagging behind. Later frames are
/// [`SessionEvent`]s.
#[derive(Serialize)]
#[serde(tag = "type", rename = "transcript_sync")]
struct TranscriptSync {
    snapshot: SessionSnapshot,
}

/// Actions a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientAction {
    Message { text: String },
    Select { kind: String, value: String },
    Reset,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<WizardState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let session = session(&state, &id).await?;
    info!(session_id = %session.id(), "Wizard WebSocket client connecting");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session)).into_response())
}

async fn send_frame<T: Serialize>(socket: &mut WebSocket, frame: &T) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize WS frame");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, session: Arc<WizardSession>) {
    // Subscribe before the sync so nothing lands in between unseen.
    let mut rx = session.subscribe();

    let sync = TranscriptSync {
        snapshot: session.snapshot().await,
    };
    if !send_frame(&mut socket, &sync).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_frame(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind session events");
                        let sync = TranscriptSync {
                            snapshot: session.snapshot().await,
                        };
                        if !send_frame(&mut socket, &sync).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Session event channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &session).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Wizard WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!(session_id = %session.id(), "Wizard WebSocket connection closed");
}

async fn handle_client_message(text: &str, session: &WizardSession) {
    let action = match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return;
        }
    };

    let result = match action {
        ClientAction::Message { text } => session.send_text(&text).await.map(|_| ()),
        ClientAction::Select { kind, value } => match Selection::parse(&kind, &value) {
            Ok(selection) => session.select(selection).await.map(|_| ()),
            Err(e) => Err(e),
        },
        ClientAction::Reset => {
            session.reset().await;
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(session_id = %session.id(), error = %e, "WS action rejected");
    }
}
