//! REST endpoints for the stored profile and the direct input form.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::info;

use crate::api::{ApiError, finalize_response};
use crate::wizard::direct::DirectForm;
use crate::wizard::finalize::{Finalizer, SubmissionGuard};

/// Shared state for the profile handlers.
#[derive(Clone)]
pub struct ProfileState {
    pub finalizer: Finalizer,
    /// Guard for the direct form; the wizard sessions carry their own.
    pub direct_guard: Arc<SubmissionGuard>,
}

pub fn profile_routes(finalizer: Finalizer) -> Router {
    let state = ProfileState {
        finalizer,
        direct_guard: Arc::new(SubmissionGuard::new()),
    };

    Router::new()
        .route("/api/profile", get(get_profile).delete(clear_profile))
        .route("/api/profile/next", get(next_screen))
        .route("/api/profile/direct", post(submit_direct))
        .with_state(state)
}

async fn get_profile(State(state): State<ProfileState>) -> Result<Response, ApiError> {
    let profile = state
        .finalizer
        .store()
        .get()
        .await
        .ok_or_else(|| ApiError::NotFound("No profile submitted".into()))?;
    let bmi = profile.bmi_display();
    Ok(Json(json!({"profile": profile, "bmi": bmi})).into_response())
}

async fn clear_profile(State(state): State<ProfileState>) -> impl IntoResponse {
    state.finalizer.store().clear().await;
    info!("Profile cleared");
    Json(json!({"status": "cleared"}))
}

async fn next_screen(State(state): State<ProfileState>) -> impl IntoResponse {
    let next = state.finalizer.store().next_screen().await;
    Json(json!({"next": next.path(), "screen": next}))
}

async fn submit_direct(
    State(state): State<ProfileState>,
    Json(form): Json<DirectForm>,
) -> Result<Response, ApiError> {
    let outcome = form.submit(&state.finalizer, &state.direct_guard).await?;
    Ok(finalize_response(outcome))
}
