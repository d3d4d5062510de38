//! HTTP error mapping and response helpers shared by the route modules.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{Error, RecipeError, SubmissionError, WizardError};
use crate::wizard::finalize::FinalizeOutcome;

/// An error rendered as `{"error": message}` with a status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error("{0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Wizard(e) => Self::Wizard(e),
            Error::Submission(e) => Self::Submission(e),
            Error::Recipe(e) => Self::Recipe(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Wizard(WizardError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Wizard(WizardError::UnexpectedEvent { .. }) => StatusCode::CONFLICT,
            Self::Wizard(WizardError::UnknownOption { .. }) => StatusCode::BAD_REQUEST,
            Self::Submission(SubmissionError::Incomplete { .. })
            | Self::Submission(SubmissionError::Invalid { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Submission(SubmissionError::Failed { .. }) => StatusCode::BAD_GATEWAY,
            Self::Recipe(RecipeError::NoImages) => StatusCode::BAD_REQUEST,
            Self::Recipe(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Submission(SubmissionError::Invalid { field, message }) => {
                json!({"error": message, "field": field})
            }
            other => json!({"error": other.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}

/// `200 {next, profile, ack}` on success, `409` while a submission is in flight.
pub fn finalize_response(outcome: FinalizeOutcome) -> Response {
    match outcome {
        FinalizeOutcome::Proceed { next, profile, ack } => {
            let bmi = profile.bmi_display();
            (
                StatusCode::OK,
                Json(json!({
                    "next": next.path(),
                    "profile": profile,
                    "bmi": bmi,
                    "ack": ack,
                })),
            )
                .into_response()
        }
        FinalizeOutcome::AlreadySubmitting => (
            StatusCode::CONFLICT,
            Json(json!({"error": "already submitting"})),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::error::DatabaseError;
    use crate::wizard::state::WizardStep;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                ApiError::from(WizardError::SessionNotFound(Uuid::nil())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(WizardError::UnexpectedEvent {
                    step: WizardStep::AwaitingAge,
                    event: "sex selection".to_string(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(SubmissionError::Incomplete {
                    message: "x".to_string(),
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::from(SubmissionError::Failed {
                    message: "x".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::from(RecipeError::NoImages), StatusCode::BAD_REQUEST),
            (
                ApiError::from(Error::from(WizardError::UnexpectedEvent {
                    step: WizardStep::AwaitingConfirmation,
                    event: "finalize".to_string(),
                })),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(Error::from(DatabaseError::Query("x".to_string()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn already_submitting_is_conflict() {
        let resp = finalize_response(FinalizeOutcome::AlreadySubmitting);
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
