//! HTTP client for the `/preferences` endpoint.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{PreferencesAck, PreferencesService, SUBMIT_FAILED_MESSAGE};
use crate::error::SubmissionError;
use crate::wizard::model::PersonalInfo;

/// Posts finalized profiles as JSON to `{base}/preferences`.
pub struct HttpPreferencesClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPreferencesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/preferences", self.base_url)
    }
}

#[async_trait]
impl PreferencesService for HttpPreferencesClient {
    async fn submit(&self, profile: &PersonalInfo) -> Result<PreferencesAck, SubmissionError> {
        let resp = self
            .client
            .post(self.url())
            .json(profile)
            .send()
            .await
            .map_err(|e| {
                warn!("Preferences request failed: {}", e);
                SubmissionError::Failed {
                    message: SUBMIT_FAILED_MESSAGE.to_string(),
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, "Preferences service rejected profile");
            let message = if body.trim().is_empty() {
                SUBMIT_FAILED_MESSAGE.to_string()
            } else {
                body
            };
            return Err(SubmissionError::Failed { message });
        }

        // The body is informational; an unexpected shape still counts as saved.
        let ack = resp.json::<PreferencesAck>().await.unwrap_or_else(|e| {
            warn!("Unreadable preferences acknowledgement: {}", e);
            PreferencesAck {
                ok: true,
                ..Default::default()
            }
        });
        info!(anon_id = ?ack.anon_id, "Preferences saved");
        Ok(ack)
    }
}
