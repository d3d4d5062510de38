//! Preferences submission service: where finalized profiles are sent.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;
use crate::wizard::model::PersonalInfo;

pub use http::HttpPreferencesClient;

/// Generic message used when the service gives no usable reason.
pub const SUBMIT_FAILED_MESSAGE: &str = "개인정보 저장에 실패했습니다.";

/// Acknowledgement returned by the preferences backend.
///
/// Only `ok` is relied on; the rest is informational and tolerated missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferencesAck {
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default, rename = "anonId", skip_serializing_if = "Option::is_none")]
    pub anon_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kcal_target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_goal: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// Accepts a finalized profile and acknowledges or rejects it.
#[async_trait]
pub trait PreferencesService: Send + Sync {
    async fn submit(&self, profile: &PersonalInfo) -> Result<PreferencesAck, SubmissionError>;
}
