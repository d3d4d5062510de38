//! HTTP client for the `/recipes` endpoints.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use tracing::{debug, info, warn};

use super::model::{RecipeFull, RecipeSummary, normalize_list};
use super::{RecipeImage, RecipeService, usable_images};
use crate::error::RecipeError;

const RECOMMEND_FAILED_MESSAGE: &str = "레시피 추천 요청에 실패했습니다.";
const CARDS_FAILED_MESSAGE: &str = "카드 목록을 불러오지 못했습니다.";

pub struct HttpRecipeClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRecipeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// `{base}/seg/seg/...` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RecipeError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RecipeError::RequestFailed(format!("bad base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| RecipeError::RequestFailed("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn upload(
        &self,
        url: Url,
        images: &[&RecipeImage],
        field: impl Fn(usize) -> String,
    ) -> Result<Response, RecipeError> {
        let mut form = Form::new();
        for (i, img) in images.iter().enumerate() {
            let part = Part::bytes(img.bytes.clone())
                .file_name(img.upload_name(i))
                .mime_str(&img.mime)
                .map_err(|e| RecipeError::RequestFailed(format!("bad image type: {e}")))?;
            form = form.part(field(i), part);
        }

        self.client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecipeError::RequestFailed(e.to_string()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, RecipeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RecipeError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RecipeError::RequestFailed(format!("{}: {}", status.as_u16(), body)));
        }
        resp.json()
            .await
            .map_err(|e| RecipeError::InvalidResponse(e.to_string()))
    }
}

/// The response body, or `fallback` when it is empty.
async fn failure_message(resp: Response, fallback: &str) -> String {
    let body = resp.text().await.unwrap_or_default();
    if body.trim().is_empty() {
        fallback.to_string()
    } else {
        body
    }
}

async fn summaries(resp: Response) -> Result<Vec<RecipeSummary>, RecipeError> {
    let value: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| RecipeError::InvalidResponse(e.to_string()))?;
    Ok(normalize_list(&value))
}

#[async_trait]
impl RecipeService for HttpRecipeClient {
    async fn recommend(&self, images: &[RecipeImage]) -> Result<Vec<RecipeSummary>, RecipeError> {
        let images = usable_images(images)?;

        let resp = self
            .upload(
                self.endpoint(&["recipes", "recommend"])?,
                &images,
                |i| format!("image_{i}"),
            )
            .await?;
        if resp.status().is_success() {
            let cards = summaries(resp).await?;
            info!(images = images.len(), cards = cards.len(), "Recipes recommended");
            return Ok(cards);
        }

        // Older backends only accept a `files` list.
        warn!(status = %resp.status(), "Recommend upload rejected, retrying as files");
        let resp = self
            .upload(
                self.endpoint(&["recipes", "recommend", "files"])?,
                &images,
                |_| "files".to_string(),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(RecipeError::RequestFailed(
                failure_message(resp, RECOMMEND_FAILED_MESSAGE).await,
            ));
        }
        let cards = summaries(resp).await?;
        info!(images = images.len(), cards = cards.len(), "Recipes recommended");
        Ok(cards)
    }

    async fn card_full(&self, id: &str) -> Result<RecipeFull, RecipeError> {
        match self
            .get_json(self.endpoint(&["recipes", "cards", id, "full"])?)
            .await
        {
            Ok(full) => Ok(full),
            Err(e) => {
                debug!(id, error = %e, "Card detail unavailable, trying legacy endpoint");
                self.get_json(self.endpoint(&["recipes", id])?).await
            }
        }
    }

    async fn cards_flat(&self, limit: usize) -> Result<Vec<RecipeSummary>, RecipeError> {
        let mut url = self.endpoint(&["recipes", "cards", "flat"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RecipeError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(RecipeError::RequestFailed(
                failure_message(resp, CARDS_FAILED_MESSAGE).await,
            ));
        }
        summaries(resp).await
    }
}
