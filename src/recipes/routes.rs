//! REST endpoints that front the recipe backend.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::model::is_object_id;
use super::{MAX_IMAGES, RecipeImage, RecipeService};
use crate::api::ApiError;
use crate::profile::{NextScreen, ProfileStore};

/// Upload limit for a full batch of photos.
const UPLOAD_LIMIT_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_CARD_LIMIT: usize = 30;

#[derive(Clone)]
pub struct RecipeState {
    pub service: Arc<dyn RecipeService>,
    pub store: ProfileStore,
}

pub fn recipe_routes(service: Arc<dyn RecipeService>, store: ProfileStore) -> Router {
    let state = RecipeState { service, store };

    Router::new()
        .route("/api/recipes/recommend", post(recommend))
        .route("/api/recipes/cards", get(list_cards))
        .route("/api/recipes/cards/{id}", get(card_detail))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .with_state(state)
}

/// Recommendations need a profile; without one the client is sent to the
/// personal-details flow first.
async fn recommend(
    State(state): State<RecipeState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    if state.store.next_screen().await == NextScreen::PersonalDetails {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Personal details required",
                "next": NextScreen::PersonalDetails.path(),
            })),
        )
            .into_response());
    }

    let mut images = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let mime = field
            .content_type()
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        // Empty parts are blank file inputs; they never count toward the cap.
        if bytes.is_empty() {
            continue;
        }
        images.push(RecipeImage::new(file_name, mime, bytes.to_vec()));
        if images.len() >= MAX_IMAGES {
            break;
        }
    }

    let cards = state.service.recommend(&images).await?;
    info!(cards = cards.len(), "Recommendations returned");
    Ok(Json(cards).into_response())
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_cards(
    State(state): State<RecipeState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let cards = state
        .service
        .cards_flat(query.limit.unwrap_or(DEFAULT_CARD_LIMIT))
        .await?;
    Ok(Json(cards).into_response())
}

async fn card_detail(
    State(state): State<RecipeState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    if !is_object_id(&id) {
        return Err(ApiError::BadRequest("Invalid card ID".into()));
    }
    let full = state.service.card_full(&id).await?;
    Ok(Json(full).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::error::RecipeError;
    use crate::recipes::{RecipeFull, RecipeSummary, usable_images};
    use crate::wizard::model::PersonalInfo;

    #[derive(Default)]
    struct StubRecipes {
        uploaded: Mutex<usize>,
        limit: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl RecipeService for StubRecipes {
        async fn recommend(
            &self,
            images: &[RecipeImage],
        ) -> Result<Vec<RecipeSummary>, RecipeError> {
            let usable = usable_images(images)?;
            *self.uploaded.lock().unwrap() = usable.len();
            Ok(vec![RecipeSummary {
                title: "포케".to_string(),
                ..Default::default()
            }])
        }

        async fn card_full(&self, id: &str) -> Result<RecipeFull, RecipeError> {
            Ok(RecipeFull {
                id: id.to_string(),
                ..Default::default()
            })
        }

        async fn cards_flat(&self, limit: usize) -> Result<Vec<RecipeSummary>, RecipeError> {
            *self.limit.lock().unwrap() = Some(limit);
            Ok(Vec::new())
        }
    }

    fn profile() -> PersonalInfo {
        PersonalInfo {
            sex: "여성".to_string(),
            age: 30,
            height_cm: 160.0,
            weight_kg: 50.0,
            diet: "키토".to_string(),
        }
    }

    fn multipart_request(parts: usize) -> Request<Body> {
        multipart_with(&vec!["PNGDATA"; parts])
    }

    /// One `image_{i}` file part per entry, with the entry as its content.
    fn multipart_with(contents: &[&str]) -> Request<Body> {
        let boundary = "XBOUNDARY";
        let mut body = String::new();
        for (i, content) in contents.iter().enumerate() {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image_{i}\"; filename=\"p{i}.png\"\r\nContent-Type: image/png\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        Request::post("/api/recipes/recommend")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn recommend_requires_profile() {
        let service = Arc::new(StubRecipes::default());
        let app = recipe_routes(service.clone(), ProfileStore::in_memory());

        let resp = app.oneshot(multipart_request(1)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(*service.uploaded.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn recommend_forwards_images() {
        let store = ProfileStore::in_memory();
        store.set(profile()).await;
        let service = Arc::new(StubRecipes::default());
        let app = recipe_routes(service.clone(), store);

        let resp = app.oneshot(multipart_request(12)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*service.uploaded.lock().unwrap(), MAX_IMAGES);
    }

    #[tokio::test]
    async fn empty_parts_do_not_count_toward_the_cap() {
        let store = ProfileStore::in_memory();
        store.set(profile()).await;
        let service = Arc::new(StubRecipes::default());
        let app = recipe_routes(service.clone(), store);

        let mut contents = vec![""; MAX_IMAGES];
        contents.push("PNGDATA");
        let resp = app.oneshot(multipart_with(&contents)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*service.uploaded.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn recommend_without_images_is_bad_request() {
        let store = ProfileStore::in_memory();
        store.set(profile()).await;
        let app = recipe_routes(Arc::new(StubRecipes::default()), store);

        let resp = app.oneshot(multipart_request(0)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn card_detail_validates_id() {
        let app = recipe_routes(Arc::new(StubRecipes::default()), ProfileStore::in_memory());

        let resp = app
            .clone()
            .oneshot(
                Request::get("/api/recipes/cards/123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .oneshot(
                Request::get("/api/recipes/cards/64b7f0c2a1b2c3d4e5f60718")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_uses_default_limit() {
        let service = Arc::new(StubRecipes::default());
        let app = recipe_routes(service.clone(), ProfileStore::in_memory());

        let resp = app
            .oneshot(Request::get("/api/recipes/cards").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*service.limit.lock().unwrap(), Some(DEFAULT_CARD_LIMIT));
    }
}
