//! Recipe recommendation and detail: the collaborators reached after the
//! personal-details flow.

pub mod client;
pub mod model;
pub mod routes;

use async_trait::async_trait;

use crate::error::RecipeError;

pub use client::HttpRecipeClient;
pub use model::{RawRecipe, RecipeFull, RecipeSummary, normalize_list};
pub use routes::recipe_routes;

/// At most this many images are sent per recommendation.
pub const MAX_IMAGES: usize = 9;

/// One uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeImage {
    /// Original file name; generated from the MIME type when empty.
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl RecipeImage {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// File name to upload under, `image_{index}.{ext}` when none was given.
    pub fn upload_name(&self, index: usize) -> String {
        if !self.file_name.trim().is_empty() {
            return self.file_name.clone();
        }
        let ext = self
            .mime
            .split('/')
            .nth(1)
            .filter(|e| !e.is_empty() && e.len() <= 5)
            .unwrap_or("jpg");
        format!("image_{index}.{ext}")
    }
}

/// Drop empty images and cap the batch at [`MAX_IMAGES`].
///
/// Returns [`RecipeError::NoImages`] when nothing usable is left.
pub fn usable_images(images: &[RecipeImage]) -> Result<Vec<&RecipeImage>, RecipeError> {
    let usable: Vec<&RecipeImage> = images
        .iter()
        .filter(|img| !img.bytes.is_empty())
        .take(MAX_IMAGES)
        .collect();
    if usable.is_empty() {
        return Err(RecipeError::NoImages);
    }
    Ok(usable)
}

/// Backend recipe endpoints.
#[async_trait]
pub trait RecipeService: Send + Sync {
    /// Recommend recipes for a batch of food photos.
    async fn recommend(&self, images: &[RecipeImage]) -> Result<Vec<RecipeSummary>, RecipeError>;

    /// Full detail for one card.
    async fn card_full(&self, id: &str) -> Result<RecipeFull, RecipeError>;

    /// Browse cards without uploading anything.
    async fn cards_flat(&self, limit: usize) -> Result<Vec<RecipeSummary>, RecipeError>;
}
