//! ProfileStore: explicit, injectable holder of the finalized profile.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::DatabaseError;
use crate::store::Database;
use crate::wizard::model::PersonalInfo;

/// Settings keys used for profile persistence.
pub mod settings_keys {
    /// Key for the PersonalInfo JSON blob in the settings table.
    pub const PERSONAL_INFO: &str = "personal_info";
    /// Default user ID (single-user system).
    pub const DEFAULT_USER: &str = "default";
}

/// Where the client should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextScreen {
    /// Collect personal details first.
    PersonalDetails,
    /// Browse and request recipes.
    Recipes,
}

impl NextScreen {
    /// Route the client navigates to.
    pub fn path(&self) -> &'static str {
        match self {
            Self::PersonalDetails => "/flows/personal-details",
            Self::Recipes => "/recipes",
        }
    }

    /// Screens that need a profile send the user to the details flow until
    /// one has been submitted.
    pub fn for_profile(profile: Option<&PersonalInfo>) -> Self {
        match profile {
            Some(_) => Self::Recipes,
            None => Self::PersonalDetails,
        }
    }
}

/// Process-wide profile holder, cloned into every component that needs it.
///
/// Reads and writes go through the in-memory copy; when a database is
/// attached every write is mirrored to the settings table. Persistence
/// failures are logged and do not fail the write.
#[derive(Clone)]
pub struct ProfileStore {
    profile: Arc<RwLock<Option<PersonalInfo>>>,
    db: Option<Arc<dyn Database>>,
}

impl ProfileStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            profile: Arc::new(RwLock::new(None)),
            db: None,
        }
    }

    /// Open a store backed by the settings table, loading any saved profile.
    pub async fn load(db: Arc<dyn Database>) -> Result<Self, DatabaseError> {
        let saved = db
            .get_setting(settings_keys::DEFAULT_USER, settings_keys::PERSONAL_INFO)
            .await?;

        let profile = match saved {
            Some(value) => match serde_json::from_value::<PersonalInfo>(value) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Ignoring unreadable saved profile: {}", e);
                    None
                }
            },
            None => None,
        };
        info!(loaded = profile.is_some(), "Profile store opened");

        Ok(Self {
            profile: Arc::new(RwLock::new(profile)),
            db: Some(db),
        })
    }

    /// The current profile, if one was submitted.
    pub async fn get(&self) -> Option<PersonalInfo> {
        self.profile.read().await.clone()
    }

    /// Replace the stored profile.
    pub async fn set(&self, info: PersonalInfo) {
        {
            let mut guard = self.profile.write().await;
            *guard = Some(info.clone());
        }
        self.persist(Some(&info)).await;
    }

    /// Forget the stored profile.
    pub async fn clear(&self) {
        {
            let mut guard = self.profile.write().await;
            *guard = None;
        }
        self.persist(None).await;
    }

    /// Navigation decision for screens gated on having a profile.
    pub async fn next_screen(&self) -> NextScreen {
        NextScreen::for_profile(self.profile.read().await.as_ref())
    }

    async fn persist(&self, info: Option<&PersonalInfo>) {
        let Some(db) = &self.db else {
            return;
        };

        let result = match info {
            Some(info) => {
                let value = match serde_json::to_value(info) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Failed to serialize profile: {}", e);
                        return;
                    }
                };
                db.set_setting(
                    settings_keys::DEFAULT_USER,
                    settings_keys::PERSONAL_INFO,
                    &value,
                )
                .await
            }
            None => db
                .delete_setting(settings_keys::DEFAULT_USER, settings_keys::PERSONAL_INFO)
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            warn!("Failed to persist profile: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    fn sample() -> PersonalInfo {
        PersonalInfo {
            sex: "여성".to_string(),
            age: 34,
            height_cm: 165.0,
            weight_kg: 58.0,
            diet: "고단백".to_string(),
        }
    }

    #[tokio::test]
    async fn in_memory_set_get_clear() {
        let store = ProfileStore::in_memory();
        assert!(store.get().await.is_none());
        assert_eq!(store.next_screen().await, NextScreen::PersonalDetails);

        store.set(sample()).await;
        assert_eq!(store.get().await, Some(sample()));
        assert_eq!(store.next_screen().await, NextScreen::Recipes);

        store.clear().await;
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = ProfileStore::in_memory();
        let reader = store.clone();
        store.set(sample()).await;
        assert_eq!(reader.get().await, Some(sample()));
    }

    #[tokio::test]
    async fn persisted_profile_is_reloaded() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());

        let store = ProfileStore::load(Arc::clone(&db)).await.unwrap();
        assert!(store.get().await.is_none());
        store.set(sample()).await;

        let reopened = ProfileStore::load(Arc::clone(&db)).await.unwrap();
        assert_eq!(reopened.get().await, Some(sample()));

        reopened.clear().await;
        let cleared = ProfileStore::load(db).await.unwrap();
        assert!(cleared.get().await.is_none());
    }

    #[tokio::test]
    async fn unreadable_saved_profile_is_ignored() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        db.set_setting(
            settings_keys::DEFAULT_USER,
            settings_keys::PERSONAL_INFO,
            &serde_json::json!({"sex": 1}),
        )
        .await
        .unwrap();
        let store = ProfileStore::load(db).await.unwrap();
        assert!(store.get().await.is_none());
    }

    #[test]
    fn next_screen_paths() {
        assert_eq!(NextScreen::PersonalDetails.path(), "/flows/personal-details");
        assert_eq!(NextScreen::Recipes.path(), "/recipes");
        assert_eq!(NextScreen::for_profile(Some(&sample())), NextScreen::Recipes);
    }
}
