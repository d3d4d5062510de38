//! Finalization: turn a complete draft into a submitted profile.
//!
//! Shared by the chat wizard and the direct input form: validate
//! completeness, submit to the preferences service, mirror into the profile
//! store, and tell the client where to go next.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::model::{CollectedProfile, PersonalInfo};
use crate::error::SubmissionError;
use crate::preferences::{PreferencesAck, PreferencesService};
use crate::profile::{NextScreen, ProfileStore};

/// Where a finalize request stands.
///
/// `Submitting` blocks further finalize requests until the service answers.
/// A failure returns to `Idle` so the user can retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Submitted,
}

/// Per-flow re-entrancy guard.
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    state: Mutex<SubmissionState>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> SubmissionState {
        *self.state.lock().await
    }

    async fn settle(&self, state: SubmissionState) {
        *self.state.lock().await = state;
    }
}

/// Result of a finalize request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// Saved; the client should navigate to `next`.
    Proceed {
        next: NextScreen,
        profile: PersonalInfo,
        ack: PreferencesAck,
    },
    /// A previous request is still in flight; nothing was done.
    AlreadySubmitting,
}

/// Submits finalized profiles and records them in the profile store.
#[derive(Clone)]
pub struct Finalizer {
    service: Arc<dyn PreferencesService>,
    store: ProfileStore,
}

impl Finalizer {
    pub fn new(service: Arc<dyn PreferencesService>, store: ProfileStore) -> Self {
        Self { service, store }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Finalize `draft` under `guard`.
    ///
    /// 1. If a submission is in flight, return `AlreadySubmitting`.
    /// 2. If the draft is incomplete, fail without submitting.
    /// 3. Submit; on success write the profile store and return `Proceed`.
    /// 4. On failure release the guard and return the service's message.
    pub async fn finalize(
        &self,
        guard: &SubmissionGuard,
        draft: &CollectedProfile,
    ) -> Result<FinalizeOutcome, SubmissionError> {
        let profile = {
            let mut state = guard.state.lock().await;
            if *state == SubmissionState::Submitting {
                info!("Finalize ignored: submission already in flight");
                return Ok(FinalizeOutcome::AlreadySubmitting);
            }
            let profile = draft.finalize()?;
            *state = SubmissionState::Submitting;
            profile
        };

        self.submit(guard, profile).await
    }

    /// Submit an already finalized profile under `guard`.
    pub async fn submit_profile(
        &self,
        guard: &SubmissionGuard,
        profile: PersonalInfo,
    ) -> Result<FinalizeOutcome, SubmissionError> {
        {
            let mut state = guard.state.lock().await;
            if *state == SubmissionState::Submitting {
                info!("Submit ignored: submission already in flight");
                return Ok(FinalizeOutcome::AlreadySubmitting);
            }
            *state = SubmissionState::Submitting;
        }
        self.submit(guard, profile).await
    }

    async fn submit(
        &self,
        guard: &SubmissionGuard,
        profile: PersonalInfo,
    ) -> Result<FinalizeOutcome, SubmissionError> {
        match self.service.submit(&profile).await {
            Ok(ack) => {
                self.store.set(profile.clone()).await;
                guard.settle(SubmissionState::Submitted).await;
                info!(sex = %profile.sex, diet = %profile.diet, "Profile submitted");
                Ok(FinalizeOutcome::Proceed {
                    next: NextScreen::Recipes,
                    profile,
                    ack,
                })
            }
            Err(e) => {
                guard.settle(SubmissionState::Idle).await;
                warn!("Profile submission failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::wizard::model::{DietPreference, Sex};

    /// Records submissions; optionally fails or waits for a release signal.
    pub(crate) struct StubService {
        pub calls: AtomicUsize,
        pub fail_with: Option<String>,
        pub gate: Option<Arc<Notify>>,
    }

    impl StubService {
        pub(crate) fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
                gate: None,
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::ok()
            }
        }

        pub(crate) fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl PreferencesService for StubService {
        async fn submit(&self, _profile: &PersonalInfo) -> Result<PreferencesAck, SubmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.fail_with {
                Some(message) => Err(SubmissionError::Failed {
                    message: message.clone(),
                }),
                None => Ok(PreferencesAck {
                    ok: true,
                    ..Default::default()
                }),
            }
        }
    }

    fn complete_draft() -> CollectedProfile {
        CollectedProfile {
            sex: Some(Sex::Male),
            age: Some(29),
            height_cm: Some(170.0),
            weight_kg: Some(65.5),
            diet_preference: Some(DietPreference::Balanced),
        }
    }

    #[tokio::test]
    async fn success_writes_store_and_navigates() {
        let service = Arc::new(StubService::ok());
        let store = ProfileStore::in_memory();
        let finalizer = Finalizer::new(service.clone(), store.clone());
        let guard = SubmissionGuard::new();

        let outcome = finalizer.finalize(&guard, &complete_draft()).await.unwrap();
        let FinalizeOutcome::Proceed { next, profile, .. } = outcome else {
            panic!("expected Proceed");
        };
        assert_eq!(next, NextScreen::Recipes);
        assert_eq!(profile.sex, "남성");
        assert_eq!(store.get().await, Some(profile));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state().await, SubmissionState::Submitted);
    }

    #[tokio::test]
    async fn incomplete_draft_is_not_submitted() {
        let service = Arc::new(StubService::ok());
        let store = ProfileStore::in_memory();
        let finalizer = Finalizer::new(service.clone(), store.clone());
        let guard = SubmissionGuard::new();

        let err = finalizer
            .finalize(&guard, &CollectedProfile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Incomplete { .. }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert!(store.get().await.is_none());
        assert_eq!(guard.state().await, SubmissionState::Idle);
    }

    #[tokio::test]
    async fn failure_releases_guard_for_retry() {
        let service = Arc::new(StubService::failing("server down"));
        let store = ProfileStore::in_memory();
        let finalizer = Finalizer::new(service.clone(), store.clone());
        let guard = SubmissionGuard::new();

        let err = finalizer.finalize(&guard, &complete_draft()).await.unwrap_err();
        assert_eq!(err.to_string(), "server down");
        assert_eq!(guard.state().await, SubmissionState::Idle);
        assert!(store.get().await.is_none());

        // Retry is allowed
        let _ = finalizer.finalize(&guard, &complete_draft()).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_finalize_is_a_no_op() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(StubService::gated(Arc::clone(&gate)));
        let finalizer = Finalizer::new(service.clone(), ProfileStore::in_memory());
        let guard = Arc::new(SubmissionGuard::new());

        let first = {
            let finalizer = finalizer.clone();
            let guard = Arc::clone(&guard);
            tokio::spawn(async move { finalizer.finalize(&guard, &complete_draft()).await })
        };

        // Wait until the first request is in flight.
        while guard.state().await != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }

        let second = finalizer.finalize(&guard, &complete_draft()).await.unwrap();
        assert_eq!(second, FinalizeOutcome::AlreadySubmitting);

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, FinalizeOutcome::Proceed { .. }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }
}
