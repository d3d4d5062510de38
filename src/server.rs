//! Router assembly: every route group behind one CORS policy.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;

use crate::config::ReplyPacing;
use crate::preferences::PreferencesService;
use crate::profile::{ProfileStore, profile_routes};
use crate::recipes::{RecipeService, recipe_routes};
use crate::wizard::finalize::Finalizer;
use crate::wizard::session::SessionRegistry;
use crate::wizard::ws::wizard_routes;

/// Everything the routers need.
#[derive(Clone)]
pub struct Services {
    pub preferences: Arc<dyn PreferencesService>,
    pub recipes: Arc<dyn RecipeService>,
    pub store: ProfileStore,
    pub sessions: Arc<SessionRegistry>,
}

impl Services {
    pub fn new(
        preferences: Arc<dyn PreferencesService>,
        recipes: Arc<dyn RecipeService>,
        store: ProfileStore,
        pacing: ReplyPacing,
    ) -> Self {
        Self {
            preferences,
            recipes,
            store,
            sessions: SessionRegistry::new(pacing),
        }
    }

    /// Replace the session registry with one that expires sessions idle
    /// for `ttl`.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionRegistry::with_ttl(self.sessions.pacing(), ttl);
        self
    }

    pub fn finalizer(&self) -> Finalizer {
        Finalizer::new(Arc::clone(&self.preferences), self.store.clone())
    }
}

/// Build the full application router.
pub fn build_app(services: &Services, cors_origins: &[String]) -> Router {
    let finalizer = services.finalizer();

    let app = Router::new()
        .route("/health", get(health))
        .merge(wizard_routes(
            Arc::clone(&services.sessions),
            finalizer.clone(),
        ))
        .merge(profile_routes(finalizer))
        .merge(recipe_routes(
            Arc::clone(&services.recipes),
            services.store.clone(),
        ));

    if cors_origins.is_empty() {
        return app;
    }
    let origins: Vec<HeaderValue> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
    app.layer(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "diet-coach"
    }))
}
