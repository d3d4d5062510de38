use std::sync::Arc;

use diet_coach::cli::WizardRepl;
use diet_coach::config::AppConfig;
use diet_coach::preferences::HttpPreferencesClient;
use diet_coach::profile::ProfileStore;
use diet_coach::recipes::HttpRecipeClient;
use diet_coach::server::{Services, build_app};
use diet_coach::store::{Database, LibSqlBackend};
use diet_coach::wizard::session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🥗 Diet Coach v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_base);
    eprintln!("   Wizard API: http://0.0.0.0:{}/api/wizard/sessions", config.port);
    eprintln!("   Wizard WS: ws://0.0.0.0:{}/ws/wizard/{{id}}", config.port);
    eprintln!("   Profile API: http://0.0.0.0:{}/api/profile", config.port);
    if config.cli {
        eprintln!("   Type an answer and press Enter. /help for commands, /quit to exit.\n");
    }

    // ── Database ─────────────────────────────────────────────────────────
    let store = match &config.db_path {
        Some(path) => {
            let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(path).await?);
            ProfileStore::load(db).await?
        }
        None => {
            tracing::info!("No database path configured, profile kept in memory");
            ProfileStore::in_memory()
        }
    };

    // ── Backend Clients ──────────────────────────────────────────────────
    let services = Services::new(
        Arc::new(HttpPreferencesClient::new(config.api_base.clone())),
        Arc::new(HttpRecipeClient::new(config.api_base.clone())),
        store,
        config.pacing,
    )
    .with_session_ttl(config.session_ttl);
    let _expiry_handle = session::spawn_expiry_task(Arc::clone(&services.sessions));
    let app = build_app(&services, &config.cors_origins);

    // ── HTTP / WebSocket Server ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Wizard server started");

    if !config.cli {
        axum::serve(listener, app).await?;
        return Ok(());
    }

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    // ── CLI Wizard ───────────────────────────────────────────────────────
    WizardRepl::new(config.pacing, services.finalizer()).run().await;
    server.abort();

    eprintln!("👋 Bye");
    Ok(())
}
