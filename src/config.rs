//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Delays applied to assistant replies so the bot appears to be typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyPacing {
    /// Delay for ordinary replies.
    pub short: Duration,
    /// Delay for the rendered field list that follows the summary intro.
    pub summary: Duration,
}

impl ReplyPacing {
    /// No delays at all. Replies still go through the scheduler.
    pub fn immediate() -> Self {
        Self {
            short: Duration::ZERO,
            summary: Duration::ZERO,
        }
    }
}

impl Default for ReplyPacing {
    fn default() -> Self {
        Self {
            short: Duration::from_millis(150),
            summary: Duration::from_millis(800),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port for the HTTP/WebSocket server.
    pub port: u16,
    /// Path of the local libSQL database. `None` keeps the profile in memory only.
    pub db_path: Option<PathBuf>,
    /// Base URL of the backend that owns `/preferences` and `/recipes`.
    pub api_base: String,
    /// Reply pacing for wizard sessions.
    pub pacing: ReplyPacing,
    /// Wizard sessions idle for this long are dropped.
    pub session_ttl: Duration,
    /// Origins allowed by CORS. Empty disables the CORS layer.
    pub cors_origins: Vec<String>,
    /// Run the stdin wizard REPL next to the server.
    pub cli: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: Some(PathBuf::from("./data/diet-coach.db")),
            api_base: "http://localhost:8000".to_string(),
            pacing: ReplyPacing::default(),
            session_ttl: Duration::from_secs(30 * 60),
            cors_origins: vec!["http://localhost:3000".to_string()],
            cli: false,
        }
    }
}

impl AppConfig {
    /// Build the configuration from `DIET_COACH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("DIET_COACH_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "DIET_COACH_PORT".to_string(),
                message: format!("{e}"),
            })?,
            None => defaults.port,
        };

        let db_path = match lookup("DIET_COACH_DB_PATH") {
            Some(raw) if raw.trim().is_empty() || raw.trim() == "none" => None,
            Some(raw) => Some(PathBuf::from(raw.trim())),
            None => defaults.db_path,
        };

        let api_base = lookup("DIET_COACH_API_BASE")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_base);

        let short = parse_duration(&lookup, "DIET_COACH_REPLY_DELAY_MS", Duration::from_millis)?
            .unwrap_or(defaults.pacing.short);
        let summary =
            parse_duration(&lookup, "DIET_COACH_SUMMARY_DELAY_MS", Duration::from_millis)?
                .unwrap_or(defaults.pacing.summary);
        let session_ttl =
            parse_duration(&lookup, "DIET_COACH_SESSION_TTL_SECS", Duration::from_secs)?
                .unwrap_or(defaults.session_ttl);

        let cors_origins = match lookup("DIET_COACH_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };

        let cli = lookup("DIET_COACH_CLI")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(defaults.cli);

        Ok(Self {
            port,
            db_path,
            api_base,
            pacing: ReplyPacing { short, summary },
            session_ttl,
            cors_origins,
            cli,
        })
    }
}

fn parse_duration<F>(
    lookup: &F,
    key: &str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|n| Some(unit(n)))
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            }),
        None => Ok(None),
    }
}
