//! Configuration for Chorus
//!
//! CLI arguments and environment variable handling using clap. The parsed
//! `Args` is built once in `main` and handed to `AppState`; nothing below
//! the server reads the process environment.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Minimum signing secret length accepted outside dev mode
pub const MIN_SECRET_LEN: usize = 32;

/// How session credentials travel between client and server
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionTransport {
    /// HTTP-only `jwt` cookie (default)
    Cookie,
    /// `Authorization: Bearer <token>` header, token returned in the body
    Bearer,
    /// Both; the header wins when a request carries both
    Both,
}

impl SessionTransport {
    pub fn uses_cookie(self) -> bool {
        matches!(self, Self::Cookie | Self::Both)
    }

    pub fn uses_bearer(self) -> bool {
        matches!(self, Self::Bearer | Self::Both)
    }
}

/// Backing store for identities, posts and notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Chorus - social network backend
#[derive(Parser, Debug, Clone)]
#[command(name = "chorus")]
#[command(about = "Social network backend: identities, follow graph, posts and notifications")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Enable development mode (insecure default secret, in-memory fallback store)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Store backend
    #[arg(long, env = "STORE", value_enum, default_value = "mongo")]
    pub store: StoreBackend,

    /// MongoDB connection URI (must point at a replica set for transactions)
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "chorus")]
    pub mongodb_db: String,

    /// JWT secret for session signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Session lifetime in days
    #[arg(long, env = "SESSION_TTL_DAYS", default_value = "15")]
    pub session_ttl_days: u64,

    /// Session transport
    #[arg(long, env = "SESSION_TRANSPORT", value_enum, default_value = "cookie")]
    pub session_transport: SessionTransport,

    /// Mark the session cookie Secure (HTTPS only)
    #[arg(long, env = "COOKIE_SECURE", default_value = "false")]
    pub cookie_secure: bool,

    /// Base URL of the external image host (uploads pass through when unset)
    #[arg(long, env = "ASSET_HOST_URL")]
    pub asset_host_url: Option<String>,

    /// Image host API key
    #[arg(long, env = "ASSET_HOST_KEY")]
    pub asset_host_key: Option<String>,

    /// Image host API secret
    #[arg(long, env = "ASSET_HOST_SECRET")]
    pub asset_host_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Args {
    /// Get effective JWT secret (uses a fixed default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-only-insecure-secret-do-not-deploy-0000".to_string()),
            (None, false) => None,
        }
    }

    /// Session lifetime as a duration
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_days * 24 * 60 * 60)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.jwt_secret() {
            None => return Err("JWT_SECRET is required in production mode".to_string()),
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "JWT_SECRET must be at least {} characters",
                    MIN_SECRET_LEN
                ))
            }
            Some(_) => {}
        }

        if !(1..=365).contains(&self.session_ttl_days) {
            return Err("SESSION_TTL_DAYS must be between 1 and 365".to_string());
        }

        if self.asset_host_url.is_some()
            && (self.asset_host_key.is_none() || self.asset_host_secret.is_none())
        {
            return Err(
                "ASSET_HOST_KEY and ASSET_HOST_SECRET are required with ASSET_HOST_URL".to_string(),
            );
        }

        Ok(())
    }

    /// Arguments for tests and embedded use: in-memory store, dev secret.
    /// Built directly so the process environment is never consulted.
    pub fn for_tests() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            dev_mode: true,
            store: StoreBackend::Memory,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "chorus".to_string(),
            jwt_secret: None,
            session_ttl_days: 15,
            session_transport: SessionTransport::Cookie,
            cookie_secure: false,
            asset_host_url: None,
            asset_host_key: None,
            asset_host_secret: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}
