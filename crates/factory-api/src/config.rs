//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Rate limit burst
    pub rate_limit_burst: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Basic-auth username required on every mutating endpoint
    pub basic_auth_user: String,
    /// Basic-auth password required on every mutating endpoint
    pub basic_auth_pass: String,
    /// Path to the shared sqlite store, same file the workers open
    pub db_path: PathBuf,
    /// Storage root for workspace/outbox/previews/qa/logs, shared with the workers
    pub storage_root: PathBuf,
    /// Origin backend used for draft preflight on submission
    pub origin_backend: factory_worker::OriginBackend,
    /// Local origin root, when `origin_backend = local`
    pub origin_local_root: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10MB
            environment: "development".to_string(),
            basic_auth_user: "admin".to_string(),
            basic_auth_pass: "change-me".to_string(),
            db_path: PathBuf::from("factory.db"),
            storage_root: PathBuf::from("storage"),
            origin_backend: factory_worker::OriginBackend::Local,
            origin_local_root: PathBuf::from("origin"),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            basic_auth_user: std::env::var("BASIC_AUTH_USER").unwrap_or_else(|_| "admin".to_string()),
            basic_auth_pass: std::env::var("BASIC_AUTH_PASS").unwrap_or_else(|_| "change-me".to_string()),
            db_path: std::env::var("DB_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("factory.db")),
            storage_root: std::env::var("STORAGE_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("storage")),
            origin_backend: match std::env::var("ORIGIN_BACKEND").as_deref() {
                Ok("gdrive") => factory_worker::OriginBackend::Gdrive,
                _ => factory_worker::OriginBackend::Local,
            },
            origin_local_root: std::env::var("ORIGIN_LOCAL_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("origin")),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
