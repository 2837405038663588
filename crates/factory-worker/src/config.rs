//! Worker process configuration, loaded once at startup from the
//! environment and passed explicitly to every role (no process-wide
//! singleton).

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginBackend {
    Local,
    Gdrive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadBackend {
    Youtube,
    Mock,
}

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub idle_sec: u64,
    pub grace_sec: u64,
    pub min_delta_bytes: u64,
    pub kill_after_sec: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            idle_sec: 120,
            grace_sec: 20,
            min_delta_bytes: 4096,
            kill_after_sec: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub storage_root: PathBuf,
    pub db_path: PathBuf,
    pub renderer_path: PathBuf,
    pub origin_backend: OriginBackend,
    pub origin_local_root: PathBuf,
    pub upload_backend: UploadBackend,
    pub qa_volumedetect_seconds: u64,
    pub job_lock_ttl_sec: i64,
    pub retry_backoff_sec: i64,
    pub max_render_attempts: i32,
    pub max_upload_attempts: i32,
    pub worker_sleep_sec: u64,
    pub watchdog: WatchdogConfig,
    pub policies_path: Option<PathBuf>,
    pub yt_tokens_base: Option<PathBuf>,
    pub yt_global_client_secret: Option<PathBuf>,
    pub yt_global_token: Option<PathBuf>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let storage_root = env_var("STORAGE_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./storage"));
        let db_path = env_var("DB_PATH").map(PathBuf::from).unwrap_or_else(|| storage_root.join("factory.db"));
        let renderer_path = env_var("RENDERER_PATH").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./renderer"));

        let origin_backend = match env_var("ORIGIN_BACKEND").as_deref() {
            Some("gdrive") => OriginBackend::Gdrive,
            _ => OriginBackend::Local,
        };
        let origin_local_root = env_var("ORIGIN_LOCAL_ROOT").map(PathBuf::from).unwrap_or_else(|| storage_root.join("origin"));

        let upload_backend = match env_var("UPLOAD_BACKEND").as_deref() {
            Some("youtube") => UploadBackend::Youtube,
            _ => UploadBackend::Mock,
        };

        Self {
            storage_root,
            db_path,
            renderer_path,
            origin_backend,
            origin_local_root,
            upload_backend,
            qa_volumedetect_seconds: env_parsed("QA_VOLUMEDETECT_SECONDS", 60),
            job_lock_ttl_sec: env_parsed("JOB_LOCK_TTL_SEC", 12 * 3600),
            retry_backoff_sec: env_parsed("RETRY_BACKOFF_SEC", 300),
            max_render_attempts: env_parsed("MAX_RENDER_ATTEMPTS", 3),
            max_upload_attempts: env_parsed("MAX_UPLOAD_ATTEMPTS", 3),
            worker_sleep_sec: env_parsed("WORKER_SLEEP_SEC", 5),
            watchdog: WatchdogConfig {
                idle_sec: env_parsed("RENDER_WATCHDOG_IDLE_SEC", 120),
                grace_sec: env_parsed("RENDER_WATCHDOG_GRACE_SEC", 20),
                min_delta_bytes: env_parsed("RENDER_WATCHDOG_MIN_DELTA_BYTES_SEC", 4096),
                kill_after_sec: env_parsed("RENDER_WATCHDOG_KILL_AFTER_SEC", 30),
            },
            policies_path: env_var("QA_POLICIES_PATH").map(PathBuf::from),
            yt_tokens_base: env_var("YT_TOKENS_BASE").map(PathBuf::from),
            yt_global_client_secret: env_var("YT_CLIENT_SECRET_JSON").map(PathBuf::from),
            yt_global_token: env_var("YT_TOKEN_JSON").map(PathBuf::from),
        }
    }

    pub fn worker_sleep(&self) -> Duration {
        Duration::from_secs(self.worker_sleep_sec)
    }
}
