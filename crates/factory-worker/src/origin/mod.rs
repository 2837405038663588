//! Pluggable origin backend: the importer and preflight read release
//! manifests and inputs through this trait so the local filesystem tree and
//! a remote bucket share identical semantics.

pub mod gdrive;
pub mod local;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::WorkerResult;

pub use gdrive::GdriveOrigin;
pub use local::LocalOrigin;

#[derive(Debug, Clone)]
pub struct IncomingRelease {
    /// The import-side identifier that makes importation idempotent:
    /// absolute path on the local backend, file id on a remote bucket.
    pub external_id: String,
    /// Backend-specific handle for further reads (an absolute path for the
    /// local backend).
    pub folder: PathBuf,
}

#[async_trait]
pub trait Origin: Send + Sync {
    /// The channel's root folder (parent of `incoming/` and of the
    /// persistent `Image/`, `Covers/`, `Audio/` library folders used by
    /// preflight and the track-catalog worker).
    fn channel_root(&self, channel_slug: &str) -> PathBuf;

    /// Release folders under `channels/<slug>/incoming`.
    async fn list_channel_incoming(&self, channel_slug: &str) -> WorkerResult<Vec<IncomingRelease>>;

    /// `Some(path)` if `dir/name` exists as a directory.
    async fn find_folder(&self, dir: &Path, name: &str) -> WorkerResult<Option<PathBuf>>;

    /// Every file directly under `dir` whose name matches `name` case
    /// insensitively.
    async fn find_file(&self, dir: &Path, name: &str) -> WorkerResult<Vec<PathBuf>>;

    async fn read_text(&self, path: &Path) -> WorkerResult<String>;

    /// Every file under `dir`, recursively.
    async fn enumerate_tree(&self, dir: &Path) -> WorkerResult<Vec<PathBuf>>;

    /// Copies `src` to `dest`, creating parent directories as needed.
    async fn stage_file(&self, src: &Path, dest: &Path) -> WorkerResult<()>;
}
