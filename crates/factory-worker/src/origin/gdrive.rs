//! Remote-bucket origin backend. Out of core scope: the contract is
//! specified, the client itself is an external collaborator. This stub lets
//! the worker roles compile and route on `origin_backend = gdrive` without
//! pulling in a Drive client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{WorkerError, WorkerResult};
use crate::origin::{IncomingRelease, Origin};

pub struct GdriveOrigin;

impl GdriveOrigin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GdriveOrigin {
    fn default() -> Self {
        Self::new()
    }
}

fn unimplemented() -> WorkerError {
    WorkerError::Config("gdrive origin backend is not wired to a Drive client in this build".to_string())
}

#[async_trait]
impl Origin for GdriveOrigin {
    fn channel_root(&self, channel_slug: &str) -> PathBuf {
        PathBuf::from(channel_slug)
    }

    async fn list_channel_incoming(&self, _channel_slug: &str) -> WorkerResult<Vec<IncomingRelease>> {
        Err(unimplemented())
    }

    async fn find_folder(&self, _dir: &Path, _name: &str) -> WorkerResult<Option<PathBuf>> {
        Err(unimplemented())
    }

    async fn find_file(&self, _dir: &Path, _name: &str) -> WorkerResult<Vec<PathBuf>> {
        Err(unimplemented())
    }

    async fn read_text(&self, _path: &Path) -> WorkerResult<String> {
        Err(unimplemented())
    }

    async fn enumerate_tree(&self, _dir: &Path) -> WorkerResult<Vec<PathBuf>> {
        Err(unimplemented())
    }

    async fn stage_file(&self, _src: &Path, _dest: &Path) -> WorkerResult<()> {
        Err(unimplemented())
    }
}
