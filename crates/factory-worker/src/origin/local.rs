//! Local filesystem origin backend: the canonical layout is
//! `<root>/channels/<slug>/incoming/<release>/{meta.json,audio/,images/}`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::WorkerResult;
use crate::origin::{IncomingRelease, Origin};

pub struct LocalOrigin {
    root: PathBuf,
}

impl LocalOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn incoming_dir(&self, channel_slug: &str) -> PathBuf {
        self.root.join("channels").join(channel_slug).join("incoming")
    }
}

#[async_trait]
impl Origin for LocalOrigin {
    fn channel_root(&self, channel_slug: &str) -> PathBuf {
        self.root.join("channels").join(channel_slug)
    }

    async fn list_channel_incoming(&self, channel_slug: &str) -> WorkerResult<Vec<IncomingRelease>> {
        let incoming = self.incoming_dir(channel_slug);
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&incoming).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                let folder = entry.path();
                let external_id = folder
                    .canonicalize()
                    .unwrap_or_else(|_| folder.clone())
                    .to_string_lossy()
                    .into_owned();
                out.push(IncomingRelease { external_id, folder });
            }
        }
        out.sort_by(|a, b| a.folder.cmp(&b.folder));
        Ok(out)
    }

    async fn find_folder(&self, dir: &Path, name: &str) -> WorkerResult<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir()
                && entry.file_name().to_string_lossy().eq_ignore_ascii_case(name)
            {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    async fn find_file(&self, dir: &Path, name: &str) -> WorkerResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file()
                && entry.file_name().to_string_lossy().eq_ignore_ascii_case(name)
            {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    async fn read_text(&self, path: &Path) -> WorkerResult<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn enumerate_tree(&self, dir: &Path) -> WorkerResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    stack.push(path);
                } else {
                    out.push(path);
                }
            }
        }
        Ok(out)
    }

    async fn stage_file(&self, src: &Path, dest: &Path) -> WorkerResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(src, dest).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_only_directories_under_incoming() {
        let dir = tempfile::tempdir().unwrap();
        let incoming = dir.path().join("channels/acme/incoming");
        tokio::fs::create_dir_all(incoming.join("release-a")).await.unwrap();
        tokio::fs::write(incoming.join("stray.txt"), "x").await.unwrap();

        let origin = LocalOrigin::new(dir.path());
        let releases = origin.list_channel_incoming("acme").await.unwrap();
        assert_eq!(releases.len(), 1);
        assert!(releases[0].folder.ends_with("release-a"));
    }

    #[tokio::test]
    async fn missing_channel_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let origin = LocalOrigin::new(dir.path());
        let releases = origin.list_channel_incoming("nope").await.unwrap();
        assert!(releases.is_empty());
    }
}
