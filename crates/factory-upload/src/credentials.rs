//! YouTube credential resolution.
//!
//! A channel's upload credentials are either a per-channel pair rooted at a
//! configured tokens directory, or a single global pair shared by every
//! channel. Resolution never touches the filesystem beyond an existence
//! check; missing or unreadable files surface later, at client init.

use std::path::{Path, PathBuf};

use crate::error::{UploadError, UploadResult};

#[derive(Debug, Clone, Default)]
pub struct CredentialConfig {
    /// Root directory holding `<slug>/token.json` (and optionally
    /// `<slug>/client_secret.json`) per channel.
    pub tokens_base: Option<PathBuf>,
    pub global_client_secret_path: Option<PathBuf>,
    pub global_token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Channel,
    Global,
}

#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub source: CredentialSource,
}

/// Resolves credentials for `channel_slug` per the channel-first,
/// global-fallback rule: a per-channel token takes priority over the global
/// token, and a per-channel client secret takes priority over the global
/// client secret, independently.
pub fn resolve_youtube_channel_credentials(
    channel_slug: &str,
    config: &CredentialConfig,
) -> UploadResult<ResolvedCredentials> {
    if let Some(base) = &config.tokens_base {
        let channel_dir = base.join(channel_slug);
        let per_channel_token = channel_dir.join("token.json");
        if is_file(&per_channel_token) {
            let per_channel_secret = channel_dir.join("client_secret.json");
            let client_secret_path = if is_file(&per_channel_secret) {
                per_channel_secret
            } else if let Some(global) = &config.global_client_secret_path {
                global.clone()
            } else {
                return Err(UploadError::CredentialResolution(channel_slug.to_string()));
            };
            return Ok(ResolvedCredentials {
                client_secret_path,
                token_path: per_channel_token,
                source: CredentialSource::Channel,
            });
        }
    }

    match (&config.global_token_path, &config.global_client_secret_path) {
        (Some(token_path), Some(client_secret_path)) => Ok(ResolvedCredentials {
            client_secret_path: client_secret_path.clone(),
            token_path: token_path.clone(),
            source: CredentialSource::Global,
        }),
        _ => Err(UploadError::CredentialResolution(channel_slug.to_string())),
    }
}

fn is_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn prefers_per_channel_token_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let channel_dir = dir.path().join("acme");
        fs::create_dir_all(&channel_dir).unwrap();
        fs::write(channel_dir.join("token.json"), "{}").unwrap();

        let config = CredentialConfig {
            tokens_base: Some(dir.path().to_path_buf()),
            global_client_secret_path: Some(PathBuf::from("/global/secret.json")),
            global_token_path: Some(PathBuf::from("/global/token.json")),
        };

        let resolved = resolve_youtube_channel_credentials("acme", &config).unwrap();
        assert_eq!(resolved.source, CredentialSource::Channel);
        assert_eq!(resolved.token_path, channel_dir.join("token.json"));
        assert_eq!(resolved.client_secret_path, PathBuf::from("/global/secret.json"));
    }

    #[test]
    fn falls_back_to_global_when_no_per_channel_token() {
        let dir = tempfile::tempdir().unwrap();
        let config = CredentialConfig {
            tokens_base: Some(dir.path().to_path_buf()),
            global_client_secret_path: Some(PathBuf::from("/global/secret.json")),
            global_token_path: Some(PathBuf::from("/global/token.json")),
        };

        let resolved = resolve_youtube_channel_credentials("acme", &config).unwrap();
        assert_eq!(resolved.source, CredentialSource::Global);
    }

    #[test]
    fn errors_when_neither_form_yields_both_paths() {
        let config = CredentialConfig::default();
        let err = resolve_youtube_channel_credentials("acme", &config).unwrap_err();
        assert!(matches!(err, UploadError::CredentialResolution(slug) if slug == "acme"));
    }

    #[test]
    fn per_channel_client_secret_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let channel_dir = dir.path().join("acme");
        fs::create_dir_all(&channel_dir).unwrap();
        fs::write(channel_dir.join("token.json"), "{}").unwrap();
        fs::write(channel_dir.join("client_secret.json"), "{}").unwrap();

        let config = CredentialConfig {
            tokens_base: Some(dir.path().to_path_buf()),
            global_client_secret_path: Some(PathBuf::from("/global/secret.json")),
            global_token_path: None,
        };

        let resolved = resolve_youtube_channel_credentials("acme", &config).unwrap();
        assert_eq!(resolved.client_secret_path, channel_dir.join("client_secret.json"));
    }
}
