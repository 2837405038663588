//! Render process invocation and output-line parsing.
//!
//! The renderer is an external child process invoked with a single
//! positional argument, the workspace root. It writes MP4s
//! into `Release/` and emits only two kinds of machine-readable stdout
//! lines: `<pct> %` progress lines and a `FATAL_IMAGE_INVALID:` line for
//! non-retryable asset errors.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::RenderProgress;

/// Describes one invocation of the external renderer against a workspace.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    renderer_path: PathBuf,
    workspace_root: PathBuf,
}

impl RenderCommand {
    pub fn new(renderer_path: impl AsRef<Path>, workspace_root: impl AsRef<Path>) -> Self {
        Self {
            renderer_path: renderer_path.as_ref().to_path_buf(),
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

/// Runs a `RenderCommand`, reporting progress and honoring cancellation.
pub struct RenderRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
}

impl Default for RenderRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderRunner {
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &RenderCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Spawns the renderer and streams stdout, invoking `progress_callback`
    /// for each progress line and returning `FatalImageInvalid` immediately
    /// when that marker line appears.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &RenderCommand,
        progress_callback: F,
    ) -> MediaResult<()>
    where
        F: Fn(RenderProgress) + Send + 'static,
    {
        debug!(path = %cmd.workspace_root.display(), "spawning renderer");

        let mut child = Command::new(&cmd.renderer_path)
            .arg(&cmd.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let mut reader = BufReader::new(stdout).lines();

        let progress_handle: tokio::task::JoinHandle<MediaResult<()>> = tokio::spawn(async move {
            while let Ok(Some(line)) = reader.next_line().await {
                match parse_render_line(&line) {
                    Some(RenderLine::Progress(progress)) => progress_callback(progress),
                    Some(RenderLine::FatalImageInvalid(reason)) => {
                        return Err(MediaError::FatalImageInvalid(reason));
                    }
                    None => {}
                }
            }
            Ok(())
        });

        let wait_result = self.wait_for_completion(&mut child).await;
        let stdout_result = progress_handle.await.unwrap_or(Ok(()));

        stdout_result?;
        wait_result
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<()> {
        let mut cancel_rx = self.cancel_rx.clone();
        let timeout = self.timeout_secs.map(std::time::Duration::from_secs);
        let deadline = timeout.map(|d| tokio::time::Instant::now() + d);

        let status = loop {
            let sleep = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };
            let cancelled = async {
                match cancel_rx.as_mut() {
                    Some(rx) => {
                        if *rx.borrow() {
                            return;
                        }
                        while rx.changed().await.is_ok() {
                            if *rx.borrow() {
                                return;
                            }
                        }
                        std::future::pending::<()>().await
                    }
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                result = child.wait() => break result?,
                _ = sleep => {
                    let timeout_secs = self.timeout_secs.unwrap_or_default();
                    warn!(timeout_secs, "renderer timed out, killing process");
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(timeout_secs));
                }
                _ = cancelled => {
                    info!("renderer cancelled, killing process");
                    let _ = child.kill().await;
                    return Err(MediaError::Cancelled);
                }
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::render_failed(
                "renderer exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

enum RenderLine {
    Progress(RenderProgress),
    FatalImageInvalid(String),
}

/// Parses one stdout line per the renderer contract. Any line that is not
/// a recognized progress or fatal-marker line is ignored, not an error —
/// the renderer may log freely on lines outside the contract.
fn parse_render_line(line: &str) -> Option<RenderLine> {
    let line = line.trim();

    if let Some(reason) = line.strip_prefix("FATAL_IMAGE_INVALID:") {
        return Some(RenderLine::FatalImageInvalid(reason.trim().to_string()));
    }

    let pct_str = line.strip_suffix('%')?.trim();
    let pct: f64 = pct_str.parse().ok()?;
    if !(0.0..=100.0).contains(&pct) {
        return None;
    }
    Some(RenderLine::Progress(RenderProgress { pct }))
}

pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_line() {
        match parse_render_line("42.5 %") {
            Some(RenderLine::Progress(p)) => assert!((p.pct - 42.5).abs() < 1e-9),
            _ => panic!("expected progress line"),
        }
    }

    #[test]
    fn parses_fatal_image_invalid() {
        match parse_render_line("FATAL_IMAGE_INVALID: cover.png is not a valid image") {
            Some(RenderLine::FatalImageInvalid(reason)) => {
                assert_eq!(reason, "cover.png is not a valid image")
            }
            _ => panic!("expected fatal line"),
        }
    }

    #[test]
    fn ignores_unrelated_log_lines() {
        assert!(parse_render_line("loading ffmpeg filters...").is_none());
        assert!(parse_render_line("120 %").is_none());
    }
}
