//! 60-second preview clip generation, used by the orchestrator to leave a
//! quick-look artifact alongside the full render.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Parameters for `make_preview`, mirroring
/// `original_source/services/common/ffmpeg.py::make_preview_60s`.
#[derive(Debug, Clone, Copy)]
pub struct PreviewSpec {
    pub seconds: u64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate: &'static str,
    pub audio_bitrate: &'static str,
}

impl Default for PreviewSpec {
    fn default() -> Self {
        Self {
            seconds: 60,
            width: 1280,
            height: 720,
            fps: 30,
            video_bitrate: "2M",
            audio_bitrate: "128k",
        }
    }
}

/// Renders a scaled, padded preview clip of the first `spec.seconds` of
/// `src` to `dst`, h264/aac with faststart for quick web playback.
pub async fn make_preview(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    spec: PreviewSpec,
) -> MediaResult<()> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps}",
        w = spec.width,
        h = spec.height,
        fps = spec.fps,
    );

    let output = Command::new("ffmpeg")
        .args([
            "-y",
            "-i",
        ])
        .arg(src.as_ref())
        .args(["-t", &spec.seconds.to_string()])
        .args(["-vf", &filter])
        .args(["-c:v", "libx264", "-b:v", spec.video_bitrate])
        .args(["-c:a", "aac", "-b:a", spec.audio_bitrate])
        .args(["-movflags", "+faststart"])
        .arg(dst.as_ref())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::render_failed(
            "preview render failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    Ok(())
}
