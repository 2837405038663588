//! Media-probe contract: ffprobe JSON plus a loudness tool.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// One probed audio or video stream, with the fields the QA gate compares
/// against a channel's `RenderProfile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamProbe {
    pub codec_type: String,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub duration_sec: Option<f64>,
}

/// Normalized result of probing a rendered file: its duration plus the
/// first video stream and first audio stream found, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    pub duration_sec: f64,
    pub video: Option<StreamProbe>,
    pub audio: Option<StreamProbe>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

impl FfprobeStream {
    fn into_stream_probe(self) -> StreamProbe {
        let fps = self
            .avg_frame_rate
            .as_deref()
            .or(self.r_frame_rate.as_deref())
            .and_then(parse_fps);
        StreamProbe {
            codec_type: self.codec_type,
            codec_name: self.codec_name,
            width: self.width,
            height: self.height,
            fps,
            sample_rate: self.sample_rate.and_then(|s| s.parse().ok()),
            channels: self.channels,
            duration_sec: self.duration.and_then(|d| d.parse().ok()),
        }
    }
}

/// Probes a rendered file, returning its duration and first video/audio
/// streams. Grounded on `original_source/services/common/ffmpeg.py`'s
/// `ffprobe_json` plus stream-finding logic.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<MediaProbe> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            "ffprobe exited non-zero",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let duration_sec = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .cloned()
        .map(FfprobeStream::into_stream_probe);
    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .cloned()
        .map(FfprobeStream::into_stream_probe);

    Ok(MediaProbe {
        duration_sec,
        video,
        audio,
    })
}

/// Parses ffprobe's `"N/D"` fraction or plain-float frame rate string.
/// Returns `None` for `"0/0"` or anything unparseable, matching
/// `original_source/services/common/ffmpeg.py::parse_fps`.
fn parse_fps(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    s.parse().ok()
}

/// Measured mean/max loudness, in dBFS, over the first `seconds` of audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeDetect {
    pub mean_volume_db: f64,
    pub max_volume_db: f64,
}

/// Runs ffmpeg's `volumedetect` filter over the first `seconds` of `path`
/// and parses the `mean_volume`/`max_volume` lines out of its stderr,
/// matching `original_source/services/common/ffmpeg.py::volumedetect`.
pub async fn volumedetect(path: impl AsRef<Path>, seconds: u64) -> MediaResult<VolumeDetect> {
    let path = path.as_ref();
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostats".into(), "-i".into()];
    args.push(path.to_string_lossy().to_string());
    if seconds > 0 {
        args.push("-t".into());
        args.push(seconds.to_string());
    }
    args.extend(["-af".into(), "volumedetect".into(), "-f".into(), "null".into(), "-".into()]);

    let output = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let mean_volume_db = extract_db(&combined, "mean_volume")
        .ok_or_else(|| MediaError::UnparseableProbe("mean_volume not found".into()))?;
    let max_volume_db = extract_db(&combined, "max_volume")
        .ok_or_else(|| MediaError::UnparseableProbe("max_volume not found".into()))?;

    Ok(VolumeDetect {
        mean_volume_db,
        max_volume_db,
    })
}

fn extract_db(text: &str, label: &str) -> Option<f64> {
    let marker = format!("{label}:");
    let idx = text.find(&marker)?;
    let rest = &text[idx + marker.len()..];
    let rest = rest.trim_start();
    let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))?;
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fraction_fps() {
        assert!((parse_fps("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_fps("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_fps("29.97").unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn zero_over_zero_fps_is_none() {
        assert!(parse_fps("0/0").is_none());
    }

    #[test]
    fn extracts_db_from_volumedetect_output() {
        let text = "[Parsed_volumedetect_0 @ 0x1] mean_volume: -18.3 dB\n\
                     [Parsed_volumedetect_0 @ 0x1] max_volume: -1.2 dB\n";
        assert!((extract_db(text, "mean_volume").unwrap() - (-18.3)).abs() < 1e-9);
        assert!((extract_db(text, "max_volume").unwrap() - (-1.2)).abs() < 1e-9);
    }
}
