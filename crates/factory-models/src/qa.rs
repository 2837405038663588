use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of probing a rendered MP4 against its channel's render profile.
/// Persisted both as a row and as a JSON blob file under
/// `<storage>/qa/job_<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub id: i64,
    pub job_id: i64,
    pub hard_ok: bool,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
    pub probed_width: Option<i64>,
    pub probed_height: Option<i64>,
    pub probed_fps: Option<f64>,
    pub probed_video_codec: Option<String>,
    pub probed_audio_codec: Option<String>,
    pub probed_sample_rate: Option<i64>,
    pub probed_channels: Option<i64>,
    pub expected_duration_sec: Option<f64>,
    pub actual_duration_sec: Option<f64>,
    pub mean_volume_db: Option<f64>,
    pub max_volume_db: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl QaReport {
    /// Fails if the hard checks failed, or if warnings block the pipeline
    /// and any were raised.
    pub fn passes(&self, warning_blocks_pipeline: bool) -> bool {
        self.hard_ok && !(warning_blocks_pipeline && !self.warnings.is_empty())
    }
}
