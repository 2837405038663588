use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant of the factory: its own origin subtree, one render profile,
/// and (optionally) a bound external upload-target channel id.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub slug: String,
    pub display_name: String,
    pub render_profile_id: i64,
    pub autopublish: bool,
    pub upload_target_channel_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Required artifact constraints a channel's renders must meet, consulted
/// by the QA gate.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct RenderProfile {
    pub id: i64,
    pub name: String,
    pub video_width: i64,
    pub video_height: i64,
    pub video_fps: f64,
    pub video_codec: String,
    pub audio_sample_rate: i64,
    pub audio_channels: i64,
    pub audio_codec: String,
}
