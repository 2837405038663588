//! FFmpeg/FFprobe process wrapper for the video release factory.
//!
//! Covers the renderer contract: spawning the external render
//! process, parsing its `<pct> %` / `FATAL_IMAGE_INVALID:` stdout protocol,
//! probing rendered output with ffprobe, detecting stalled renders via a
//! pure output-growth watchdog, and building 60-second preview clips.

pub mod command;
pub mod error;
pub mod preview;
pub mod probe;
pub mod progress;
pub mod watchdog;

pub use command::{RenderCommand, RenderRunner};
pub use error::{MediaError, MediaResult};
pub use preview::{make_preview, PreviewSpec};
pub use probe::{probe_video, volumedetect, MediaProbe, StreamProbe};
pub use progress::RenderProgress;
pub use watchdog::GrowthWatchdog;
