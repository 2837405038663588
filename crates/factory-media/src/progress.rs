//! Renderer progress reporting.

use serde::{Deserialize, Serialize};

/// A single `<pct> %` progress line from the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderProgress {
    pub pct: f64,
}

pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + 'static>;
