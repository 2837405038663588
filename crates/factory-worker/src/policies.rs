//! QA policy thresholds, loaded from a YAML file alongside the worker
//! config. Defaults match the seed-scenario fixtures.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QaPolicy {
    pub warning_blocks_pipeline: bool,
    pub fps_target: f64,
    pub fps_tolerance: f64,
    pub duration_diff_hard_fail_sec: f64,
    pub warn_max_db: f64,
    pub warn_mean_high_db: f64,
    pub warn_mean_low_db: f64,
}

impl Default for QaPolicy {
    fn default() -> Self {
        Self {
            warning_blocks_pipeline: true,
            fps_target: 24.0,
            fps_tolerance: 0.1,
            duration_diff_hard_fail_sec: 1.0,
            warn_max_db: -0.1,
            warn_mean_high_db: -10.0,
            warn_mean_low_db: -55.0,
        }
    }
}

impl QaPolicy {
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else { return Self::default() };
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_yaml::from_str(&raw).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }
}
