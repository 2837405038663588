//! Approval/retention HTTP surface for the video release factory.
//!
//! This crate provides:
//! - The job-approval control surface: approve/reject/cancel/mark_published
//! - HTTP Basic auth, constant-time compared
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
