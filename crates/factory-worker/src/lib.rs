//! Worker roles that turn release drafts into QA-verified, privately
//! uploaded videos: importer, orchestrator, QA gate, uploader, cleanup, and
//! the track-catalog worker. Each role is a small, idempotent cycle over
//! `factory_store::Store` state transitions; `main.rs` dispatches one role
//! per process and loops it with a sleep between cycles.

pub mod config;
pub mod error;
pub mod logging;
pub mod origin;
pub mod paths;
pub mod policies;
pub mod preflight;
pub mod workers;

pub use config::{OriginBackend, UploadBackend, WatchdogConfig, WorkerConfig};
pub use error::{CycleOutcome, WorkerError, WorkerResult};
pub use origin::{GdriveOrigin, IncomingRelease, LocalOrigin, Origin};
pub use policies::QaPolicy;
pub use preflight::{run_preflight, FieldErrors, PreflightOutcome};
