//! Shared data model for the video release factory.
//!
//! Every entity named in the data model (channels, releases, assets, jobs,
//! QA reports, upload records, worker heartbeats) is a tagged Rust struct
//! or enum here rather than an untyped row map, so the store and the
//! worker roles share one typed vocabulary.

pub mod asset;
pub mod channel;
pub mod draft;
pub mod heartbeat;
pub mod job;
pub mod qa;
pub mod release;
pub mod track;
pub mod upload;

pub use asset::{Asset, AssetKind, AssetOrigin, JobInputLink, JobInputRole, JobOutputLink, JobOutputRole};
pub use channel::{Channel, RenderProfile};
pub use draft::JobDraft;
pub use heartbeat::WorkerHeartbeat;
pub use job::{Job, JobStage, JobState};
pub use qa::QaReport;
pub use release::{Release, ReleaseMeta};
pub use track::TrackCatalogEntry;
pub use upload::UploadRecord;
