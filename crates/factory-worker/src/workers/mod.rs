//! One module per worker role. Each exposes a `run_once` that claims and
//! advances at most the jobs available in a single pass; `main.rs` loops
//! these with a sleep between passes.

pub mod cleanup;
pub mod importer;
pub mod orchestrator;
pub mod qa;
pub mod track_catalog;
pub mod uploader;
