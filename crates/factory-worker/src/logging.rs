//! Tracing setup shared by the worker binary: JSON-formatted spans with an
//! `EnvFilter` default tuned for this crate.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global `tracing` subscriber. Safe to call once per process;
/// a second call panics, so `main` is the only caller.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("factory_worker=info".parse().unwrap()))
        .init();
}
