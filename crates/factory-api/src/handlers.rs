//! Request handlers, one module per resource.

pub mod drafts;
pub mod health;
pub mod jobs;

pub use drafts::*;
pub use health::*;
pub use jobs::*;
