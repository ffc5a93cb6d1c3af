//! The deployment pipeline: packaging, the build-event channel, and the
//! orchestration that ties them together.

pub mod channel;
pub mod package;
pub mod pipeline;
pub mod resolve;
pub mod watcher;
