//! Engine Integration
//!
//! Shared async access for callers running on a tokio runtime.

pub mod handle;

pub use handle::EngineHandle;
