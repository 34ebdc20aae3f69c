//! registry-push library
//!
//! Pushes a previously built container image to a registry while collapsing
//! the engine's interleaved per-layer event stream into a live multi-bar
//! progress display.

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod preflight;
pub mod progress;
pub mod registry;

pub use config::ProjectConfig;
pub use error::{PushError, Result};
pub use output::OutputManager;
