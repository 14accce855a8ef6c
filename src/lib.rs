//! Lesson Video Compositor Library
//!
//! Builds a narrated lesson video from a title, a narration script and a set
//! of visual candidates (slides, screenshots, remotely generated images and
//! clips), timed to the synthesized narration.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use config::CompositorConfig;
pub use domain::errors::{AdapterFailure, DomainError, FailureReason};
pub use domain::model::{AssetKind, AssetRequest, AudioTrack, FrameSpec, TimelinePlan};
pub use engine::{Compositor, OutputArtifact, RenderRequest, RenderScope};
pub use error::{CompositorError, CompositorResult};
