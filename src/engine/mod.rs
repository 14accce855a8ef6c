//! Core compositing engine module

pub mod compositor;
pub mod effect;
pub mod poller;
pub mod slide;
pub mod track;

pub use compositor::{
    AdapterStrategies, Compositor, CompositorSettings, OutputArtifact, RenderRequest, RenderScope,
    SegmentReport,
};
pub use effect::{apply_pan_zoom, PanZoomClip};
pub use poller::{JobFailure, JobOutcome, RemoteJobPoller, Submission};
pub use slide::SlideRenderer;
pub use track::{render_track, ConformReport, FrameSource, VisualTrack};
