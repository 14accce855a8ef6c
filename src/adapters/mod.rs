// Adapters - External system implementations

pub mod env_config;
pub mod exec_ffmpeg;
pub mod http_jobs;
pub mod narration;
pub mod probe_ffprobe;
pub mod remote_media;
pub mod screenshot_fs;
pub mod slide_card;
pub mod speech;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use env_config::EnvConfigAdapter;
pub use exec_ffmpeg::{FfmpegClipDecoder, FfmpegEncoder};
pub use http_jobs::HttpJobClient;
pub use narration::{ChatNarration, VerbatimNarration};
pub use probe_ffprobe::FfprobeAdapter;
pub use remote_media::{RemoteImageAdapter, RemoteVideoAdapter};
pub use screenshot_fs::{ScreenshotAdapter, ScreenshotDirectory};
pub use slide_card::SlideCardAdapter;
pub use speech::{HttpSpeechAdapter, PrerecordedSpeech};
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::TracingLogAdapter;

use crate::domain::model::{AssetRequest, FrameSpec};

/// Duration to stamp on a segment; never below one frame
pub(crate) fn segment_duration(request: &AssetRequest, spec: &FrameSpec) -> f64 {
    if request.hint_duration.is_finite() && request.hint_duration > 0.0 {
        request.hint_duration
    } else {
        spec.frame_interval()
    }
}
