// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::CompositorConfig;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::{
    EncodeError, NarrationError, ProbeError, SpeechError, SubmitError, TransportError,
};

/// Per-render context handed to asset adapters
#[derive(Debug, Clone)]
pub struct AssetContext {
    /// Scratch directory owned by the render; removed when the render ends
    pub work_dir: PathBuf,
    pub cancel: CancellationToken,
    pub spec: FrameSpec,
}

/// Port for one strategy that turns an asset request into a segment
#[async_trait]
pub trait AssetSourcePort: Send + Sync {
    /// Short adapter name used in logs and reports
    fn name(&self) -> &'static str;

    /// Asset kind this adapter serves
    fn kind(&self) -> AssetKind;

    /// Materialize the request for its hinted duration.
    ///
    /// Every failure is reported as an `AdapterFailure`; adapters never raise.
    async fn materialize(
        &self,
        request: &AssetRequest,
        ctx: &AssetContext,
    ) -> Result<RenderedSegment, AdapterFailure>;
}

/// Port for the remote generation service job protocol
#[async_trait]
pub trait RemoteJobPort: Send + Sync {
    /// Submit a generation prompt
    async fn submit(&self, prompt: &str, job_type: JobType) -> Result<RemoteJob, SubmitError>;

    /// Fetch the current state of a job
    async fn get_status(&self, job_id: &str) -> Result<RemoteJob, TransportError>;

    /// Download the result of a completed job
    async fn fetch_result(&self, result_ref: &str) -> Result<MediaBytes, TransportError>;
}

/// Port for the narration script producer
#[async_trait]
pub trait NarrationPort: Send + Sync {
    async fn generate_script(&self, topic: &str, source_text: &str)
        -> Result<String, NarrationError>;
}

/// Port for text-to-speech
#[async_trait]
pub trait SpeechPort: Send + Sync {
    /// Synthesize narration audio into `work_dir`
    async fn synthesize(&self, text: &str, work_dir: &Path) -> Result<AudioTrack, SpeechError>;
}

/// Port for media probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Container duration in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError>;
}

/// Port for configuration loading
pub trait ConfigPort: Send + Sync {
    /// Load configuration, layering the source over `base`
    fn load(&self, base: CompositorConfig) -> Result<CompositorConfig, DomainError>;
}

/// Parameters for one encode
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub spec: FrameSpec,
    pub audio: AudioTrack,
    pub output: PathBuf,
    /// Exact number of video frames that will be written
    pub frame_count: u64,
}

/// Sink for raw RGB24 frames; blocking
pub trait FrameWriter: Send {
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), EncodeError>;

    /// Flush and wait for the output file to be complete
    fn finish(self: Box<Self>) -> Result<(), EncodeError>;

    /// Stop without producing a usable file
    fn abort(self: Box<Self>);
}

/// Port for the final video encoder and audio muxer
pub trait EncodePort: Send + Sync {
    fn open(&self, job: &EncodeJob) -> Result<Box<dyn FrameWriter>, EncodeError>;
}

/// Source of decoded RGB24 frames at the canonical format; blocking
pub trait FrameStream: Send {
    /// Next frame, or `None` once the clip is exhausted
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, EncodeError>;
}

/// Port for decoding native video clips at the canonical format
pub trait ClipDecodePort: Send + Sync {
    /// Open `clip` fitted per `fit`, producing at most `frames` frames
    fn open(
        &self,
        clip: &VideoClip,
        fit: ClipFit,
        spec: FrameSpec,
        frames: u64,
    ) -> Result<Box<dyn FrameStream>, EncodeError>;
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
