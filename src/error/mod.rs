//! Error handling module for the lesson compositor

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for compositor operations
#[derive(Error, Debug)]
pub enum CompositorError {
    /// Speech synthesis failed; nothing can be timed without audio
    #[error("Audio synthesis failed: {source}")]
    AudioSynthesis {
        #[source]
        source: SpeechError,
    },

    /// Narration script could not be produced
    #[error("Narration failed: {source}")]
    Narration {
        #[source]
        source: NarrationError,
    },

    /// Encoding or muxing the final file failed
    #[error("Mux/encode failed: {source}")]
    MuxEncode {
        #[source]
        source: EncodeError,
    },

    /// Render was cancelled before the output was published
    #[error("Render cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Domain validation error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EncodeError> for CompositorError {
    fn from(source: EncodeError) -> Self {
        match source {
            EncodeError::Cancelled => CompositorError::Cancelled,
            source => CompositorError::MuxEncode { source },
        }
    }
}

impl From<SpeechError> for CompositorError {
    fn from(source: SpeechError) -> Self {
        CompositorError::AudioSynthesis { source }
    }
}

impl From<NarrationError> for CompositorError {
    fn from(source: NarrationError) -> Self {
        CompositorError::Narration { source }
    }
}

/// Result type alias for compositor operations
pub type CompositorResult<T> = std::result::Result<T, CompositorError>;

/// Network or protocol failure outside the remote job protocol
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

/// Submission outcome that is not an accepted job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// Service answered but refused the job; never retried
    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Text-to-speech failure
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech service error: {0}")]
    Service(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Audio file not found: {path}")]
    MissingAudio { path: String },

    #[error("Could not determine audio duration: {0}")]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    InvalidAudio(#[from] DomainError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Narration script producer failure
#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("Narration service error: {0}")]
    Service(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Narration service returned an empty script")]
    Empty,
}

/// Media probing failure
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to launch ffprobe: {0}")]
    Launch(#[source] std::io::Error),

    #[error("ffprobe failed for {path}: {message}")]
    Failed { path: String, message: String },

    #[error("No duration reported for {path}")]
    MissingDuration { path: String },
}

/// Encoder/decoder failure
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to launch ffmpeg: {0}")]
    Launch(#[source] std::io::Error),

    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Encoding cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
