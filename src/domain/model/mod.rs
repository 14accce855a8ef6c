// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{imageops::FilterType, DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::engine::effect::PanZoomClip;

/// Canonical output format every segment is normalized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 24,
        }
    }
}

impl FrameSpec {
    /// Create a frame spec with validation
    pub fn new(width: u32, height: u32, fps: u32) -> Result<Self, DomainError> {
        let spec = Self { width, height, fps };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.width == 0 || self.height == 0 {
            return Err(DomainError::BadArgs(
                "Frame dimensions cannot be zero".to_string(),
            ));
        }
        // yuv420p output needs even dimensions
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(DomainError::BadArgs(format!(
                "Frame dimensions must be even, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(DomainError::BadArgs("Frame rate must be positive".to_string()));
        }
        Ok(())
    }

    /// Duration of one frame in seconds
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Nearest whole number of frames for a duration
    pub fn frames_for(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 || !seconds.is_finite() {
            return 0;
        }
        (seconds * self.fps as f64).round() as u64
    }

    pub fn seconds_for(&self, frames: u64) -> f64 {
        frames as f64 / self.fps as f64
    }

    /// Size in bytes of one packed RGB24 frame
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn size_arg(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Kind of visual asset backing a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Slide,
    Screenshot,
    RemoteImage,
    RemoteVideo,
}

impl AssetKind {
    pub fn is_remote(&self) -> bool {
        matches!(self, AssetKind::RemoteImage | AssetKind::RemoteVideo)
    }

    /// Parse asset kind from string
    pub fn parse(kind_str: &str) -> Result<Self, DomainError> {
        match kind_str.to_lowercase().as_str() {
            "slide" => Ok(AssetKind::Slide),
            "screenshot" => Ok(AssetKind::Screenshot),
            "remote_image" | "image" => Ok(AssetKind::RemoteImage),
            "remote_video" | "video" => Ok(AssetKind::RemoteVideo),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid asset kind: {}. Valid kinds: slide, screenshot, remote_image, remote_video",
                kind_str
            ))),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::Slide => "slide",
            AssetKind::Screenshot => "screenshot",
            AssetKind::RemoteImage => "remote_image",
            AssetKind::RemoteVideo => "remote_video",
        };
        f.write_str(name)
    }
}

/// Request for one visual asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub kind: AssetKind,
    /// Slide text, screenshot path, or generation prompt depending on `kind`
    pub prompt_or_source: String,
    pub hint_duration: f64,
}

impl AssetRequest {
    pub fn new(kind: AssetKind, prompt_or_source: impl Into<String>) -> Self {
        Self {
            kind,
            prompt_or_source: prompt_or_source.into(),
            hint_duration: 0.0,
        }
    }

    pub fn slide(text: impl Into<String>) -> Self {
        Self::new(AssetKind::Slide, text)
    }

    pub fn screenshot(path: impl AsRef<Path>) -> Self {
        Self::new(
            AssetKind::Screenshot,
            path.as_ref().to_string_lossy().to_string(),
        )
    }

    pub fn remote_image(prompt: impl Into<String>) -> Self {
        Self::new(AssetKind::RemoteImage, prompt)
    }

    pub fn remote_video(prompt: impl Into<String>) -> Self {
        Self::new(AssetKind::RemoteVideo, prompt)
    }

    pub fn with_hint_duration(mut self, seconds: f64) -> Self {
        self.hint_duration = seconds;
        self
    }
}

/// Narration audio; its duration is the timing authority for a render
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    path: PathBuf,
    duration: f64,
}

impl AudioTrack {
    /// Create new audio track with validation
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Result<Self, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::InvalidDuration(format!(
                "Audio duration must be positive, got {}",
                duration
            )));
        }
        Ok(Self {
            path: path.into(),
            duration,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// A still image already normalized to the canonical frame size
#[derive(Debug, Clone)]
pub struct StillFrame {
    image: Arc<RgbImage>,
    spec: FrameSpec,
}

impl StillFrame {
    /// Wrap an image that is already at canonical size
    pub fn new(image: RgbImage, spec: FrameSpec) -> Result<Self, DomainError> {
        if image.width() != spec.width || image.height() != spec.height {
            return Err(DomainError::ValidationFailed(format!(
                "Still frame is {}x{}, expected {}",
                image.width(),
                image.height(),
                spec.size_arg()
            )));
        }
        Ok(Self {
            image: Arc::new(image),
            spec,
        })
    }

    /// Cover-resize and center-crop an arbitrary image to canonical size
    pub fn fit(image: DynamicImage, spec: FrameSpec) -> Self {
        let image = if image.width() == spec.width && image.height() == spec.height {
            image.to_rgb8()
        } else {
            image
                .resize_to_fill(spec.width, spec.height, FilterType::Triangle)
                .to_rgb8()
        };
        Self {
            image: Arc::new(image),
            spec,
        }
    }

    /// Solid color frame
    pub fn solid(spec: FrameSpec, rgb: [u8; 3]) -> Self {
        let image = RgbImage::from_pixel(spec.width, spec.height, image::Rgb(rgb));
        Self {
            image: Arc::new(image),
            spec,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn spec(&self) -> FrameSpec {
        self.spec
    }
}

/// A native video file produced by a remote generation job
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    pub path: PathBuf,
    /// Native duration in seconds as probed
    pub duration: f64,
}

impl VideoClip {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Result<Self, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::InvalidDuration(format!(
                "Video clip duration must be positive, got {}",
                duration
            )));
        }
        Ok(Self {
            path: path.into(),
            duration,
        })
    }
}

/// How a native clip is fitted to its allocated duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipFit {
    /// Clip is at least as long as the slot; play the head only
    Trim { keep: f64 },
    /// Clip is shorter; replay it `extra_loops` more times, then cut
    Loop { extra_loops: u32 },
}

impl ClipFit {
    pub fn for_clip(native: f64, allocated: f64) -> Self {
        if native >= allocated {
            ClipFit::Trim { keep: allocated }
        } else {
            let plays = (allocated / native).ceil() as u32;
            ClipFit::Loop {
                extra_loops: plays.saturating_sub(1),
            }
        }
    }

    pub fn extra_loops(&self) -> u32 {
        match self {
            ClipFit::Trim { .. } => 0,
            ClipFit::Loop { extra_loops } => *extra_loops,
        }
    }
}

/// Motion content for a segment
#[derive(Debug, Clone)]
pub enum MotionClip {
    /// Pan/zoom rendered over a still
    PanZoom(PanZoomClip),
    /// Native video fitted to the slot
    Native { clip: VideoClip, fit: ClipFit },
}

/// Visual content of a rendered segment
#[derive(Debug, Clone)]
pub enum Visual {
    Still(StillFrame),
    Motion(MotionClip),
}

/// Materialized asset for one plan entry
#[derive(Debug, Clone)]
pub struct RenderedSegment {
    pub visual: Visual,
    pub duration: f64,
    pub kind: AssetKind,
}

impl RenderedSegment {
    /// Create new rendered segment with validation
    pub fn new(visual: Visual, duration: f64, kind: AssetKind) -> Result<Self, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::InvalidDuration(format!(
                "Segment duration must be positive, got {}",
                duration
            )));
        }
        Ok(Self {
            visual,
            duration,
            kind,
        })
    }

    pub fn still(frame: StillFrame, duration: f64, kind: AssetKind) -> Result<Self, DomainError> {
        Self::new(Visual::Still(frame), duration, kind)
    }
}

/// Kind of remote generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Image,
    Video,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobType::Image => f.write_str("image"),
            JobType::Video => f.write_str("video"),
        }
    }
}

/// Remote job lifecycle as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Local read-only mirror of a remote job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub result_ref: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteJob {
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            result_ref: None,
            error: None,
        }
    }
}

/// Fetched result of a completed remote job
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl MediaBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
        }
    }
}

/// Bounds applied by the timeline allocator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineBounds {
    /// Screen time reserved for the opening title slide
    pub opening: f64,
    pub min_segment: f64,
    pub max_segment: f64,
}

impl Default for TimelineBounds {
    fn default() -> Self {
        Self {
            opening: 3.0,
            min_segment: 2.0,
            max_segment: 20.0,
        }
    }
}

impl TimelineBounds {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.opening >= 0.0) {
            return Err(DomainError::BadArgs(
                "Opening duration cannot be negative".to_string(),
            ));
        }
        if !(self.min_segment > 0.0) {
            return Err(DomainError::BadArgs(
                "Minimum segment duration must be positive".to_string(),
            ));
        }
        if self.min_segment > self.max_segment {
            return Err(DomainError::BadArgs(format!(
                "Minimum segment ({}) exceeds maximum segment ({})",
                self.min_segment, self.max_segment
            )));
        }
        Ok(())
    }
}

/// Poll budget for a remote job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(180),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Result<Self, DomainError> {
        if poll_interval.is_zero() {
            return Err(DomainError::BadArgs(
                "Poll interval must be positive".to_string(),
            ));
        }
        Ok(Self {
            max_wait,
            poll_interval,
        })
    }

    /// Upper bound on status polls: ceil(max_wait / poll_interval)
    pub fn max_polls(&self) -> u32 {
        if self.poll_interval.is_zero() {
            return 0;
        }
        let wait = self.max_wait.as_nanos();
        let step = self.poll_interval.as_nanos();
        let polls = (wait + step - 1) / step;
        polls.min(u32::MAX as u128) as u32
    }

    /// Wall-clock budget for one job: `max_polls` intervals. Never shorter than
    /// `max_wait` and less than one interval longer.
    pub fn budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_polls())
    }
}

/// Role of a plan entry in the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    Title,
    Candidate,
    Fallback,
}

/// One planned segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub request: AssetRequest,
    pub allocated_duration: f64,
    pub role: EntryRole,
}

/// Ordered segment plan whose durations sum to the audio duration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelinePlan {
    pub entries: Vec<PlanEntry>,
    /// Candidates dropped because the budget ran out
    pub dropped: usize,
}

impl TimelinePlan {
    pub fn total_duration(&self) -> f64 {
        self.entries.iter().map(|e| e.allocated_duration).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fallback_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.role == EntryRole::Fallback)
            .count()
    }

    /// Frame span for every entry using cumulative rounding, so the spans
    /// tile `[0, frames_for(total))` without gaps
    pub fn frame_spans(&self, spec: &FrameSpec) -> Vec<(u64, u64)> {
        let mut spans = Vec::with_capacity(self.entries.len());
        let mut elapsed = 0.0;
        for entry in &self.entries {
            let start = spec.frames_for(elapsed);
            elapsed += entry.allocated_duration;
            let end = spec.frames_for(elapsed);
            spans.push((start, end.max(start)));
        }
        spans
    }
}
