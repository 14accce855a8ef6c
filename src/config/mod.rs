//! Compositor configuration
//!
//! One explicit `CompositorConfig` is built at startup and passed into the
//! container. Every section has serde defaults so partial TOML files work.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{FrameSpec, PollPolicy, TimelineBounds};

/// Root configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    pub video: VideoConfig,
    pub timeline: TimelineBounds,
    pub remote: RemoteConfig,
    pub narration: NarrationConfig,
    pub speech: SpeechConfig,
    pub assets: AssetsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Pan/zoom growth per second
    pub zoom_ratio: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        let spec = FrameSpec::default();
        Self {
            width: spec.width,
            height: spec.height,
            fps: spec.fps,
            zoom_ratio: 0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_wait_secs: f64,
    pub poll_interval_secs: f64,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            api_key: None,
            max_wait_secs: 180.0,
            poll_interval_secs: 5.0,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationMode {
    /// Use the source text as the script
    Verbatim,
    /// Ask a chat-completion endpoint to write the script
    Chat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub mode: NarrationMode,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_script_chars: usize,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            mode: NarrationMode::Verbatim,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_script_chars: 2500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechMode {
    /// Audio file supplied by the caller
    Prerecorded,
    /// HTTP text-to-speech service
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub mode: SpeechMode,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub voice: String,
    pub audio_file: Option<PathBuf>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            mode: SpeechMode::Prerecorded,
            base_url: None,
            api_key: None,
            voice: "en".to_string(),
            audio_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub screenshot_cap: usize,
    pub max_concurrent_assets: usize,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            screenshot_cap: 5,
            max_concurrent_assets: num_cpus::get(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub media_dir: PathBuf,
    /// Parent for per-render scratch directories; system temp when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media"),
            work_dir: None,
        }
    }
}

impl CompositorConfig {
    /// Canonical frame format
    pub fn frame_spec(&self) -> Result<FrameSpec, DomainError> {
        FrameSpec::new(self.video.width, self.video.height, self.video.fps)
    }

    /// Poll budget for remote jobs
    pub fn poll_policy(&self) -> Result<PollPolicy, DomainError> {
        let max_wait = secs_to_duration("remote.max_wait_secs", self.remote.max_wait_secs)?;
        let poll_interval =
            secs_to_duration("remote.poll_interval_secs", self.remote.poll_interval_secs)?;
        PollPolicy::new(max_wait, poll_interval)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), DomainError> {
        self.frame_spec()?;
        self.timeline.validate()?;

        if !self.video.zoom_ratio.is_finite() {
            return Err(DomainError::BadArgs("Zoom ratio must be finite".to_string()));
        }

        if self.remote.enabled {
            let has_url = self
                .remote
                .base_url
                .as_deref()
                .map(|url| !url.trim().is_empty())
                .unwrap_or(false);
            if !has_url {
                return Err(DomainError::BadArgs(
                    "Remote generation is enabled but remote.base_url is not set".to_string(),
                ));
            }
            self.poll_policy()?;
        }

        if self.speech.mode == SpeechMode::Http && self.speech.base_url.is_none() {
            return Err(DomainError::BadArgs(
                "HTTP speech mode requires speech.base_url".to_string(),
            ));
        }

        if self.narration.max_script_chars == 0 {
            return Err(DomainError::BadArgs(
                "narration.max_script_chars must be positive".to_string(),
            ));
        }

        if self.assets.max_concurrent_assets == 0 {
            return Err(DomainError::BadArgs(
                "assets.max_concurrent_assets must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn secs_to_duration(key: &str, secs: f64) -> Result<Duration, DomainError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(DomainError::BadArgs(format!(
            "{} must be positive, got {}",
            key, secs
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}
