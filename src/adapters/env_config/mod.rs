//! Environment configuration adapter
//!
//! Overlays `LESSON_*` environment variables onto a configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::config::{CompositorConfig, NarrationMode, SpeechMode};
use crate::domain::errors::DomainError;
use crate::ports::ConfigPort;

pub const ENV_PREFIX: &str = "LESSON_";

/// Environment adapter
#[derive(Debug, Clone, Default)]
pub struct EnvConfigAdapter {
    vars: HashMap<String, String>,
}

impl EnvConfigAdapter {
    /// Snapshot the process environment
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Use an explicit set of variables; keys without the prefix are ignored
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            vars: vars
                .into_iter()
                .filter(|(key, _)| key.starts_with(ENV_PREFIX))
                .collect(),
        }
    }

    /// Get environment variable by its suffix
    pub fn get_env(&self, suffix: &str) -> Option<&str> {
        self.vars
            .get(&format!("{}{}", ENV_PREFIX, suffix))
            .map(String::as_str)
    }

    fn parsed<T: FromStr>(&self, suffix: &str) -> Result<Option<T>, DomainError>
    where
        T::Err: std::fmt::Display,
    {
        match self.get_env(suffix) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                DomainError::BadArgs(format!(
                    "Invalid value for {}{}: {} ({})",
                    ENV_PREFIX, suffix, raw, e
                ))
            }),
        }
    }

    fn string(&self, suffix: &str) -> Option<String> {
        self.get_env(suffix)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn parse_narration_mode(raw: &str) -> Result<NarrationMode, DomainError> {
    match raw.trim().to_lowercase().as_str() {
        "verbatim" => Ok(NarrationMode::Verbatim),
        "chat" => Ok(NarrationMode::Chat),
        other => Err(DomainError::BadArgs(format!(
            "Invalid narration mode: {}. Valid modes: verbatim, chat",
            other
        ))),
    }
}

fn parse_speech_mode(raw: &str) -> Result<SpeechMode, DomainError> {
    match raw.trim().to_lowercase().as_str() {
        "prerecorded" => Ok(SpeechMode::Prerecorded),
        "http" => Ok(SpeechMode::Http),
        other => Err(DomainError::BadArgs(format!(
            "Invalid speech mode: {}. Valid modes: prerecorded, http",
            other
        ))),
    }
}

impl ConfigPort for EnvConfigAdapter {
    fn load(&self, base: CompositorConfig) -> Result<CompositorConfig, DomainError> {
        let mut config = base;
        let mut overrides = 0;

        macro_rules! apply {
            ($suffix:literal, $target:expr) => {
                if let Some(value) = self.parsed($suffix)? {
                    $target = value;
                    overrides += 1;
                }
            };
        }
        macro_rules! apply_string {
            ($suffix:literal, $target:expr) => {
                if let Some(value) = self.string($suffix) {
                    $target = Some(value);
                    overrides += 1;
                }
            };
        }

        apply!("VIDEO_WIDTH", config.video.width);
        apply!("VIDEO_HEIGHT", config.video.height);
        apply!("VIDEO_FPS", config.video.fps);
        apply!("VIDEO_ZOOM_RATIO", config.video.zoom_ratio);

        apply!("TIMELINE_OPENING", config.timeline.opening);
        apply!("TIMELINE_MIN_SEGMENT", config.timeline.min_segment);
        apply!("TIMELINE_MAX_SEGMENT", config.timeline.max_segment);

        apply!("REMOTE_ENABLED", config.remote.enabled);
        apply_string!("REMOTE_BASE_URL", config.remote.base_url);
        apply_string!("REMOTE_API_KEY", config.remote.api_key);
        apply!("REMOTE_MAX_WAIT_SECS", config.remote.max_wait_secs);
        apply!("REMOTE_POLL_INTERVAL_SECS", config.remote.poll_interval_secs);

        if let Some(mode) = self.get_env("NARRATION_MODE") {
            config.narration.mode = parse_narration_mode(mode)?;
            overrides += 1;
        }
        if let Some(url) = self.string("NARRATION_BASE_URL") {
            config.narration.base_url = url;
            overrides += 1;
        }
        apply_string!("NARRATION_API_KEY", config.narration.api_key);
        if let Some(model) = self.string("NARRATION_MODEL") {
            config.narration.model = model;
            overrides += 1;
        }

        if let Some(mode) = self.get_env("SPEECH_MODE") {
            config.speech.mode = parse_speech_mode(mode)?;
            overrides += 1;
        }
        apply_string!("SPEECH_BASE_URL", config.speech.base_url);
        apply_string!("SPEECH_API_KEY", config.speech.api_key);
        if let Some(voice) = self.string("SPEECH_VOICE") {
            config.speech.voice = voice;
            overrides += 1;
        }

        apply!("ASSETS_SCREENSHOT_CAP", config.assets.screenshot_cap);
        apply!("ASSETS_MAX_CONCURRENT", config.assets.max_concurrent_assets);

        if let Some(dir) = self.string("OUTPUT_MEDIA_DIR") {
            config.output.media_dir = PathBuf::from(dir);
            overrides += 1;
        }
        if let Some(dir) = self.string("OUTPUT_WORK_DIR") {
            config.output.work_dir = Some(PathBuf::from(dir));
            overrides += 1;
        }

        if overrides > 0 {
            info!("Applied {} environment variable overrides", overrides);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> EnvConfigAdapter {
        EnvConfigAdapter::from_vars(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn test_overrides_applied() {
        let env = vars(&[
            ("LESSON_VIDEO_FPS", "30"),
            ("LESSON_REMOTE_ENABLED", "true"),
            ("LESSON_REMOTE_BASE_URL", "http://gen.local"),
            ("LESSON_NARRATION_MODE", "chat"),
            ("LESSON_ASSETS_MAX_CONCURRENT", "2"),
            ("PATH", "/usr/bin"),
        ]);
        let config = env.load(CompositorConfig::default()).unwrap();
        assert_eq!(config.video.fps, 30);
        assert!(config.remote.enabled);
        assert_eq!(config.remote.base_url.as_deref(), Some("http://gen.local"));
        assert_eq!(config.narration.mode, NarrationMode::Chat);
        assert_eq!(config.assets.max_concurrent_assets, 2);
        assert!(env.get_env("PATH").is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(vars(&[("LESSON_VIDEO_FPS", "fast")])
            .load(CompositorConfig::default())
            .is_err());
        assert!(vars(&[("LESSON_SPEECH_MODE", "robot")])
            .load(CompositorConfig::default())
            .is_err());
    }

    #[test]
    fn test_empty_environment_keeps_base() {
        let base = CompositorConfig::default();
        assert_eq!(vars(&[]).load(base.clone()).unwrap(), base);
    }
}
