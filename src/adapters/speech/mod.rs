// Speech adapters - Narration audio sources

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::domain::model::AudioTrack;
use crate::error::{SpeechError, TransportError};
use crate::ports::{ProbePort, SpeechPort};

/// Caller-supplied narration audio; the text is not spoken
pub struct PrerecordedSpeech {
    audio_path: PathBuf,
    probe: Arc<dyn ProbePort>,
}

impl PrerecordedSpeech {
    pub fn new(audio_path: impl Into<PathBuf>, probe: Arc<dyn ProbePort>) -> Self {
        Self {
            audio_path: audio_path.into(),
            probe,
        }
    }
}

#[async_trait]
impl SpeechPort for PrerecordedSpeech {
    async fn synthesize(&self, text: &str, _work_dir: &Path) -> Result<AudioTrack, SpeechError> {
        if !self.audio_path.is_file() {
            return Err(SpeechError::MissingAudio {
                path: self.audio_path.display().to_string(),
            });
        }
        let duration = self.probe.probe_duration(&self.audio_path).await?;
        info!(
            path = %self.audio_path.display(),
            duration,
            script_chars = text.chars().count(),
            "Using prerecorded narration"
        );
        Ok(AudioTrack::new(&self.audio_path, duration)?)
    }
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

/// HTTP text-to-speech service returning an audio body
pub struct HttpSpeechAdapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    voice: String,
    probe: Arc<dyn ProbePort>,
}

impl HttpSpeechAdapter {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        voice: impl Into<String>,
        timeout: Duration,
        probe: Arc<dyn ProbePort>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            voice: voice.into(),
            probe,
        }
    }
}

fn audio_extension(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some(ct) if ct.contains("wav") => "wav",
        Some(ct) if ct.contains("ogg") => "ogg",
        _ => "mp3",
    }
}

#[async_trait]
impl SpeechPort for HttpSpeechAdapter {
    async fn synthesize(&self, text: &str, work_dir: &Path) -> Result<AudioTrack, SpeechError> {
        let url = format!("{}/synthesize", self.base_url);
        let mut builder = self.client.post(&url).json(&SynthesizeRequest {
            text,
            voice: &self.voice,
        });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Service(format!("HTTP {}: {}", status, body.trim())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if bytes.is_empty() {
            return Err(SpeechError::Service("empty audio body".to_string()));
        }

        let path = work_dir.join(format!(
            "narration.{}",
            audio_extension(content_type.as_deref())
        ));
        tokio::fs::write(&path, &bytes).await?;

        let duration = self.probe.probe_duration(&path).await?;
        info!(path = %path.display(), duration, "Narration synthesized");
        Ok(AudioTrack::new(path, duration)?)
    }
}
