use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapters::{
    ChatNarration, FfmpegClipDecoder, FfmpegEncoder, FfprobeAdapter, HttpJobClient,
    HttpSpeechAdapter, PrerecordedSpeech, RemoteImageAdapter, RemoteVideoAdapter,
    ScreenshotAdapter, SlideCardAdapter, VerbatimNarration,
};
use crate::app::render_interactor::{RenderInteractor, RenderSettings};
use crate::config::{CompositorConfig, NarrationMode, SpeechMode};
use crate::engine::{
    AdapterStrategies, Compositor, CompositorSettings, RemoteJobPoller, SlideRenderer,
};
use crate::error::{CompositorError, CompositorResult};
use crate::ports::{NarrationPort, ProbePort, RemoteJobPort, SpeechPort};

pub trait AppContainer: Send + Sync {
    fn render_interactor(&self) -> Arc<RenderInteractor>;
    fn compositor(&self) -> Arc<Compositor>;
}

pub struct DefaultAppContainer {
    render_interactor: Arc<RenderInteractor>,
    compositor: Arc<Compositor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters from a validated configuration
    pub fn from_config(config: &CompositorConfig) -> CompositorResult<Self> {
        config.validate()?;
        let spec = config.frame_spec()?;
        let timeout = Duration::from_secs(config.remote.request_timeout_secs.max(1));

        let slides = Arc::new(SlideRenderer::new());
        let probe: Arc<dyn ProbePort> = Arc::new(FfprobeAdapter::default());

        let mut strategies = AdapterStrategies::new();
        strategies
            .register(Arc::new(SlideCardAdapter::new(Arc::clone(&slides))))
            .register(Arc::new(ScreenshotAdapter::new()));

        if config.remote.enabled {
            let base_url = required(config.remote.base_url.as_deref(), "remote.base_url")?;
            let client: Arc<dyn RemoteJobPort> = Arc::new(HttpJobClient::new(
                base_url,
                config.remote.api_key.clone(),
                timeout,
            ));
            let poller = RemoteJobPoller::new(client, config.poll_policy()?);
            strategies
                .register(Arc::new(RemoteImageAdapter::new(poller.clone())))
                .register(Arc::new(RemoteVideoAdapter::new(poller, Arc::clone(&probe))));
            info!(base_url, "Remote generation enabled");
        }

        let settings = CompositorSettings {
            spec,
            zoom_ratio: config.video.zoom_ratio,
            bounds: config.timeline,
            max_concurrent_assets: config.assets.max_concurrent_assets,
        };
        let compositor = Arc::new(Compositor::new(
            settings,
            strategies,
            Arc::clone(&slides),
            Arc::new(FfmpegEncoder::default()),
            Arc::new(FfmpegClipDecoder::default()),
        )?);

        let narration: Arc<dyn NarrationPort> = match config.narration.mode {
            NarrationMode::Verbatim => Arc::new(VerbatimNarration::new()),
            NarrationMode::Chat => Arc::new(ChatNarration::new(
                config.narration.base_url.clone(),
                config.narration.api_key.clone(),
                config.narration.model.clone(),
                timeout,
            )),
        };

        let speech: Arc<dyn SpeechPort> = match config.speech.mode {
            SpeechMode::Prerecorded => {
                let audio = config.speech.audio_file.clone().ok_or_else(|| {
                    CompositorError::Config {
                        message: "Prerecorded speech needs an audio file (--audio or speech.audio_file)"
                            .to_string(),
                    }
                })?;
                Arc::new(PrerecordedSpeech::new(audio, Arc::clone(&probe)))
            }
            SpeechMode::Http => Arc::new(HttpSpeechAdapter::new(
                required(config.speech.base_url.as_deref(), "speech.base_url")?,
                config.speech.api_key.clone(),
                config.speech.voice.clone(),
                timeout,
                Arc::clone(&probe),
            )),
        };

        let render_interactor = Arc::new(RenderInteractor::new(
            narration,
            speech,
            Arc::clone(&compositor),
            RenderSettings {
                media_dir: config.output.media_dir.clone(),
                work_root: config.output.work_dir.clone(),
                max_script_chars: config.narration.max_script_chars,
                screenshot_cap: config.assets.screenshot_cap,
            },
        ));

        Ok(Self {
            render_interactor,
            compositor,
        })
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> CompositorResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CompositorError::Config {
            message: format!("{} is not set", key),
        })
}

impl AppContainer for DefaultAppContainer {
    fn render_interactor(&self) -> Arc<RenderInteractor> {
        Arc::clone(&self.render_interactor)
    }

    fn compositor(&self) -> Arc<Compositor> {
        Arc::clone(&self.compositor)
    }
}
