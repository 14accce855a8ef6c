// Render interactor - Orchestrates the narrated lesson use case

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::narration::truncate_chars;
use crate::adapters::ScreenshotDirectory;
use crate::domain::errors::DomainError;
use crate::domain::model::{AssetKind, AssetRequest};
use crate::engine::{Compositor, OutputArtifact, RenderRequest, RenderScope};
use crate::error::{CompositorError, CompositorResult};
use crate::ports::{NarrationPort, SpeechPort};
use crate::utils::path::output_path_for;

/// One lesson to narrate and render
#[derive(Debug, Clone, Default)]
pub struct LessonRequest {
    pub title: String,
    pub source_text: String,
    pub screenshots: Vec<PathBuf>,
    pub image_prompts: Vec<String>,
    pub video_prompts: Vec<String>,
    pub output_path: Option<PathBuf>,
}

impl LessonRequest {
    /// Create a request; the title is required
    pub fn new(title: impl Into<String>) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::BadArgs("Lesson title must not be empty".to_string()));
        }
        Ok(Self {
            title: title.trim().to_string(),
            ..Self::default()
        })
    }

    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = text.into();
        self
    }

    pub fn with_screenshots(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.screenshots.extend(paths);
        self
    }

    pub fn with_image_prompts(mut self, prompts: impl IntoIterator<Item = String>) -> Self {
        self.image_prompts.extend(prompts);
        self
    }

    pub fn with_video_prompts(mut self, prompts: impl IntoIterator<Item = String>) -> Self {
        self.video_prompts.extend(prompts);
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// Settings the interactor needs beyond its collaborators
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub media_dir: PathBuf,
    pub work_root: Option<PathBuf>,
    pub max_script_chars: usize,
    pub screenshot_cap: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media"),
            work_root: None,
            max_script_chars: 2500,
            screenshot_cap: 5,
        }
    }
}

/// Interactor for the lesson render use case
pub struct RenderInteractor {
    narration: Arc<dyn NarrationPort>,
    speech: Arc<dyn SpeechPort>,
    compositor: Arc<Compositor>,
    settings: RenderSettings,
}

impl RenderInteractor {
    /// Create new render interactor with injected ports
    pub fn new(
        narration: Arc<dyn NarrationPort>,
        speech: Arc<dyn SpeechPort>,
        compositor: Arc<Compositor>,
        settings: RenderSettings,
    ) -> Self {
        Self {
            narration,
            speech,
            compositor,
            settings,
        }
    }

    pub fn compositor(&self) -> &Arc<Compositor> {
        &self.compositor
    }

    /// Asset candidates in presentation order: screenshots, then remote
    /// images, then remote videos. Kinds with no registered adapter are
    /// left out.
    pub fn candidates(&self, request: &LessonRequest) -> Vec<AssetRequest> {
        let strategies = self.compositor.strategies();
        let mut candidates = Vec::new();

        if strategies.supports(AssetKind::Screenshot) {
            let screenshots = ScreenshotDirectory::from_paths(
                request.screenshots.iter().cloned(),
                self.settings.screenshot_cap,
            );
            if screenshots.len() < request.screenshots.len() {
                warn!(
                    supplied = request.screenshots.len(),
                    cap = self.settings.screenshot_cap,
                    "Screenshot list capped"
                );
            }
            candidates.extend(screenshots.requests());
        }

        let prompted = [
            (AssetKind::RemoteImage, &request.image_prompts),
            (AssetKind::RemoteVideo, &request.video_prompts),
        ];
        for (kind, prompts) in prompted {
            if prompts.is_empty() {
                continue;
            }
            if !strategies.supports(kind) {
                info!(%kind, skipped = prompts.len(), "No adapter registered, prompts skipped");
                continue;
            }
            candidates.extend(
                prompts
                    .iter()
                    .map(|prompt| AssetRequest::new(kind, prompt.as_str())),
            );
        }

        candidates
    }

    /// Narrate, synthesize and render one lesson
    pub async fn execute(
        &self,
        request: LessonRequest,
        cancel: CancellationToken,
    ) -> CompositorResult<OutputArtifact> {
        let scope = RenderScope::new(self.settings.work_root.as_deref(), cancel)?;
        info!(
            request_id = %scope.request_id(),
            title = %request.title,
            "Starting lesson render"
        );

        let script = self
            .narration
            .generate_script(&request.title, &request.source_text)
            .await?;
        let script = truncate_chars(&script, self.settings.max_script_chars).to_string();
        info!(chars = script.chars().count(), "Narration script ready");

        if scope.cancel().is_cancelled() {
            return Err(CompositorError::Cancelled);
        }

        let audio = tokio::select! {
            _ = scope.cancel().cancelled() => return Err(CompositorError::Cancelled),
            audio = self.speech.synthesize(&script, scope.work_dir()) => audio?,
        };
        info!(duration = audio.duration(), "Narration audio ready");

        let output_path = request.output_path.clone().unwrap_or_else(|| {
            output_path_for(&self.settings.media_dir, &request.title, scope.request_id())
        });

        let render = RenderRequest {
            title: request.title.clone(),
            script,
            candidates: self.candidates(&request),
            output_path,
        };
        self.compositor.render(&render, &audio, &scope).await
    }

    /// Run the render on a background task
    pub fn spawn(self: Arc<Self>, request: LessonRequest) -> RenderHandle {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { self.execute(request, task_cancel).await });
        RenderHandle { cancel, task }
    }
}

/// Handle to a render running in the background
pub struct RenderHandle {
    cancel: CancellationToken,
    task: JoinHandle<CompositorResult<OutputArtifact>>,
}

impl RenderHandle {
    /// Request cancellation; polling and encoding stop and nothing is published
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the render to finish
    pub async fn wait(self) -> CompositorResult<OutputArtifact> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(CompositorError::Cancelled),
            Err(e) => Err(CompositorError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("render task failed: {}", e),
            ))),
        }
    }
}
