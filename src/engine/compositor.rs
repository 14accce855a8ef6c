//! Timeline compositor
//!
//! Plans the timeline against the narration, materializes each entry through
//! the ranked adapters for its kind (substituting a slide when they all fail),
//! concatenates, conforms to the narration length, then encodes into a temp
//! file beside the output and renames it into place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{AdapterFailure, FailureReason};
use crate::domain::model::*;
use crate::domain::rules::TimelineAllocator;
use crate::engine::effect::apply_pan_zoom;
use crate::engine::slide::SlideRenderer;
use crate::engine::track::{render_track, FrameSource, VisualTrack};
use crate::error::{CompositorError, CompositorResult, EncodeError};
use crate::ports::{AssetContext, AssetSourcePort, ClipDecodePort, EncodeJob, EncodePort};

/// Inputs for one video
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub title: String,
    pub script: String,
    pub candidates: Vec<AssetRequest>,
    pub output_path: PathBuf,
}

/// Resources owned by a single render.
///
/// The scratch directory is deleted when the scope is dropped, on every exit
/// path.
#[derive(Debug)]
pub struct RenderScope {
    work_dir: TempDir,
    cancel: CancellationToken,
    request_id: Uuid,
}

impl RenderScope {
    /// Create a scratch directory under `parent`, or the system temp dir
    pub fn new(parent: Option<&Path>, cancel: CancellationToken) -> std::io::Result<Self> {
        let request_id = Uuid::new_v4();
        let prefix = format!("render-{}-", request_id.simple());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let work_dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self {
            work_dir,
            cancel,
            request_id,
        })
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn asset_context(&self, spec: FrameSpec) -> AssetContext {
        AssetContext {
            work_dir: self.work_dir.path().to_path_buf(),
            cancel: self.cancel.clone(),
            spec,
        }
    }
}

/// Ranked adapters per asset kind
#[derive(Clone, Default)]
pub struct AdapterStrategies {
    ranked: HashMap<AssetKind, Vec<Arc<dyn AssetSourcePort>>>,
}

impl AdapterStrategies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter after any already registered for its kind
    pub fn register(&mut self, adapter: Arc<dyn AssetSourcePort>) -> &mut Self {
        self.ranked.entry(adapter.kind()).or_default().push(adapter);
        self
    }

    pub fn ranked(&self, kind: AssetKind) -> &[Arc<dyn AssetSourcePort>] {
        self.ranked.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn supports(&self, kind: AssetKind) -> bool {
        !self.ranked(kind).is_empty()
    }
}

/// Compositor settings derived from configuration
#[derive(Debug, Clone, Copy)]
pub struct CompositorSettings {
    pub spec: FrameSpec,
    pub zoom_ratio: f64,
    pub bounds: TimelineBounds,
    pub max_concurrent_assets: usize,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            spec: FrameSpec::default(),
            zoom_ratio: 0.04,
            bounds: TimelineBounds::default(),
            max_concurrent_assets: num_cpus::get(),
        }
    }
}

/// What happened to one plan entry
#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub index: usize,
    pub requested: AssetKind,
    pub rendered: AssetKind,
    pub role: EntryRole,
    pub adapter: Option<&'static str>,
    pub allocated_duration: f64,
    pub frames: u64,
    pub substituted: bool,
    pub failures: Vec<String>,
}

/// Published render
#[derive(Debug, Clone, Serialize)]
pub struct OutputArtifact {
    pub request_id: Uuid,
    pub path: PathBuf,
    pub duration: f64,
    pub audio_duration: f64,
    pub frame_count: u64,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub segments: Vec<SegmentReport>,
    pub dropped_candidates: usize,
    pub padded_frames: u64,
    pub trimmed_frames: u64,
    pub created_at: DateTime<Utc>,
}

impl OutputArtifact {
    pub fn substitutions(&self) -> usize {
        self.segments.iter().filter(|s| s.substituted).count()
    }
}

struct Materialized {
    segment: RenderedSegment,
    adapter: Option<&'static str>,
    substituted: bool,
    failures: Vec<AdapterFailure>,
}

/// Assembles narrated lesson videos
pub struct Compositor {
    settings: CompositorSettings,
    allocator: TimelineAllocator,
    strategies: AdapterStrategies,
    slides: Arc<SlideRenderer>,
    encoder: Arc<dyn EncodePort>,
    decoder: Arc<dyn ClipDecodePort>,
}

impl Compositor {
    pub fn new(
        settings: CompositorSettings,
        strategies: AdapterStrategies,
        slides: Arc<SlideRenderer>,
        encoder: Arc<dyn EncodePort>,
        decoder: Arc<dyn ClipDecodePort>,
    ) -> CompositorResult<Self> {
        settings.spec.validate()?;
        let allocator = TimelineAllocator::new(settings.bounds)?;
        Ok(Self {
            settings,
            allocator,
            strategies,
            slides,
            encoder,
            decoder,
        })
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    pub fn allocator(&self) -> &TimelineAllocator {
        &self.allocator
    }

    pub fn strategies(&self) -> &AdapterStrategies {
        &self.strategies
    }

    /// Render `request` timed to `audio` and publish it at `request.output_path`
    pub async fn render(
        &self,
        request: &RenderRequest,
        audio: &AudioTrack,
        scope: &RenderScope,
    ) -> CompositorResult<OutputArtifact> {
        let spec = self.settings.spec;
        let plan = self
            .allocator
            .plan(audio.duration(), &request.title, &request.candidates)?;
        info!(
            request_id = %scope.request_id(),
            audio_duration = audio.duration(),
            script_chars = request.script.chars().count(),
            entries = plan.len(),
            dropped = plan.dropped,
            "Planned timeline"
        );

        let ctx = scope.asset_context(spec);
        let materialized = self.materialize_all(&plan, &request.title, &ctx).await;
        if scope.cancel().is_cancelled() {
            return Err(CompositorError::Cancelled);
        }

        let mut track = VisualTrack::new(spec);
        let mut reports = Vec::with_capacity(plan.len());
        for ((index, entry), (item, (start, end))) in plan
            .entries
            .iter()
            .enumerate()
            .zip(materialized.into_iter().zip(plan.frame_spans(&spec)))
        {
            let frames = end - start;
            let seconds = spec.seconds_for(frames);
            let source = match item.segment.visual {
                Visual::Still(still) => {
                    FrameSource::PanZoom(apply_pan_zoom(still, seconds, self.settings.zoom_ratio))
                }
                Visual::Motion(MotionClip::PanZoom(clip)) => FrameSource::PanZoom(clip),
                Visual::Motion(MotionClip::Native { clip, .. }) => {
                    let fit = ClipFit::for_clip(clip.duration, seconds);
                    FrameSource::Native { clip, fit }
                }
            };
            track.push(source, frames, Some(item.segment.kind));
            reports.push(SegmentReport {
                index,
                requested: entry.request.kind,
                rendered: item.segment.kind,
                role: entry.role,
                adapter: item.adapter,
                allocated_duration: entry.allocated_duration,
                frames,
                substituted: item.substituted,
                failures: item.failures.iter().map(|f| f.to_string()).collect(),
            });
        }

        // Always at least one frame, so a tiny narration still yields a video
        let target_frames = spec.frames_for(audio.duration()).max(1);
        let conform = track.conform(target_frames);

        let output_path = request.output_path.clone();
        let frame_count = self
            .encode(track, audio, &output_path, target_frames, scope.cancel())
            .await?;

        let artifact = OutputArtifact {
            request_id: scope.request_id(),
            path: output_path,
            duration: spec.seconds_for(frame_count),
            audio_duration: audio.duration(),
            frame_count,
            fps: spec.fps,
            width: spec.width,
            height: spec.height,
            segments: reports,
            dropped_candidates: plan.dropped,
            padded_frames: conform.padded_frames,
            trimmed_frames: conform.trimmed_frames,
            created_at: Utc::now(),
        };
        info!(
            request_id = %artifact.request_id,
            path = %artifact.path.display(),
            duration = artifact.duration,
            substitutions = artifact.substitutions(),
            "Render published"
        );
        Ok(artifact)
    }

    /// Materialize every entry with bounded concurrency, in plan order.
    ///
    /// Entries are addressed by index so the per-entry future has no borrowed
    /// argument of its own, which keeps `render` spawnable.
    async fn materialize_all(
        &self,
        plan: &TimelinePlan,
        title: &str,
        ctx: &AssetContext,
    ) -> Vec<Materialized> {
        let limit = self.settings.max_concurrent_assets.max(1);
        stream::iter(0..plan.entries.len())
            .map(move |index| self.materialize_entry(&plan.entries[index], title, ctx))
            .buffered(limit)
            .collect()
            .await
    }

    async fn materialize_entry(
        &self,
        entry: &PlanEntry,
        title: &str,
        ctx: &AssetContext,
    ) -> Materialized {
        let kind = entry.request.kind;
        let mut failures = Vec::new();

        let adapters = self.strategies.ranked(kind);
        if adapters.is_empty() {
            failures.push(AdapterFailure::new(kind, FailureReason::Unavailable));
        }

        for adapter in adapters {
            if ctx.cancel.is_cancelled() {
                failures.push(AdapterFailure::new(kind, FailureReason::Cancelled));
                break;
            }
            match adapter.materialize(&entry.request, ctx).await {
                Ok(segment) => {
                    debug!(adapter = adapter.name(), %kind, "Asset materialized");
                    let segment = RenderedSegment {
                        duration: entry.allocated_duration,
                        ..segment
                    };
                    return Materialized {
                        segment,
                        adapter: Some(adapter.name()),
                        substituted: false,
                        failures,
                    };
                }
                Err(failure) => {
                    warn!(adapter = adapter.name(), %failure, "Asset adapter failed");
                    failures.push(failure);
                }
            }
        }

        warn!(%kind, duration = entry.allocated_duration, "Substituting fallback slide");
        let still = self.slides.render(title, ctx.spec);
        Materialized {
            segment: RenderedSegment {
                visual: Visual::Still(still),
                duration: entry.allocated_duration,
                kind: AssetKind::Slide,
            },
            adapter: None,
            substituted: true,
            failures,
        }
    }

    /// Encode into a temp file beside `output` and rename it into place
    async fn encode(
        &self,
        track: VisualTrack,
        audio: &AudioTrack,
        output: &Path,
        frame_count: u64,
        cancel: &CancellationToken,
    ) -> CompositorResult<u64> {
        let parent = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let temp = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(".mp4")
            .tempfile_in(&parent)?
            .into_temp_path();

        let job = EncodeJob {
            spec: self.settings.spec,
            audio: audio.clone(),
            output: temp.to_path_buf(),
            frame_count,
        };
        let encoder = self.encoder.clone();
        let decoder = self.decoder.clone();
        let blocking_cancel = cancel.clone();

        info!(frames = frame_count, output = %output.display(), "Encoding");
        let written = tokio::task::spawn_blocking(move || -> Result<u64, EncodeError> {
            let mut writer = encoder.open(&job)?;
            match render_track(&track, decoder.as_ref(), writer.as_mut(), &blocking_cancel) {
                Ok(written) => {
                    writer.finish()?;
                    Ok(written)
                }
                Err(e) => {
                    writer.abort();
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| CompositorError::MuxEncode {
            source: EncodeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("encode task failed: {}", e),
            )),
        })??;

        if cancel.is_cancelled() {
            return Err(CompositorError::Cancelled);
        }

        temp.persist(output).map_err(|e| CompositorError::Io(e.error))?;
        Ok(written)
    }
}
