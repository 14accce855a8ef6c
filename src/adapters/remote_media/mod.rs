// Remote media adapters - AI image and video generation through the job poller

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapters::segment_duration;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::poller::{JobFailure, JobOutcome, RemoteJobPoller};
use crate::error::TransportError;
use crate::ports::{AssetContext, AssetSourcePort, ProbePort};

/// Map a poller result onto the fetched media or an adapter failure
fn into_media(
    kind: AssetKind,
    result: Result<JobOutcome, TransportError>,
) -> Result<MediaBytes, AdapterFailure> {
    let reason = match result {
        Ok(JobOutcome::Completed { media, .. }) => return Ok(media),
        Ok(JobOutcome::Failed(JobFailure::Rejected(reason))) => {
            FailureReason::GenerationRejected(reason)
        }
        Ok(JobOutcome::Failed(JobFailure::Failed { reason, .. })) => {
            FailureReason::GenerationFailed(reason)
        }
        Ok(JobOutcome::Failed(JobFailure::TimedOut { polls })) => {
            FailureReason::GenerationTimeout { polls }
        }
        Ok(JobOutcome::Failed(JobFailure::Cancelled { .. })) => FailureReason::Cancelled,
        Err(e) => FailureReason::Transport(e.to_string()),
    };
    Err(AdapterFailure::new(kind, reason))
}

/// Still image generated by a remote job
pub struct RemoteImageAdapter {
    poller: RemoteJobPoller,
}

impl RemoteImageAdapter {
    pub fn new(poller: RemoteJobPoller) -> Self {
        Self { poller }
    }
}

#[async_trait]
impl AssetSourcePort for RemoteImageAdapter {
    fn name(&self) -> &'static str {
        "remote_image"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::RemoteImage
    }

    async fn materialize(
        &self,
        request: &AssetRequest,
        ctx: &AssetContext,
    ) -> Result<RenderedSegment, AdapterFailure> {
        let kind = AssetKind::RemoteImage;
        let result = self
            .poller
            .run(&request.prompt_or_source, JobType::Image, &ctx.cancel)
            .await;
        let media = into_media(kind, result)?;

        let spec = ctx.spec;
        let still = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&media.bytes).map(|img| StillFrame::fit(img, spec))
        })
        .await
        .map_err(|e| {
            AdapterFailure::new(kind, FailureReason::SourceCorrupt(e.to_string()))
        })?
        .map_err(|e| {
            AdapterFailure::new(
                kind,
                FailureReason::SourceCorrupt(format!("undecodable image: {}", e)),
            )
        })?;

        RenderedSegment::still(still, segment_duration(request, &spec), kind)
            .map_err(|e| AdapterFailure::new(kind, FailureReason::SourceCorrupt(e.to_string())))
    }
}

/// Video clip generated by a remote job, written to the render scratch dir
pub struct RemoteVideoAdapter {
    poller: RemoteJobPoller,
    probe: Arc<dyn ProbePort>,
}

impl RemoteVideoAdapter {
    pub fn new(poller: RemoteJobPoller, probe: Arc<dyn ProbePort>) -> Self {
        Self { poller, probe }
    }
}

fn video_extension(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some(ct) if ct.contains("webm") => "webm",
        Some(ct) if ct.contains("quicktime") => "mov",
        _ => "mp4",
    }
}

#[async_trait]
impl AssetSourcePort for RemoteVideoAdapter {
    fn name(&self) -> &'static str {
        "remote_video"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::RemoteVideo
    }

    async fn materialize(
        &self,
        request: &AssetRequest,
        ctx: &AssetContext,
    ) -> Result<RenderedSegment, AdapterFailure> {
        let kind = AssetKind::RemoteVideo;
        let result = self
            .poller
            .run(&request.prompt_or_source, JobType::Video, &ctx.cancel)
            .await;
        let media = into_media(kind, result)?;

        let path = ctx.work_dir.join(format!(
            "remote-{}.{}",
            Uuid::new_v4().simple(),
            video_extension(media.content_type.as_deref())
        ));
        tokio::fs::write(&path, &media.bytes).await.map_err(|e| {
            AdapterFailure::new(
                kind,
                FailureReason::SourceCorrupt(format!("failed to store clip: {}", e)),
            )
        })?;

        let native = self.probe.probe_duration(&path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Generated clip could not be probed");
            AdapterFailure::new(kind, FailureReason::SourceCorrupt(e.to_string()))
        })?;
        let clip = VideoClip::new(&path, native)
            .map_err(|e| AdapterFailure::new(kind, FailureReason::SourceCorrupt(e.to_string())))?;

        let duration = segment_duration(request, &ctx.spec);
        let fit = ClipFit::for_clip(clip.duration, duration);
        debug!(path = %path.display(), native, duration, ?fit, "Stored generated clip");

        RenderedSegment::new(Visual::Motion(MotionClip::Native { clip, fit }), duration, kind)
            .map_err(|e| AdapterFailure::new(kind, FailureReason::SourceCorrupt(e.to_string())))
    }
}
