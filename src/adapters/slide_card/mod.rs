//! Slide card adapter
//!
//! Local, deterministic title/slide renderer. It never fails and backs every
//! fallback substitution.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::adapters::segment_duration;
use crate::domain::errors::AdapterFailure;
use crate::domain::model::*;
use crate::engine::slide::{SlideRenderer, BACKGROUND};
use crate::ports::{AssetContext, AssetSourcePort};

pub struct SlideCardAdapter {
    renderer: Arc<SlideRenderer>,
}

impl SlideCardAdapter {
    pub fn new(renderer: Arc<SlideRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl AssetSourcePort for SlideCardAdapter {
    fn name(&self) -> &'static str {
        "slide_card"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Slide
    }

    async fn materialize(
        &self,
        request: &AssetRequest,
        ctx: &AssetContext,
    ) -> Result<RenderedSegment, AdapterFailure> {
        let spec = ctx.spec;
        let renderer = self.renderer.clone();
        let text = request.prompt_or_source.clone();

        let still = match tokio::task::spawn_blocking(move || renderer.render(&text, spec)).await {
            Ok(still) => still,
            Err(e) => {
                warn!(error = %e, "Slide render task failed, using plain background");
                StillFrame::solid(spec, BACKGROUND)
            }
        };

        let duration = segment_duration(request, &spec);
        Ok(RenderedSegment {
            visual: Visual::Still(still),
            duration,
            kind: AssetKind::Slide,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_slide_materializes_for_hint_duration() {
        let renderer = Arc::new(SlideRenderer::with_fontdb(Arc::new(
            usvg::fontdb::Database::new(),
        )));
        let adapter = SlideCardAdapter::new(renderer);
        let spec = FrameSpec::new(64, 36, 24).unwrap();
        let ctx = AssetContext {
            work_dir: std::env::temp_dir(),
            cancel: CancellationToken::new(),
            spec,
        };

        let request = AssetRequest::slide("Intro to APIs").with_hint_duration(3.0);
        let segment = adapter.materialize(&request, &ctx).await.unwrap();
        assert_eq!(segment.kind, AssetKind::Slide);
        assert_eq!(segment.duration, 3.0);
        match segment.visual {
            Visual::Still(still) => assert_eq!(still.image().dimensions(), (64, 36)),
            other => panic!("expected still, got {:?}", other),
        }
    }
}
