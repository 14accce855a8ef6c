//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::{FfprobeAdapter, ScreenshotDirectory};
use crate::app::{AppContainer, LessonRequest, VerifyInteractor, VerifyRequest};
use crate::cli::args::{PlanArgs, RenderArgs, SlideArgs, VerifyArgs};
use crate::config::CompositorConfig;
use crate::domain::model::{AssetKind, AssetRequest, EntryRole, FrameSpec};
use crate::domain::rules::TimelineAllocator;
use crate::engine::SlideRenderer;
use crate::utils::{format_file_size, format_seconds};

/// Parse a `KIND=VALUE` plan candidate
pub fn parse_candidate(raw: &str) -> Result<AssetRequest> {
    let (kind, value) = raw
        .split_once('=')
        .with_context(|| format!("Candidate '{}' is not KIND=VALUE", raw))?;
    let kind = AssetKind::parse(kind)?;
    Ok(AssetRequest::new(kind, value.trim()))
}

/// Execute the render command
pub async fn render(
    args: RenderArgs,
    container: &dyn AppContainer,
    config: &CompositorConfig,
) -> Result<()> {
    info!("Starting render operation");
    info!("Title: {}", args.title);

    let source_text = match &args.source {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source text {}", path.display()))?,
        None => String::new(),
    };

    let mut screenshots = args.screenshots.clone();
    if let Some(dir) = &args.screenshot_dir {
        let found = ScreenshotDirectory::scan(dir, config.assets.screenshot_cap)
            .context("Failed to scan screenshot directory")?;
        screenshots.extend(found.paths().iter().cloned());
    }
    for path in &screenshots {
        if !path.is_file() {
            warn!("Screenshot does not exist and will be substituted: {}", path.display());
        }
    }

    let mut request = LessonRequest::new(&args.title)?
        .with_source_text(source_text)
        .with_screenshots(screenshots)
        .with_image_prompts(args.image_prompts)
        .with_video_prompts(args.video_prompts);
    if let Some(output) = args.output {
        request = request.with_output_path(output);
    }

    let handle = container.render_interactor().spawn(request);
    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling render");
            cancel.cancel();
        }
    });
    let result = handle.wait().await;
    interrupt.abort();

    let artifact = result.context("Render failed")?;
    info!(
        "Render completed: {} ({}, {} substitutions)",
        artifact.path.display(),
        format_seconds(artifact.duration),
        artifact.substitutions()
    );
    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}

#[derive(Serialize)]
struct PlannedSegment<'a> {
    kind: AssetKind,
    role: EntryRole,
    source: &'a str,
    duration: f64,
    start_frame: u64,
    end_frame: u64,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    duration: f64,
    fps: u32,
    dropped: usize,
    segments: Vec<PlannedSegment<'a>>,
}

/// Execute the plan command
pub fn plan(args: PlanArgs, config: &CompositorConfig) -> Result<()> {
    let spec = config.frame_spec()?;
    let candidates = args
        .candidates
        .iter()
        .map(|raw| parse_candidate(raw))
        .collect::<Result<Vec<_>>>()?;

    let allocator = TimelineAllocator::new(config.timeline)?;
    let plan = allocator
        .plan(args.duration, &args.title, &candidates)
        .context("Failed to plan timeline")?;
    info!("Planned {} segments, {} dropped", plan.len(), plan.dropped);

    let segments = plan
        .entries
        .iter()
        .zip(plan.frame_spans(&spec))
        .map(|(entry, (start, end))| PlannedSegment {
            kind: entry.request.kind,
            role: entry.role,
            source: &entry.request.prompt_or_source,
            duration: entry.allocated_duration,
            start_frame: start,
            end_frame: end,
        })
        .collect();
    let report = PlanReport {
        duration: args.duration,
        fps: spec.fps,
        dropped: plan.dropped,
        segments,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Execute the slide command
pub fn slide(args: SlideArgs, config: &CompositorConfig) -> Result<()> {
    let spec = FrameSpec::new(
        args.width.unwrap_or(config.video.width),
        args.height.unwrap_or(config.video.height),
        config.video.fps,
    )?;

    let renderer = SlideRenderer::new();
    let png = renderer
        .render_png(&args.text, spec)
        .context("Failed to encode slide")?;
    write_output(&args.output, &png)?;
    info!(
        "Slide written: {} ({})",
        args.output.display(),
        format_file_size(png.len() as u64)
    );
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Execute the verify command
pub async fn verify(args: VerifyArgs) -> Result<()> {
    let request = VerifyRequest::new(&args.input, args.expected, args.tolerance)?;
    let interactor = VerifyInteractor::new(std::sync::Arc::new(FfprobeAdapter::default()));
    let response = interactor
        .execute(request)
        .await
        .context("Failed to verify output")?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.validation.overall_valid {
        anyhow::bail!(
            "Duration {:.3}s differs from expected {:.3}s by more than {:.3}s",
            response.validation.actual,
            response.validation.expected,
            response.validation.tolerance
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidate() {
        let shot = parse_candidate("screenshot=shots/a.png").unwrap();
        assert_eq!(shot.kind, AssetKind::Screenshot);
        assert_eq!(shot.prompt_or_source, "shots/a.png");

        let video = parse_candidate("remote_video=a = b").unwrap();
        assert_eq!(video.kind, AssetKind::RemoteVideo);
        assert_eq!(video.prompt_or_source, "a = b");

        assert!(parse_candidate("screenshot").is_err());
        assert!(parse_candidate("hologram=x").is_err());
    }
}
