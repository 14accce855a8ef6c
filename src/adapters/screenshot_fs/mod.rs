// Screenshot filesystem adapter - Local screenshot pool

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::adapters::segment_duration;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::{AssetContext, AssetSourcePort};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Bounded, ordered list of screenshots on disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenshotDirectory {
    paths: Vec<PathBuf>,
}

impl ScreenshotDirectory {
    /// Keep the first `cap` paths in the given order
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>, cap: usize) -> Self {
        Self {
            paths: paths.into_iter().take(cap).collect(),
        }
    }

    /// List image files directly inside `dir`, sorted by file name
    pub fn scan(dir: &Path, cap: usize) -> Result<Self, DomainError> {
        if !dir.is_dir() {
            return Err(DomainError::FileNotFound(format!(
                "Screenshot directory does not exist: {}",
                dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                DomainError::BadArgs(format!("Failed to read screenshot directory: {}", e))
            })?;
            if entry.file_type().is_file() && is_image(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        info!(dir = %dir.display(), found = paths.len(), cap, "Scanned screenshots");
        Ok(Self::from_paths(paths, cap))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Screenshot asset requests in order
    pub fn requests(&self) -> Vec<AssetRequest> {
        self.paths.iter().map(AssetRequest::screenshot).collect()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Loads a local screenshot and fits it to the canonical frame
#[derive(Debug, Clone, Default)]
pub struct ScreenshotAdapter;

impl ScreenshotAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AssetSourcePort for ScreenshotAdapter {
    fn name(&self) -> &'static str {
        "screenshot_fs"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Screenshot
    }

    async fn materialize(
        &self,
        request: &AssetRequest,
        ctx: &AssetContext,
    ) -> Result<RenderedSegment, AdapterFailure> {
        let path = PathBuf::from(&request.prompt_or_source);
        if !path.is_file() {
            return Err(AdapterFailure::new(
                AssetKind::Screenshot,
                FailureReason::SourceMissing(path.display().to_string()),
            ));
        }

        let spec = ctx.spec;
        let decode_path = path.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            image::open(&decode_path).map(|img| StillFrame::fit(img, spec))
        })
        .await
        .map_err(|e| {
            AdapterFailure::new(
                AssetKind::Screenshot,
                FailureReason::SourceCorrupt(format!("decode task failed: {}", e)),
            )
        })?;

        let still = decoded.map_err(|e| {
            AdapterFailure::new(
                AssetKind::Screenshot,
                FailureReason::SourceCorrupt(format!("{}: {}", path.display(), e)),
            )
        })?;
        debug!(path = %path.display(), "Loaded screenshot");

        RenderedSegment::still(still, segment_duration(request, &spec), AssetKind::Screenshot)
            .map_err(|e| {
                AdapterFailure::new(
                    AssetKind::Screenshot,
                    FailureReason::SourceCorrupt(e.to_string()),
                )
            })
    }
}
