//! End-to-end compositor tests with substituted encoder, decoder and services

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use lesson_compositor::adapters::{
    RemoteImageAdapter, RemoteVideoAdapter, ScreenshotAdapter, SlideCardAdapter,
};
use lesson_compositor::domain::model::{
    AssetKind, AssetRequest, AudioTrack, ClipFit, EntryRole, FrameSpec, JobStatus, JobType,
    MediaBytes, PollPolicy, RemoteJob, VideoClip,
};
use lesson_compositor::engine::{
    AdapterStrategies, Compositor, CompositorSettings, RemoteJobPoller, RenderRequest,
    RenderScope, SlideRenderer,
};
use lesson_compositor::error::{
    CompositorError, EncodeError, ProbeError, SubmitError, TransportError,
};
use lesson_compositor::ports::{
    ClipDecodePort, EncodeJob, EncodePort, FrameStream, FrameWriter, ProbePort, RemoteJobPort,
};

const ONE_FRAME: f64 = 1.0 / 24.0;

fn spec() -> FrameSpec {
    FrameSpec::new(64, 36, 24).unwrap()
}

#[derive(Default)]
struct EncoderLog {
    frames: u64,
    finished: bool,
    aborted: bool,
}

/// Encoder that counts frames and writes a marker file on finish
#[derive(Default)]
struct RecordingEncoder {
    log: Arc<Mutex<EncoderLog>>,
    fail_open: bool,
    cancel_after: Option<(u64, CancellationToken)>,
}

struct RecordingWriter {
    log: Arc<Mutex<EncoderLog>>,
    frame_bytes: usize,
    output: PathBuf,
    cancel_after: Option<(u64, CancellationToken)>,
}

impl FrameWriter for RecordingWriter {
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), EncodeError> {
        if frame.len() != self.frame_bytes {
            return Err(EncodeError::FrameSize {
                expected: self.frame_bytes,
                actual: frame.len(),
            });
        }
        let mut log = self.log.lock().unwrap();
        log.frames += 1;
        if let Some((after, token)) = &self.cancel_after {
            if log.frames >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), EncodeError> {
        std::fs::write(&self.output, b"mp4")?;
        self.log.lock().unwrap().finished = true;
        Ok(())
    }

    fn abort(self: Box<Self>) {
        self.log.lock().unwrap().aborted = true;
    }
}

impl EncodePort for RecordingEncoder {
    fn open(&self, job: &EncodeJob) -> Result<Box<dyn FrameWriter>, EncodeError> {
        if self.fail_open {
            return Err(EncodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "Unknown encoder 'libx264'".to_string(),
            });
        }
        Ok(Box::new(RecordingWriter {
            log: self.log.clone(),
            frame_bytes: job.spec.frame_bytes(),
            output: job.output.clone(),
            cancel_after: self.cancel_after.clone(),
        }))
    }
}

/// Decoder producing exactly the requested number of solid frames
struct SolidClips;

struct SolidFrames {
    remaining: u64,
    frame_bytes: usize,
}

impl FrameStream for SolidFrames {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, EncodeError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(vec![90; self.frame_bytes]))
    }
}

impl ClipDecodePort for SolidClips {
    fn open(
        &self,
        _clip: &VideoClip,
        _fit: ClipFit,
        spec: FrameSpec,
        frames: u64,
    ) -> Result<Box<dyn FrameStream>, EncodeError> {
        Ok(Box::new(SolidFrames {
            remaining: frames,
            frame_bytes: spec.frame_bytes(),
        }))
    }
}

#[derive(Clone, Copy)]
enum JobScript {
    Complete,
    NeverComplete,
    Reject,
}

/// Remote generation service following a fixed script
struct ScriptedService {
    script: JobScript,
    payload: Vec<u8>,
    submits: AtomicU32,
    polls: AtomicU32,
}

impl ScriptedService {
    fn new(script: JobScript, payload: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            script,
            payload,
            submits: AtomicU32::new(0),
            polls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl RemoteJobPort for ScriptedService {
    async fn submit(&self, _prompt: &str, _job_type: JobType) -> Result<RemoteJob, SubmitError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        match self.script {
            JobScript::Reject => Err(SubmitError::Rejected("HTTP 429".to_string())),
            _ => Ok(RemoteJob::queued("job-1")),
        }
    }

    async fn get_status(&self, job_id: &str) -> Result<RemoteJob, TransportError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let status = match self.script {
            JobScript::Complete => JobStatus::Completed,
            _ => JobStatus::Running,
        };
        Ok(RemoteJob {
            id: job_id.to_string(),
            status,
            result_ref: Some(format!("/results/{}", job_id)),
            error: None,
        })
    }

    async fn fetch_result(&self, _result_ref: &str) -> Result<MediaBytes, TransportError> {
        Ok(MediaBytes::new(self.payload.clone()))
    }
}

struct FixedProbe(f64);

#[async_trait]
impl ProbePort for FixedProbe {
    async fn probe_duration(&self, _path: &Path) -> Result<f64, ProbeError> {
        Ok(self.0)
    }
}

fn png_bytes() -> Vec<u8> {
    let mut png = std::io::Cursor::new(Vec::new());
    image::RgbImage::from_pixel(40, 30, image::Rgb([10, 120, 200]))
        .write_to(&mut png, image::ImageFormat::Png)
        .unwrap();
    png.into_inner()
}

fn write_screenshot(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes()).unwrap();
    path
}

fn slides() -> Arc<SlideRenderer> {
    Arc::new(SlideRenderer::with_fontdb(Arc::new(
        usvg::fontdb::Database::new(),
    )))
}

fn poll_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_secs(10), Duration::from_secs(1)).unwrap()
}

struct Setup {
    compositor: Compositor,
    log: Arc<Mutex<EncoderLog>>,
}

fn local_strategies(slides: &Arc<SlideRenderer>) -> AdapterStrategies {
    let mut strategies = AdapterStrategies::new();
    strategies
        .register(Arc::new(SlideCardAdapter::new(slides.clone())))
        .register(Arc::new(ScreenshotAdapter::new()));
    strategies
}

fn with_remote(
    strategies: &mut AdapterStrategies,
    images: Arc<ScriptedService>,
    videos: Arc<ScriptedService>,
) {
    strategies
        .register(Arc::new(RemoteImageAdapter::new(RemoteJobPoller::new(
            images,
            poll_policy(),
        ))))
        .register(Arc::new(RemoteVideoAdapter::new(
            RemoteJobPoller::new(videos, poll_policy()),
            Arc::new(FixedProbe(4.0)),
        )));
}

fn setup(strategies: AdapterStrategies, slides: Arc<SlideRenderer>, encoder: RecordingEncoder) -> Setup {
    let log = encoder.log.clone();
    let settings = CompositorSettings {
        spec: spec(),
        max_concurrent_assets: 4,
        ..CompositorSettings::default()
    };
    let compositor = Compositor::new(
        settings,
        strategies,
        slides,
        Arc::new(encoder),
        Arc::new(SolidClips),
    )
    .unwrap();
    Setup { compositor, log }
}

fn request(title: &str, candidates: Vec<AssetRequest>, output: PathBuf) -> RenderRequest {
    RenderRequest {
        title: title.to_string(),
        script: format!("{}.", title),
        candidates,
        output_path: output,
    }
}

fn partial_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.file_name().to_string_lossy().starts_with(".partial-"))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn test_all_adapters_succeed() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let mut strategies = local_strategies(&slides);
    let images = ScriptedService::new(JobScript::Complete, png_bytes());
    let videos = ScriptedService::new(JobScript::Complete, vec![0; 32]);
    with_remote(&mut strategies, images.clone(), videos.clone());
    let Setup { compositor, log } = setup(strategies, slides, RecordingEncoder::default());

    let shot = write_screenshot(dir.path(), "shot.png");
    let output = dir.path().join("lesson.mp4");
    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 20.0).unwrap();
    let scope = RenderScope::new(Some(dir.path()), CancellationToken::new()).unwrap();
    let req = request(
        "Rust ownership",
        vec![
            AssetRequest::screenshot(&shot),
            AssetRequest::remote_image("borrow checker diagram"),
            AssetRequest::remote_video("memory animation"),
        ],
        output.clone(),
    );

    let artifact = compositor.render(&req, &audio, &scope).await.unwrap();

    let rendered: Vec<AssetKind> = artifact.segments.iter().map(|s| s.rendered).collect();
    assert_eq!(
        rendered,
        vec![
            AssetKind::Slide,
            AssetKind::Screenshot,
            AssetKind::RemoteImage,
            AssetKind::RemoteVideo
        ]
    );
    assert_eq!(artifact.substitutions(), 0);
    assert!((artifact.duration - 20.0).abs() <= ONE_FRAME);
    assert_eq!(artifact.frame_count, 480);
    assert_eq!(images.polls.load(Ordering::SeqCst), 1);
    assert_eq!(videos.polls.load(Ordering::SeqCst), 1);

    let log = log.lock().unwrap();
    assert_eq!(log.frames, 480);
    assert!(log.finished);
    assert!(output.is_file());
    assert_eq!(partial_files(dir.path()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_remote_assets_become_slides() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let mut strategies = local_strategies(&slides);
    let images = ScriptedService::new(JobScript::NeverComplete, Vec::new());
    let videos = ScriptedService::new(JobScript::Reject, Vec::new());
    with_remote(&mut strategies, images.clone(), videos.clone());
    let Setup { compositor, log } = setup(strategies, slides, RecordingEncoder::default());

    let output = dir.path().join("lesson.mp4");
    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 15.5).unwrap();
    let scope = RenderScope::new(Some(dir.path()), CancellationToken::new()).unwrap();
    let req = request(
        "HTTP caching",
        vec![
            AssetRequest::remote_image("cache headers"),
            AssetRequest::remote_video("cdn flow"),
        ],
        output.clone(),
    );

    let artifact = compositor.render(&req, &audio, &scope).await.unwrap();

    assert_eq!(artifact.substitutions(), 2);
    assert!(artifact.segments[1..]
        .iter()
        .all(|s| s.rendered == AssetKind::Slide && !s.failures.is_empty()));
    assert!(artifact.segments[1].failures[0].contains("timed out after 10 polls"));
    assert!(artifact.segments[2].failures[0].contains("rejected"));
    assert_eq!(images.polls.load(Ordering::SeqCst), 10);
    assert_eq!(videos.polls.load(Ordering::SeqCst), 0);
    assert!((artifact.duration - 15.5).abs() <= ONE_FRAME);
    assert_eq!(log.lock().unwrap().frames, 372);
    assert!(output.is_file());
}

#[tokio::test]
async fn test_zero_screenshots_uses_single_fallback() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let Setup { compositor, log } =
        setup(local_strategies(&slides), slides, RecordingEncoder::default());

    let output = dir.path().join("nested/out/lesson.mp4");
    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 7.3).unwrap();
    let scope = RenderScope::new(Some(dir.path()), CancellationToken::new()).unwrap();
    let artifact = compositor
        .render(&request("Queues", Vec::new(), output.clone()), &audio, &scope)
        .await
        .unwrap();

    let roles: Vec<EntryRole> = artifact.segments.iter().map(|s| s.role).collect();
    assert_eq!(roles, vec![EntryRole::Title, EntryRole::Fallback]);
    assert!((artifact.segments[1].allocated_duration - 4.3).abs() < 1e-9);
    assert!((artifact.duration - 7.3).abs() <= ONE_FRAME);
    assert_eq!(log.lock().unwrap().frames, 175);
    assert!(output.is_file());
}

#[tokio::test(start_paused = true)]
async fn test_intro_to_apis_end_to_end() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let mut strategies = local_strategies(&slides);
    let images = ScriptedService::new(JobScript::Complete, png_bytes());
    let videos = ScriptedService::new(JobScript::Complete, vec![0; 8]);
    with_remote(&mut strategies, images.clone(), videos.clone());
    let Setup { compositor, log } = setup(strategies, slides, RecordingEncoder::default());

    let shots = vec![
        AssetRequest::screenshot(write_screenshot(dir.path(), "1.png")),
        AssetRequest::screenshot(write_screenshot(dir.path(), "2.png")),
    ];
    let output = dir.path().join("intro.mp4");
    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 30.0).unwrap();
    let scope = RenderScope::new(Some(dir.path()), CancellationToken::new()).unwrap();

    let artifact = compositor
        .render(&request("Intro to APIs", shots, output.clone()), &audio, &scope)
        .await
        .unwrap();

    let planned: Vec<(AssetKind, f64)> = artifact
        .segments
        .iter()
        .map(|s| (s.requested, s.allocated_duration))
        .collect();
    assert_eq!(
        planned,
        vec![
            (AssetKind::Slide, 3.0),
            (AssetKind::Screenshot, 13.5),
            (AssetKind::Screenshot, 13.5)
        ]
    );
    assert_eq!(images.submits.load(Ordering::SeqCst), 0);
    assert_eq!(videos.submits.load(Ordering::SeqCst), 0);
    assert!(artifact.duration >= 30.0 - ONE_FRAME && artifact.duration <= 30.0 + ONE_FRAME);
    assert_eq!(log.lock().unwrap().frames, 720);
}

#[tokio::test]
async fn test_tiny_narration_still_yields_one_frame() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let Setup { compositor, log } =
        setup(local_strategies(&slides), slides, RecordingEncoder::default());

    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 0.01).unwrap();
    let scope = RenderScope::new(Some(dir.path()), CancellationToken::new()).unwrap();
    let artifact = compositor
        .render(&request("Hi", Vec::new(), dir.path().join("hi.mp4")), &audio, &scope)
        .await
        .unwrap();

    assert_eq!(artifact.frame_count, 1);
    assert_eq!(log.lock().unwrap().frames, 1);
}

#[tokio::test]
async fn test_cancel_during_encode_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let cancel = CancellationToken::new();
    let encoder = RecordingEncoder {
        cancel_after: Some((10, cancel.clone())),
        ..RecordingEncoder::default()
    };
    let Setup { compositor, log } = setup(local_strategies(&slides), slides, encoder);

    let output = dir.path().join("cancelled.mp4");
    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 12.0).unwrap();
    let scope = RenderScope::new(Some(dir.path()), cancel).unwrap();
    let work_dir = scope.work_dir().to_path_buf();

    let err = compositor
        .render(&request("Queues", Vec::new(), output.clone()), &audio, &scope)
        .await
        .unwrap_err();
    assert!(matches!(err, CompositorError::Cancelled));
    assert!(log.lock().unwrap().aborted);
    assert!(!output.exists());
    assert_eq!(partial_files(dir.path()), 0);

    drop(scope);
    assert!(!work_dir.exists());
}

#[tokio::test]
async fn test_cancel_before_render_skips_encoding() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let Setup { compositor, log } =
        setup(local_strategies(&slides), slides, RecordingEncoder::default());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let output = dir.path().join("never.mp4");
    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 5.0).unwrap();
    let scope = RenderScope::new(Some(dir.path()), cancel).unwrap();

    let err = compositor
        .render(&request("Queues", Vec::new(), output.clone()), &audio, &scope)
        .await
        .unwrap_err();
    assert!(matches!(err, CompositorError::Cancelled));
    assert_eq!(log.lock().unwrap().frames, 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_encoder_failure_is_fatal_with_cause() {
    let dir = TempDir::new().unwrap();
    let slides = slides();
    let encoder = RecordingEncoder {
        fail_open: true,
        ..RecordingEncoder::default()
    };
    let Setup { compositor, .. } = setup(local_strategies(&slides), slides, encoder);

    let output = dir.path().join("broken.mp4");
    let audio = AudioTrack::new(dir.path().join("voice.mp3"), 5.0).unwrap();
    let scope = RenderScope::new(Some(dir.path()), CancellationToken::new()).unwrap();

    let err = compositor
        .render(&request("Queues", Vec::new(), output.clone()), &audio, &scope)
        .await
        .unwrap_err();
    match err {
        CompositorError::MuxEncode { source } => {
            assert!(source.to_string().contains("libx264"));
        }
        other => panic!("expected mux failure, got {:?}", other),
    }
    assert!(!output.exists());
    assert_eq!(partial_files(dir.path()), 0);
}
