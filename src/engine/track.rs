//! Visual track assembly and frame emission

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::model::{AssetKind, ClipFit, FrameSpec, VideoClip};
use crate::engine::effect::PanZoomClip;
use crate::error::EncodeError;
use crate::ports::{ClipDecodePort, FrameWriter};

/// Pan/zoom frames rendered per parallel batch
const FRAME_BATCH: u64 = 48;

/// Where a segment's frames come from
#[derive(Debug, Clone)]
pub enum FrameSource {
    PanZoom(PanZoomClip),
    Native { clip: VideoClip, fit: ClipFit },
    /// Repeat the last emitted frame
    Hold,
}

#[derive(Debug, Clone)]
pub struct TrackSegment {
    pub source: FrameSource,
    pub frames: u64,
    pub kind: Option<AssetKind>,
}

/// Padding or trimming applied to reach the target length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConformReport {
    pub padded_frames: u64,
    pub trimmed_frames: u64,
}

/// Concatenated segments in plan order
#[derive(Debug, Clone)]
pub struct VisualTrack {
    spec: FrameSpec,
    segments: Vec<TrackSegment>,
}

impl VisualTrack {
    pub fn new(spec: FrameSpec) -> Self {
        Self {
            spec,
            segments: Vec::new(),
        }
    }

    pub fn spec(&self) -> FrameSpec {
        self.spec
    }

    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// Append a segment; empty segments are skipped
    pub fn push(&mut self, source: FrameSource, frames: u64, kind: Option<AssetKind>) {
        if frames == 0 {
            return;
        }
        self.segments.push(TrackSegment {
            source,
            frames,
            kind,
        });
    }

    pub fn total_frames(&self) -> u64 {
        self.segments.iter().map(|s| s.frames).sum()
    }

    pub fn duration(&self) -> f64 {
        self.spec.seconds_for(self.total_frames())
    }

    /// Hold the last frame to pad, or cut from the end, to exactly `target` frames
    pub fn conform(&mut self, target: u64) -> ConformReport {
        let total = self.total_frames();
        let mut report = ConformReport::default();

        if total < target {
            report.padded_frames = target - total;
            self.push(FrameSource::Hold, report.padded_frames, None);
        } else if total > target {
            let mut excess = total - target;
            report.trimmed_frames = excess;
            while excess > 0 {
                let Some(last) = self.segments.last_mut() else {
                    break;
                };
                if last.frames > excess {
                    last.frames -= excess;
                    excess = 0;
                } else {
                    excess -= last.frames;
                    self.segments.pop();
                }
            }
        }

        debug!(
            total,
            target,
            padded = report.padded_frames,
            trimmed = report.trimmed_frames,
            "Conformed visual track"
        );
        report
    }
}

/// Emit every frame of `track` into `writer`.
///
/// Blocking; run it on a blocking thread. Returns the number of frames written.
pub fn render_track(
    track: &VisualTrack,
    decoder: &dyn ClipDecodePort,
    writer: &mut dyn FrameWriter,
    cancel: &CancellationToken,
) -> Result<u64, EncodeError> {
    let spec = track.spec();
    let mut emitter = Emitter {
        writer,
        cancel,
        last: None,
        written: 0,
        frame_bytes: spec.frame_bytes(),
    };

    for segment in track.segments() {
        match &segment.source {
            FrameSource::PanZoom(clip) => {
                let mut start = 0;
                while start < segment.frames {
                    emitter.check_cancel()?;
                    let end = (start + FRAME_BATCH).min(segment.frames);
                    for frame in clip.frames(start..end) {
                        emitter.emit(frame.into_raw())?;
                    }
                    start = end;
                }
            }
            FrameSource::Native { clip, fit } => {
                let mut stream = decoder.open(clip, *fit, spec, segment.frames)?;
                let mut produced = 0;
                while produced < segment.frames {
                    emitter.check_cancel()?;
                    match stream.next_frame()? {
                        Some(frame) => emitter.emit(frame)?,
                        None => break,
                    }
                    produced += 1;
                }
                if produced < segment.frames {
                    debug!(
                        clip = %clip.path.display(),
                        produced,
                        expected = segment.frames,
                        "Clip ended early, holding last frame"
                    );
                    emitter.hold(segment.frames - produced)?;
                }
            }
            FrameSource::Hold => emitter.hold(segment.frames)?,
        }
    }

    Ok(emitter.written)
}

struct Emitter<'a> {
    writer: &'a mut dyn FrameWriter,
    cancel: &'a CancellationToken,
    last: Option<Vec<u8>>,
    written: u64,
    frame_bytes: usize,
}

impl Emitter<'_> {
    fn check_cancel(&self) -> Result<(), EncodeError> {
        if self.cancel.is_cancelled() {
            return Err(EncodeError::Cancelled);
        }
        Ok(())
    }

    fn emit(&mut self, frame: Vec<u8>) -> Result<(), EncodeError> {
        if frame.len() != self.frame_bytes {
            return Err(EncodeError::FrameSize {
                expected: self.frame_bytes,
                actual: frame.len(),
            });
        }
        self.writer.write_frame(&frame)?;
        self.written += 1;
        self.last = Some(frame);
        Ok(())
    }

    fn hold(&mut self, frames: u64) -> Result<(), EncodeError> {
        let frame = self
            .last
            .take()
            .unwrap_or_else(|| vec![0u8; self.frame_bytes]);
        for _ in 0..frames {
            self.check_cancel()?;
            self.writer.write_frame(&frame)?;
            self.written += 1;
        }
        self.last = Some(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::StillFrame;
    use crate::engine::effect::apply_pan_zoom;
    use crate::ports::FrameStream;

    struct CountingWriter {
        frames: Vec<Vec<u8>>,
    }

    impl FrameWriter for CountingWriter {
        fn write_frame(&mut self, frame: &[u8]) -> Result<(), EncodeError> {
            self.frames.push(frame.to_vec());
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<(), EncodeError> {
            Ok(())
        }

        fn abort(self: Box<Self>) {}
    }

    /// Decoder whose clips yield `available` frames filled with 7
    struct ShortDecoder {
        available: u64,
    }

    struct ShortStream {
        remaining: u64,
        bytes: usize,
    }

    impl FrameStream for ShortStream {
        fn next_frame(&mut self) -> Result<Option<Vec<u8>>, EncodeError> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(vec![7u8; self.bytes]))
        }
    }

    impl ClipDecodePort for ShortDecoder {
        fn open(
            &self,
            _clip: &VideoClip,
            _fit: ClipFit,
            spec: FrameSpec,
            frames: u64,
        ) -> Result<Box<dyn FrameStream>, EncodeError> {
            Ok(Box::new(ShortStream {
                remaining: self.available.min(frames),
                bytes: spec.frame_bytes(),
            }))
        }
    }

    fn spec() -> FrameSpec {
        FrameSpec::new(16, 8, 24).unwrap()
    }

    fn pan_zoom(seconds: f64) -> FrameSource {
        let still = StillFrame::solid(spec(), [200, 10, 10]);
        FrameSource::PanZoom(apply_pan_zoom(still, seconds, 0.04))
    }

    #[test]
    fn test_conform_pads_and_trims() {
        let mut track = VisualTrack::new(spec());
        track.push(pan_zoom(1.0), 24, Some(AssetKind::Slide));
        track.push(pan_zoom(1.0), 24, Some(AssetKind::Screenshot));

        let report = track.conform(50);
        assert_eq!(report.padded_frames, 2);
        assert_eq!(track.total_frames(), 50);

        let report = track.conform(20);
        assert_eq!(report.trimmed_frames, 30);
        assert_eq!(track.total_frames(), 20);
        assert_eq!(track.segments().len(), 1);
    }

    #[test]
    fn test_push_skips_empty_segments() {
        let mut track = VisualTrack::new(spec());
        track.push(FrameSource::Hold, 0, None);
        assert!(track.segments().is_empty());
    }

    #[test]
    fn test_render_holds_after_short_clip() {
        let mut track = VisualTrack::new(spec());
        let clip = VideoClip::new("clip.mp4", 0.5).unwrap();
        track.push(
            FrameSource::Native {
                clip,
                fit: ClipFit::Loop { extra_loops: 1 },
            },
            30,
            Some(AssetKind::RemoteVideo),
        );

        let mut writer = CountingWriter { frames: Vec::new() };
        let written = render_track(
            &track,
            &ShortDecoder { available: 10 },
            &mut writer,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(written, 30);
        assert_eq!(writer.frames.len(), 30);
        assert!(writer.frames.iter().all(|f| f[0] == 7));
    }

    #[test]
    fn test_hold_without_previous_frame_is_black() {
        let mut track = VisualTrack::new(spec());
        track.conform(5);
        let mut writer = CountingWriter { frames: Vec::new() };
        render_track(
            &track,
            &ShortDecoder { available: 0 },
            &mut writer,
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(writer.frames.len(), 5);
        assert!(writer.frames[0].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_render_stops_when_cancelled() {
        let mut track = VisualTrack::new(spec());
        track.push(pan_zoom(2.0), 48, Some(AssetKind::Slide));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut writer = CountingWriter { frames: Vec::new() };
        let result = render_track(&track, &ShortDecoder { available: 0 }, &mut writer, &cancel);
        assert!(matches!(result, Err(EncodeError::Cancelled)));
        assert!(writer.frames.is_empty());
    }
}
