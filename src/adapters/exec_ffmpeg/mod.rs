//! FFmpeg execution adapter
//!
//! Drives the system `ffmpeg` binary: raw RGB24 frames are piped into an
//! H.264/AAC encoder that muxes the narration, and native clips are decoded
//! back to raw frames at the canonical format.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::domain::model::{ClipFit, FrameSpec, VideoClip};
use crate::error::EncodeError;
use crate::ports::{ClipDecodePort, EncodeJob, EncodePort, FrameStream, FrameWriter};

fn seconds_arg(seconds: f64) -> String {
    format!("{:.6}", seconds)
}

/// Arguments for muxing piped frames with the narration audio
pub fn encode_args(job: &EncodeJob) -> Vec<String> {
    let spec = job.spec;
    let mut args: Vec<String> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(spec.size_arg());
    args.extend(["-r".to_string(), spec.fps.to_string()]);
    args.extend(["-i".to_string(), "pipe:0".to_string()]);
    args.push("-i".to_string());
    args.push(job.audio.path().to_string_lossy().to_string());
    args.extend(
        [
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a",
            "aac", "-movflags", "+faststart", "-t",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(seconds_arg(spec.seconds_for(job.frame_count)));
    args.extend(["-f".to_string(), "mp4".to_string()]);
    args.push(job.output.to_string_lossy().to_string());
    args
}

/// Arguments for decoding a fitted clip to raw canonical frames
pub fn decode_args(clip: &VideoClip, fit: ClipFit, spec: FrameSpec, frames: u64) -> Vec<String> {
    let mut args = vec!["-loglevel".to_string(), "error".to_string()];
    if let ClipFit::Loop { extra_loops } = fit {
        args.extend(["-stream_loop".to_string(), extra_loops.to_string()]);
    }
    args.extend(["-i".to_string(), clip.path.to_string_lossy().to_string()]);
    if let ClipFit::Trim { keep } = fit {
        args.extend(["-t".to_string(), seconds_arg(keep)]);
    }
    args.extend([
        "-an".to_string(),
        "-vf".to_string(),
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},fps={fps}",
            w = spec.width,
            h = spec.height,
            fps = spec.fps
        ),
        "-frames:v".to_string(),
        frames.to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "pipe:1".to_string(),
    ]);
    args
}

/// Encoder backed by the `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl EncodePort for FfmpegEncoder {
    fn open(&self, job: &EncodeJob) -> Result<Box<dyn FrameWriter>, EncodeError> {
        job.spec
            .validate()
            .map_err(|e| EncodeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

        let args = encode_args(job);
        debug!(binary = %self.binary, ?args, "Spawning encoder");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(EncodeError::Launch)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            EncodeError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "ffmpeg stdin unavailable",
            ))
        })?;

        Ok(Box::new(FfmpegWriter {
            child,
            stdin: Some(stdin),
            frame_bytes: job.spec.frame_bytes(),
            output: job.output.display().to_string(),
        }))
    }
}

struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    frame_bytes: usize,
    output: String,
}

impl FfmpegWriter {
    /// Reap an encoder that closed its input and report why it stopped
    fn exited_early(&mut self) -> EncodeError {
        drop(self.stdin.take());
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            if let Err(e) = pipe.read_to_string(&mut stderr) {
                warn!(error = %e, "Failed to read encoder diagnostics");
            }
        }
        match self.child.wait() {
            Ok(status) => {
                warn!(output = %self.output, %status, "Encoder exited before all frames were written");
                EncodeError::Failed {
                    status: status.to_string(),
                    stderr: stderr.trim().to_string(),
                }
            }
            Err(e) => EncodeError::Io(e),
        }
    }
}

impl FrameWriter for FfmpegWriter {
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), EncodeError> {
        if frame.len() != self.frame_bytes {
            return Err(EncodeError::FrameSize {
                expected: self.frame_bytes,
                actual: frame.len(),
            });
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EncodeError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "encoder already finished",
            )));
        };
        match stdin.write_all(frame) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Err(self.exited_early()),
            Err(e) => Err(EncodeError::Io(e)),
        }
    }

    fn finish(mut self: Box<Self>) -> Result<(), EncodeError> {
        drop(self.stdin.take());
        let output = self.child.wait_with_output()?;
        if !output.status.success() {
            return Err(EncodeError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(output = %self.output, "Encoder finished");
        Ok(())
    }

    fn abort(mut self: Box<Self>) {
        drop(self.stdin.take());
        if let Err(e) = self.child.kill() {
            warn!(error = %e, "Failed to stop encoder");
        }
        let _ = self.child.wait();
    }
}

/// Clip decoder backed by the `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegClipDecoder {
    binary: String,
}

impl Default for FfmpegClipDecoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegClipDecoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ClipDecodePort for FfmpegClipDecoder {
    fn open(
        &self,
        clip: &VideoClip,
        fit: ClipFit,
        spec: FrameSpec,
        frames: u64,
    ) -> Result<Box<dyn FrameStream>, EncodeError> {
        if !Path::new(&clip.path).is_file() {
            return Err(EncodeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("clip not found: {}", clip.path.display()),
            )));
        }

        let args = decode_args(clip, fit, spec, frames);
        debug!(binary = %self.binary, ?args, "Spawning clip decoder");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(EncodeError::Launch)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            EncodeError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "ffmpeg stdout unavailable",
            ))
        })?;

        Ok(Box::new(FfmpegFrames {
            child,
            stdout,
            frame_bytes: spec.frame_bytes(),
            done: false,
        }))
    }
}

struct FfmpegFrames {
    child: Child,
    stdout: ChildStdout,
    frame_bytes: usize,
    done: bool,
}

impl FrameStream for FfmpegFrames {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, EncodeError> {
        if self.done {
            return Ok(None);
        }
        let mut frame = vec![0u8; self.frame_bytes];
        match self.stdout.read_exact(&mut frame) {
            Ok(()) => Ok(Some(frame)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.done = true;
                let _ = self.child.wait();
                Ok(None)
            }
            Err(e) => Err(EncodeError::Io(e)),
        }
    }
}

impl Drop for FfmpegFrames {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
