//! Pan/zoom effect over a still image
//!
//! Each frame is a pure function of (image, frame index, zoom ratio): at time
//! `t` the image is scaled by `1 + zoom_ratio * t` and the centered window of
//! the canonical size is kept. Frames are independent, so batches are rendered
//! in parallel with rayon.

use std::ops::Range;

use image::{imageops, imageops::FilterType, RgbImage};
use rayon::prelude::*;

use crate::domain::model::{FrameSpec, StillFrame};

/// Motion clip produced by pan/zoom over a still
#[derive(Debug, Clone)]
pub struct PanZoomClip {
    still: StillFrame,
    duration: f64,
    zoom_ratio: f64,
}

/// Build a pan/zoom clip.
///
/// Negative or non-finite ratios are treated as zero so the scaled image is
/// never smaller than the frame.
pub fn apply_pan_zoom(still: StillFrame, duration: f64, zoom_ratio: f64) -> PanZoomClip {
    let zoom_ratio = if zoom_ratio.is_finite() {
        zoom_ratio.max(0.0)
    } else {
        0.0
    };
    PanZoomClip {
        still,
        duration: duration.max(0.0),
        zoom_ratio,
    }
}

impl PanZoomClip {
    pub fn spec(&self) -> FrameSpec {
        self.still.spec()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn zoom_ratio(&self) -> f64 {
        self.zoom_ratio
    }

    pub fn frame_count(&self) -> u64 {
        self.spec().frames_for(self.duration)
    }

    /// Zoom factor at `t` seconds
    pub fn scale_at(&self, t: f64) -> f64 {
        1.0 + self.zoom_ratio * t.max(0.0)
    }

    /// Size of the scaled image at `t` seconds
    pub fn scaled_dimensions(&self, t: f64) -> (u32, u32) {
        let spec = self.spec();
        let scale = self.scale_at(t);
        (
            (spec.width as f64 * scale).ceil() as u32,
            (spec.height as f64 * scale).ceil() as u32,
        )
    }

    /// Render frame `index`, counted from the start of the clip
    pub fn frame(&self, index: u64) -> RgbImage {
        let spec = self.spec();
        let t = index as f64 / spec.fps as f64;
        let scale = self.scale_at(t);

        let source = self.still.image();
        if scale <= 1.0 {
            return source.clone();
        }

        debug_assert!({
            let (sw, sh) = self.scaled_dimensions(t);
            sw >= spec.width && sh >= spec.height
        });

        // Centered window of the source that maps onto the full frame
        let window_w = ((spec.width as f64 / scale).round() as u32).clamp(1, spec.width);
        let window_h = ((spec.height as f64 / scale).round() as u32).clamp(1, spec.height);
        let x = (spec.width - window_w) / 2;
        let y = (spec.height - window_h) / 2;

        let window = imageops::crop_imm(source, x, y, window_w, window_h).to_image();
        imageops::resize(&window, spec.width, spec.height, FilterType::Triangle)
    }

    /// Render a batch of frames in parallel, preserving order
    pub fn frames(&self, range: Range<u64>) -> Vec<RgbImage> {
        range
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|index| self.frame(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn spec() -> FrameSpec {
        FrameSpec::new(64, 36, 24).unwrap()
    }

    fn gradient() -> StillFrame {
        let spec = spec();
        let image = RgbImage::from_fn(spec.width, spec.height, |x, y| {
            Rgb([(x * 4) as u8, (y * 7) as u8, 128])
        });
        StillFrame::new(image, spec).unwrap()
    }

    #[test]
    fn test_scaled_size_never_below_original() {
        let clip = apply_pan_zoom(gradient(), 10.0, 0.04);
        let spec = clip.spec();
        for index in 0..clip.frame_count() {
            let t = index as f64 / spec.fps as f64;
            let (w, h) = clip.scaled_dimensions(t);
            assert!(w >= spec.width && h >= spec.height, "t = {}", t);
        }
    }

    #[test]
    fn test_negative_ratio_clamped_to_zero() {
        let clip = apply_pan_zoom(gradient(), 5.0, -0.5);
        assert_eq!(clip.zoom_ratio(), 0.0);
        assert_eq!(clip.scale_at(4.0), 1.0);
        assert_eq!(clip.frame(50), *gradient().image());
    }

    #[test]
    fn test_long_segment_keeps_zooming() {
        let clip = apply_pan_zoom(gradient(), 120.0, 0.04);
        assert!((clip.scale_at(100.0) - 5.0).abs() < 1e-9);
        assert!(clip.scale_at(110.0) > clip.scale_at(100.0));

        let spec = spec();
        let late = clip.frame(100 * spec.fps as u64);
        let later = clip.frame(110 * spec.fps as u64);
        assert_eq!(late.dimensions(), (spec.width, spec.height));
        assert_ne!(late, later);
    }

    #[test]
    fn test_first_frame_is_the_still() {
        let clip = apply_pan_zoom(gradient(), 3.0, 0.04);
        assert_eq!(clip.frame(0), *gradient().image());
    }

    #[test]
    fn test_frames_are_canonical_and_deterministic() {
        let clip = apply_pan_zoom(gradient(), 3.0, 0.05);
        assert_eq!(clip.frame_count(), 72);

        let batch = clip.frames(0..72);
        assert_eq!(batch.len(), 72);
        for frame in &batch {
            assert_eq!(frame.dimensions(), (64, 36));
        }
        assert_eq!(batch[40], clip.frame(40));
        assert_eq!(clip.frames(10..20), clip.frames(10..20));
    }
}
