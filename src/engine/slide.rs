//! Title and fallback slide cards
//!
//! Layout is pure: text is greedily wrapped to a fixed column count, each line
//! is centered horizontally and the block is centered vertically. The layout
//! is emitted as SVG and rasterized with resvg, so identical input always
//! yields identical pixels. Rendered cards are cached per (text, format).

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, OnceLock};

use image::{ImageFormat, RgbImage};
use tracing::{debug, warn};

use crate::domain::model::{FrameSpec, StillFrame};

/// Characters per wrapped line
pub const WRAP_COLUMNS: usize = 40;
/// Metrics at 720 lines of output; scaled with the frame height
pub const FONT_SIZE_720: f64 = 60.0;
pub const LINE_HEIGHT_720: f64 = 80.0;
pub const BACKGROUND: [u8; 3] = [30, 30, 30];
pub const FOREGROUND: [u8; 3] = [255, 255, 255];

/// Positioned line of slide text
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutLine {
    pub text: String,
    /// Horizontal center of the line
    pub center_x: f64,
    /// Top of the line box
    pub top: f64,
}

/// Greedy word wrap; words longer than `width` are split
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let current_len = current.chars().count();
        let needed = if current.is_empty() {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Position wrapped lines on a frame of `spec` size
pub fn layout_text(text: &str, spec: &FrameSpec) -> Vec<LaidOutLine> {
    let line_height = LINE_HEIGHT_720 * spec.height as f64 / 720.0;
    let lines = wrap_text(text, WRAP_COLUMNS);
    let block_height = lines.len() as f64 * line_height;
    let first_top = (spec.height as f64 - block_height) / 2.0;
    let center_x = spec.width as f64 / 2.0;

    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| LaidOutLine {
            text,
            center_x,
            top: first_top + i as f64 * line_height,
        })
        .collect()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn rgb(color: [u8; 3]) -> String {
    format!("rgb({},{},{})", color[0], color[1], color[2])
}

/// SVG document for a slide
pub fn slide_svg(text: &str, spec: &FrameSpec) -> String {
    let font_size = FONT_SIZE_720 * spec.height as f64 / 720.0;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="{w}" height="{h}" fill="{bg}"/>"#,
        w = spec.width,
        h = spec.height,
        bg = rgb(BACKGROUND),
    );
    for line in layout_text(text, spec) {
        // SVG positions text by baseline; PIL-style layout positions by top
        let baseline = line.top + font_size;
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" font-family="DejaVu Sans, Arial, sans-serif" font-size="{size:.2}" fill="{fg}" text-anchor="middle">{text}</text>"#,
            x = line.center_x,
            y = baseline,
            size = font_size,
            fg = rgb(FOREGROUND),
            text = escape_xml(&line.text),
        ));
    }
    svg.push_str("</svg>");
    svg
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlideKey {
    text: String,
    width: u32,
    height: u32,
}

/// Rasterizes slides and caches them per key
pub struct SlideRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
    cache: Mutex<HashMap<SlideKey, Arc<OnceLock<StillFrame>>>>,
}

impl SlideRenderer {
    /// Renderer using the system font set
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "Loaded slide fonts");
        Self::with_fontdb(Arc::new(db))
    }

    pub fn with_fontdb(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self {
            fontdb,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Render `text` as a slide. Never fails.
    pub fn render(&self, text: &str, spec: FrameSpec) -> StillFrame {
        let key = SlideKey {
            text: text.to_string(),
            width: spec.width,
            height: spec.height,
        };
        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.entry(key).or_default().clone()
        };
        cell.get_or_init(|| self.rasterize(text, spec)).clone()
    }

    /// Render `text` as PNG bytes
    pub fn render_png(&self, text: &str, spec: FrameSpec) -> Result<Vec<u8>, image::ImageError> {
        let still = self.render(text, spec);
        let mut bytes = Cursor::new(Vec::new());
        still.image().write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    pub fn cached_slides(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn rasterize(&self, text: &str, spec: FrameSpec) -> StillFrame {
        match self.rasterize_svg(text, spec) {
            Some(image) => StillFrame::new(image, spec)
                .unwrap_or_else(|_| StillFrame::solid(spec, BACKGROUND)),
            None => {
                warn!("Slide rasterization failed, using plain background");
                StillFrame::solid(spec, BACKGROUND)
            }
        }
    }

    fn rasterize_svg(&self, text: &str, spec: FrameSpec) -> Option<RgbImage> {
        let svg = slide_svg(text, &spec);
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = match usvg::Tree::from_str(&svg, &opts) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(error = %e, "Failed to parse slide svg");
                return None;
            }
        };

        let mut pixmap = resvg::tiny_skia::Pixmap::new(spec.width, spec.height)?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );

        // Background is opaque, so premultiplied RGBA is plain RGBA here
        let rgb: Vec<u8> = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        RgbImage::from_raw(spec.width, spec.height, rgb)
    }
}

impl Default for SlideRenderer {
    fn default() -> Self {
        Self::new()
    }
}
