//! Text rendering module.
//! Uses fontdue for CPU-based font rasterization.
//!
//! Fonts are loaded once per path and cached for the life of the process;
//! fontdue fonts are size-independent, so a single handle serves every
//! font size the scenes ask for.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use fontdue::{Font, FontSettings, Metrics};
use reelgen_core::config::FontConfig;
use reelgen_core::{Color, RasterImage, ReelError, ReelResult};

/// Embedded monospace font so rendering works without any asset folder.
static EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

static DEFAULT_FONT: OnceLock<Arc<Font>> = OnceLock::new();
static FONT_CACHE: OnceLock<DashMap<PathBuf, Arc<Font>>> = OnceLock::new();

/// Get or initialize the embedded default font.
pub fn default_font() -> ReelResult<Arc<Font>> {
    if let Some(font) = DEFAULT_FONT.get() {
        return Ok(font.clone());
    }
    let font = Font::from_bytes(EMBEDDED_FONT, FontSettings::default())
        .map_err(|e| ReelError::font(format!("embedded font is invalid: {}", e), "<embedded>"))?;
    Ok(DEFAULT_FONT.get_or_init(|| Arc::new(font)).clone())
}

/// Load a font from a file path, reusing the process-wide cached handle.
pub fn load_font(path: &Path) -> ReelResult<Arc<Font>> {
    let cache = FONT_CACHE.get_or_init(DashMap::new);
    if let Some(font) = cache.get(path) {
        return Ok(font.clone());
    }

    let data = std::fs::read(path)
        .map_err(|e| ReelError::font(format!("failed to read font file: {}", e), path))?;
    let font = Font::from_bytes(data, FontSettings::default())
        .map_err(|e| ReelError::font(format!("failed to parse font: {}", e), path))?;
    tracing::info!("loaded font {}", path.display());

    let font = cache
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(font))
        .clone();
    Ok(font)
}

/// How a string is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Color,
    /// Outline thickness in pixels. 0 disables the outline.
    pub stroke_width: u32,
    /// Outline color; defaults to the fill color.
    pub stroke_color: Option<Color>,
}

impl TextStyle {
    pub fn new(size: f32, color: Color) -> Self {
        Self {
            size,
            color,
            stroke_width: 0,
            stroke_color: None,
        }
    }

    pub fn with_stroke(mut self, width: u32, color: Option<Color>) -> Self {
        self.stroke_width = width;
        self.stroke_color = color;
        self
    }
}

/// A rasterized glyph bitmap.
struct Glyph {
    metrics: Metrics,
    coverage: Vec<u8>,
}

/// Vertical metrics shared by every line at one font size.
#[derive(Debug, Clone, Copy)]
struct LineMetrics {
    ascent: i32,
    height: i32,
}

/// Measures, wraps and draws text into [`RasterImage`]s.
pub struct TextRasterizer {
    font: Arc<Font>,
    multiline_spacing: f32,
    glyphs: DashMap<(char, u32), Arc<Glyph>>,
}

impl std::fmt::Debug for TextRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRasterizer")
            .field("multiline_spacing", &self.multiline_spacing)
            .field("cached_glyphs", &self.glyphs.len())
            .finish_non_exhaustive()
    }
}

impl TextRasterizer {
    /// `multiline_spacing` is the extra gap between lines as a fraction of
    /// the font size.
    pub fn new(font: Arc<Font>, multiline_spacing: f32) -> Self {
        Self {
            font,
            multiline_spacing,
            glyphs: DashMap::new(),
        }
    }

    /// Build a rasterizer for the configured font, or the embedded one.
    pub fn from_config(config: &FontConfig) -> ReelResult<Self> {
        let font = match &config.path {
            Some(path) => load_font(path)?,
            None => default_font()?,
        };
        Ok(Self::new(font, config.multiline_spacing))
    }

    fn glyph(&self, ch: char, size: f32) -> Arc<Glyph> {
        let key = (ch, size.to_bits());
        if let Some(glyph) = self.glyphs.get(&key) {
            return glyph.clone();
        }
        let (metrics, coverage) = self.font.rasterize(ch, size);
        self.glyphs
            .entry(key)
            .or_insert_with(|| Arc::new(Glyph { metrics, coverage }))
            .clone()
    }

    fn line_metrics(&self, size: f32) -> LineMetrics {
        let (ascent, descent) = match self.font.horizontal_line_metrics(size) {
            Some(m) => (m.ascent, m.descent),
            None => (size * 0.8, -size * 0.2),
        };
        let ascent = ascent.ceil() as i32;
        let descent = (-descent).ceil() as i32;
        LineMetrics {
            ascent,
            height: (ascent + descent).max(1),
        }
    }

    fn line_spacing(&self, size: f32) -> i32 {
        (size * self.multiline_spacing) as i32
    }

    /// Width of a single line in pixels, without stroke.
    fn line_width(&self, line: &str, size: f32) -> i32 {
        let mut pen = 0.0f32;
        let mut right = 0i32;
        for ch in line.chars() {
            let metrics = self.font.metrics(ch, size);
            let ink_right = pen.round() as i32 + metrics.xmin + metrics.width as i32;
            right = right.max(ink_right);
            pen += metrics.advance_width;
        }
        right.max(pen.ceil() as i32)
    }

    /// Pixel width of the widest line of `text`, including the outline.
    pub fn measure(&self, text: &str, size: f32, stroke_width: u32) -> u32 {
        let widest = text
            .split('\n')
            .map(|line| self.line_width(line, size))
            .max()
            .unwrap_or(0);
        widest.max(0) as u32 + 2 * stroke_width
    }

    /// Insert line breaks so no line is wider than `max_width` pixels.
    ///
    /// A column count is estimated from the width of `a`, words are packed
    /// greedily into it, and any line still too wide is re-packed by
    /// measured width. A single word wider than the budget stays on its own
    /// line unbroken.
    pub fn wrap(&self, text: &str, size: f32, max_width: u32) -> String {
        if self.measure(text, size, 0) <= max_width {
            return text.to_string();
        }

        let avg = self.measure("a", size, 0) as f32;
        let avg = if avg > 0.0 { avg } else { size * 0.5 };
        let columns = ((max_width as f32 / avg.max(1.0)) as usize).max(1);

        let mut out: Vec<String> = Vec::new();
        for paragraph in text.split('\n') {
            for line in pack_words(paragraph, columns, |s| s.chars().count()) {
                if self.measure(&line, size, 0) > max_width && line.contains(' ') {
                    out.extend(pack_words(&line, max_width as usize, |s| {
                        self.measure(s, size, 0) as usize
                    }));
                } else {
                    out.push(line);
                }
            }
        }
        out.join("\n")
    }

    /// Draw `text` into a transparent raster sized to its bounding box.
    ///
    /// Glyphs sit flush to the top-left (inside the outline). Empty input
    /// yields a 1×1 transparent raster.
    pub fn render(&self, text: &str, style: &TextStyle) -> RasterImage {
        if text.is_empty() {
            return RasterImage::new(1, 1);
        }

        let size = style.size;
        let stroke = style.stroke_width as i32;
        let metrics = self.line_metrics(size);
        let spacing = self.line_spacing(size);
        let lines: Vec<&str> = text.split('\n').collect();

        let width = (self.measure(text, size, style.stroke_width)).max(1);
        let height = (lines.len() as i32 * metrics.height
            + (lines.len() as i32 - 1) * spacing
            + 2 * stroke)
            .max(1) as u32;

        let mut mask = vec![0u8; (width as usize) * (height as usize)];
        for (i, line) in lines.iter().enumerate() {
            let top = stroke + i as i32 * (metrics.height + spacing);
            self.draw_line_mask(&mut mask, width, height, line, size, stroke, top + metrics.ascent);
        }

        let fill = paint_mask(&mask, width, height, style.color);
        if stroke == 0 {
            return fill;
        }
        let outline = dilate(&mask, width, height, stroke);
        let mut out = paint_mask(&outline, width, height, style.stroke_color.unwrap_or(style.color));
        out.composite_over(&fill, 0, 0);
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_line_mask(
        &self,
        mask: &mut [u8],
        width: u32,
        height: u32,
        line: &str,
        size: f32,
        x_offset: i32,
        baseline: i32,
    ) {
        let mut pen = 0.0f32;
        for ch in line.chars() {
            let glyph = self.glyph(ch, size);
            let m = &glyph.metrics;
            let glyph_x = x_offset + pen.round() as i32 + m.xmin;
            let glyph_y = baseline - (m.height as i32 + m.ymin);

            for gy in 0..m.height {
                let py = glyph_y + gy as i32;
                if py < 0 || py >= height as i32 {
                    continue;
                }
                for gx in 0..m.width {
                    let px = glyph_x + gx as i32;
                    if px < 0 || px >= width as i32 {
                        continue;
                    }
                    let coverage = glyph.coverage[gy * m.width + gx];
                    let idx = py as usize * width as usize + px as usize;
                    mask[idx] = mask[idx].max(coverage);
                }
            }

            pen += m.advance_width;
        }
    }
}

/// Greedy word packing: words are joined with single spaces while
/// `measure(line) <= budget`. Over-long words get a line to themselves.
///
/// The paragraph's leading indent and inner runs of spaces are kept;
/// spaces at a break are dropped.
fn pack_words(paragraph: &str, budget: usize, measure: impl Fn(&str) -> usize) -> Vec<String> {
    let body = paragraph.trim_start_matches(' ');
    let mut words = body.split(' ');
    let mut current = paragraph[..paragraph.len() - body.len()].to_string();
    current.push_str(words.next().unwrap_or_default());

    let mut lines = Vec::new();
    for word in words {
        let candidate = format!("{} {}", current, word);
        if word.is_empty() || measure(&candidate) <= budget {
            current = candidate;
        } else {
            lines.push(current.trim_end_matches(' ').to_string());
            current = word.to_string();
        }
    }
    lines.push(current);
    lines
}

/// Turn a coverage mask into a colored raster.
fn paint_mask(mask: &[u8], width: u32, height: u32, color: Color) -> RasterImage {
    let [r, g, b, a] = color.to_rgba8();
    let mut out = RasterImage::new(width, height);
    for (pixel, &coverage) in out.data.chunks_exact_mut(4).zip(mask) {
        if coverage == 0 {
            continue;
        }
        let alpha = (coverage as u32 * a as u32 + 127) / 255;
        pixel.copy_from_slice(&[r, g, b, alpha as u8]);
    }
    out
}

/// Grow a coverage mask by `radius` pixels using a disc kernel.
fn dilate(mask: &[u8], width: u32, height: u32, radius: i32) -> Vec<u8> {
    let (w, h) = (width as i32, height as i32);
    let offsets: Vec<(i32, i32)> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= radius * radius)
        .collect();

    let mut out = mask.to_vec();
    for y in 0..h {
        for x in 0..w {
            let coverage = mask[(y * w + x) as usize];
            if coverage == 0 {
                continue;
            }
            for &(dx, dy) in &offsets {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w || ny >= h {
                    continue;
                }
                let idx = (ny * w + nx) as usize;
                out[idx] = out[idx].max(coverage);
            }
        }
    }
    out
}
