//! Frame composition and the sampled frame stream.
//!
//! Typing layers carry glitch state that only advances forward, so a
//! timeline must be sampled at increasing `t` in a single pass.
//! [`FrameStream`] owns the timeline to enforce that; seeking forward goes
//! through [`FrameStream::skip_to`], which advances layer state without
//! drawing.

use reelgen_core::hash::{ContentHash, StreamHasher};
use reelgen_core::{Color, FrameClock, Palette, RasterImage, StyleConfig};

use crate::scene::Scene;
use crate::timeline::Timeline;

/// Paints active layers over an opaque background.
#[derive(Debug, Clone, PartialEq)]
pub struct Compositor {
    pub width: u32,
    pub height: u32,
    pub background: Color,
}

impl Compositor {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
        }
    }

    pub fn from_config(config: &StyleConfig, palette: &Palette) -> Self {
        Self::new(config.output.width, config.output.height, palette.background)
    }

    /// Render the frame at `t`: background first, then every layer active at
    /// `t` in insertion order, blended source-over at its anchor.
    pub fn render_frame(&self, timeline: &mut Timeline, t: f64) -> RasterImage {
        let mut frame = RasterImage::solid(self.width, self.height, &self.background);
        for layer in timeline.layers_mut() {
            if !layer.is_active(t) {
                continue;
            }
            let local_t = t - layer.start;
            let position = layer.position;
            let content = layer.frame_at(local_t);
            let (x, y) = position.resolve(self.width, content.width);
            frame.composite_over(&content, x, y);
        }
        frame
    }

    /// Advance layer state to `t` without drawing.
    fn advance(&self, timeline: &mut Timeline, t: f64) {
        for layer in timeline.layers_mut() {
            if layer.is_active(t) {
                let local_t = t - layer.start;
                layer.advance(local_t);
            }
        }
    }
}

/// Single-pass iterator over the frames of a timeline, sampled at `i / fps`.
#[derive(Debug)]
pub struct FrameStream {
    compositor: Compositor,
    timeline: Timeline,
    clock: FrameClock,
    next: u64,
    total: u64,
}

impl FrameStream {
    pub fn new(compositor: Compositor, timeline: Timeline, clock: FrameClock) -> Self {
        let total = clock.frame_count(timeline.total_duration());
        tracing::debug!(
            "frame stream: {} frames at {} fps ({} layers)",
            total,
            clock.fps(),
            timeline.len()
        );
        Self {
            compositor,
            timeline,
            clock,
            next: 0,
            total,
        }
    }

    /// Stream a scene; frame count follows the scene's duration rather than
    /// the latest layer end.
    pub fn from_scene(compositor: Compositor, scene: Scene, clock: FrameClock) -> Self {
        let mut stream = Self::new(compositor, scene.timeline, clock);
        stream.total = clock.frame_count(scene.duration);
        stream
    }

    pub fn width(&self) -> u32 {
        self.compositor.width
    }

    pub fn height(&self) -> u32 {
        self.compositor.height
    }

    pub fn fps(&self) -> f64 {
        self.clock.fps()
    }

    /// Total number of frames in the stream.
    pub fn frame_count(&self) -> u64 {
        self.total
    }

    /// Index of the next frame to be yielded.
    pub fn position(&self) -> u64 {
        self.next
    }

    /// Move forward to frame `index`, advancing every layer through the
    /// skipped frames so the result matches a full pass. Backward seeks are
    /// ignored.
    pub fn skip_to(&mut self, index: u64) {
        let target = index.min(self.total);
        while self.next < target {
            let t = self.clock.time_of(self.next);
            self.compositor.advance(&mut self.timeline, t);
            self.next += 1;
        }
    }

    /// Render the frame shown at `seconds`, consuming the stream.
    pub fn still_at(mut self, seconds: f64) -> Option<RasterImage> {
        self.skip_to(self.clock.frame_at(seconds));
        self.next()
    }

    /// Drain the stream into a SHA-256 fingerprint of every frame.
    pub fn content_hash(self) -> ContentHash {
        let mut hasher = StreamHasher::new();
        for frame in self {
            hasher.update(&frame);
        }
        hasher.finish()
    }
}

impl Iterator for FrameStream {
    type Item = RasterImage;

    fn next(&mut self) -> Option<RasterImage> {
        if self.next >= self.total {
            return None;
        }
        let t = self.clock.time_of(self.next);
        self.next += 1;
        Some(self.compositor.render_frame(&mut self.timeline, t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameStream {}
