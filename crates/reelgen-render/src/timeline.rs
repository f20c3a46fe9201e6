//! Layers on a shared clock.
//!
//! Draw order is insertion order and is never re-sorted by start time: a
//! layer appended later paints above every earlier one, even if it starts
//! first.

use std::borrow::Cow;

use reelgen_core::RasterImage;

use crate::typing::TypingAnimation;

/// Horizontal placement of a layer on the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    /// Left edge at a fixed pixel offset.
    Fixed(i32),
    /// Centered on the frame.
    Centered,
}

/// Screen anchor: horizontal mode plus the top edge in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: HorizontalAnchor,
    pub y: i32,
}

impl Position {
    pub fn centered(y: i32) -> Self {
        Self {
            x: HorizontalAnchor::Centered,
            y,
        }
    }

    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x: HorizontalAnchor::Fixed(x),
            y,
        }
    }

    /// Top-left pixel for an image `image_width` wide on a frame
    /// `frame_width` wide.
    pub fn resolve(&self, frame_width: u32, image_width: u32) -> (i32, i32) {
        let x = match self.x {
            HorizontalAnchor::Fixed(x) => x,
            HorizontalAnchor::Centered => (frame_width as i32 - image_width as i32) / 2,
        };
        (x, self.y)
    }
}

/// What a layer draws.
#[derive(Debug)]
pub enum LayerSource {
    /// A static raster (hold frames, countdown digits).
    Still(RasterImage),
    /// A typed text animation.
    Typing(Box<TypingAnimation>),
}

/// A time-bounded, anchored source of frame content.
#[derive(Debug)]
pub struct Layer {
    pub label: String,
    pub start: f64,
    pub duration: f64,
    pub position: Position,
    pub source: LayerSource,
}

impl Layer {
    /// Negative durations are clamped to zero.
    pub fn new(
        label: impl Into<String>,
        start: f64,
        duration: f64,
        position: Position,
        source: LayerSource,
    ) -> Self {
        Self {
            label: label.into(),
            start,
            duration: duration.max(0.0),
            position,
            source,
        }
    }

    pub fn still(
        label: impl Into<String>,
        image: RasterImage,
        start: f64,
        duration: f64,
        position: Position,
    ) -> Self {
        Self::new(label, start, duration, position, LayerSource::Still(image))
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Active on `[start, start + duration)`; zero-length layers never are.
    pub fn is_active(&self, t: f64) -> bool {
        self.duration > 0.0 && t >= self.start && t < self.end()
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.source, LayerSource::Typing(_))
    }

    /// Pixel size of every frame this layer produces.
    pub fn footprint(&self) -> (u32, u32) {
        match &self.source {
            LayerSource::Still(image) => image.size(),
            LayerSource::Typing(anim) => anim.canvas_size(),
        }
    }

    /// Content at layer-local time `local_t`.
    pub fn frame_at(&mut self, local_t: f64) -> Cow<'_, RasterImage> {
        match &mut self.source {
            LayerSource::Still(image) => Cow::Borrowed(image),
            LayerSource::Typing(anim) => Cow::Owned(anim.frame_at(local_t)),
        }
    }

    /// Advance any time-dependent state to `local_t` without drawing.
    pub fn advance(&mut self, local_t: f64) {
        if let LayerSource::Typing(anim) = &mut self.source {
            anim.advance(local_t);
        }
    }
}

/// Ordered layers sharing one clock.
#[derive(Debug, Default)]
pub struct Timeline {
    layers: Vec<Layer>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer on top of everything already present. Returns its index.
    pub fn append(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    /// Append a static raster padded into `canvas_size` at `anchor`, so its
    /// footprint matches the animated layer it follows.
    #[allow(clippy::too_many_arguments)]
    pub fn append_hold(
        &mut self,
        label: impl Into<String>,
        raster: &RasterImage,
        canvas_size: (u32, u32),
        anchor: (i32, i32),
        start: f64,
        duration: f64,
        position: Position,
    ) -> usize {
        let padded = raster.padded(canvas_size, anchor);
        self.append(Layer::still(label, padded, start, duration, position))
    }

    /// Append every layer of `other`, shifted by `offset` seconds, above the
    /// existing layers.
    pub fn append_shifted(&mut self, other: Timeline, offset: f64) {
        self.layers.extend(other.layers.into_iter().map(|mut layer| {
            layer.start += offset;
            layer
        }));
    }

    /// Latest end time over all layers; 0 when empty.
    pub fn total_duration(&self) -> f64 {
        self.layers.iter().map(Layer::end).fold(0.0, f64::max)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// First layer with the given label.
    pub fn find(&self, label: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.label == label)
    }

    /// Labels of the layers active at `t`, bottom to top.
    pub fn active_labels(&self, t: f64) -> Vec<&str> {
        self.layers
            .iter()
            .filter(|l| l.is_active(t))
            .map(|l| l.label.as_str())
            .collect()
    }
}

/// Sequencing helper: each element starts `gap` seconds after the previous
/// one ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chain {
    next_start: f64,
    gap: f64,
}

impl Chain {
    pub fn new(start: f64, gap: f64) -> Self {
        Self {
            next_start: start,
            gap,
        }
    }

    /// Start time for the next element.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    /// Record that an element ended at `end`; returns the following start.
    pub fn advance(&mut self, end: f64) -> f64 {
        self.next_start = end + self.gap;
        self.next_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_core::Color;

    fn still(label: &str, start: f64, duration: f64) -> Layer {
        Layer::still(
            label,
            RasterImage::solid(2, 2, &Color::WHITE),
            start,
            duration,
            Position::at(0, 0),
        )
    }

    #[test]
    fn test_empty_timeline_has_zero_duration() {
        assert_eq!(Timeline::new().total_duration(), 0.0);
    }

    #[test]
    fn test_total_duration_is_max_end() {
        let mut timeline = Timeline::new();
        timeline.append(still("a", 0.0, 5.0));
        timeline.append(still("b", 1.0, 1.0));
        assert!((timeline.total_duration() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_active_interval_is_half_open() {
        let layer = still("a", 1.0, 2.0);
        assert!(!layer.is_active(0.999));
        assert!(layer.is_active(1.0));
        assert!(layer.is_active(2.999));
        assert!(!layer.is_active(3.0));
    }

    #[test]
    fn test_zero_and_negative_durations_never_active() {
        assert!(!still("z", 1.0, 0.0).is_active(1.0));
        let negative = still("n", 1.0, -4.0);
        assert_eq!(negative.duration, 0.0);
        assert!(!negative.is_active(1.0));
    }

    #[test]
    fn test_insertion_order_is_draw_order() {
        let mut timeline = Timeline::new();
        timeline.append(still("backdrop", 2.0, 5.0));
        timeline.append(still("early-but-on-top", 0.0, 10.0));
        assert_eq!(timeline.active_labels(3.0), vec!["backdrop", "early-but-on-top"]);
    }

    #[test]
    fn test_append_does_not_touch_earlier_layers() {
        let mut timeline = Timeline::new();
        timeline.append(still("a", 0.5, 1.0));
        timeline.append(still("b", 0.0, 3.0));
        let a = timeline.find("a").unwrap();
        assert_eq!((a.start, a.duration), (0.5, 1.0));
    }

    #[test]
    fn test_append_hold_pads_to_canvas() {
        let mut timeline = Timeline::new();
        let raster = RasterImage::solid(2, 2, &Color::WHITE);
        let idx = timeline.append_hold("h", &raster, (10, 4), (4, 1), 1.0, 2.0, Position::centered(50));
        let layer = &timeline.layers()[idx];
        assert_eq!(layer.footprint(), (10, 4));
        assert!(!layer.is_animated());
    }

    #[test]
    fn test_chain_spacing() {
        let mut chain = Chain::new(0.0, 0.2);
        let mut timeline = Timeline::new();
        for (i, duration) in [1.0, 0.5, 2.0].into_iter().enumerate() {
            let idx = timeline.append(still(&format!("l{}", i), chain.next_start(), duration));
            chain.advance(timeline.layers()[idx].end());
        }
        let layers = timeline.layers();
        for pair in layers.windows(2) {
            assert!((pair[1].start - (pair[0].end() + 0.2)).abs() < 1e-12);
            assert!(pair[1].end() > pair[0].end());
        }
    }

    #[test]
    fn test_append_shifted() {
        let mut first = Timeline::new();
        first.append(still("a", 0.0, 4.0));
        let mut second = Timeline::new();
        second.append(still("b", 0.5, 1.0));
        first.append_shifted(second, 4.0);
        assert!((first.find("b").unwrap().start - 4.5).abs() < 1e-12);
        assert!((first.total_duration() - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_position_resolve() {
        assert_eq!(Position::centered(10).resolve(1080, 80), (500, 10));
        assert_eq!(Position::at(-5, 7).resolve(1080, 80), (-5, 7));
    }
}
