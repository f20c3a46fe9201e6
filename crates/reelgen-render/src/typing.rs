//! Typewriter-style text reveal with a blinking cursor and a glitch tail.
//!
//! A [`TypingAnimation`] is a stateful frame source: the glitch character is
//! re-rolled on its own cadence and remembered between samples, so a layer
//! must be sampled at strictly increasing times (see [`crate::compositor`]).

use std::sync::Arc;

use reelgen_core::{RasterImage, StyleConfig};

use crate::text::{TextRasterizer, TextStyle};
use crate::timeline::{Layer, LayerSource, Position};

/// Wide reference glyph used to reserve room for the glitch tail.
const GLITCH_PROBE_CHAR: char = 'M';

/// Glitch tail settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GlitchSettings {
    pub rate_hz: f64,
    pub max_affected_chars: usize,
    pub alphabet: Vec<char>,
    pub seed: u64,
}

/// Cursor, glitch and frame-rate settings shared by every typed text unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TypingEffects {
    pub cursor_glyph: char,
    pub cursor_blink_hz: f64,
    /// `None` disables the glitch tail.
    pub glitch: Option<GlitchSettings>,
    pub fps: f64,
}

impl TypingEffects {
    pub fn from_config(config: &StyleConfig) -> Self {
        let alphabet: Vec<char> = config.glitch.alphabet.chars().collect();
        let glitch = (config.glitch.enabled && !alphabet.is_empty()).then(|| GlitchSettings {
            rate_hz: config.glitch.rate_hz,
            max_affected_chars: config.glitch.max_affected_chars,
            alphabet,
            seed: config.glitch.seed,
        });
        Self {
            cursor_glyph: config.cursor.glyph,
            cursor_blink_hz: config.cursor.blink_hz,
            glitch,
            fps: config.output.fps,
        }
    }

    /// Canvas reserve for the glitch tail, in characters.
    fn glitch_reserve(&self) -> usize {
        self.glitch
            .as_ref()
            .filter(|g| !g.alphabet.is_empty())
            .map_or(0, |g| g.max_affected_chars.max(1))
    }

    /// Widest string any frame can show: every line followed by the glitch
    /// reserve and the cursor, since both may land on any line.
    fn canvas_probe(&self, text: &str) -> String {
        let reserve = self.glitch_reserve();
        let mut probe = String::with_capacity(text.len() + 8);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                probe.push('\n');
            }
            probe.push_str(line);
            probe.extend(std::iter::repeat(GLITCH_PROBE_CHAR).take(reserve));
            probe.push(self.cursor_glyph);
        }
        probe
    }
}

/// Glitch cadence memory: when the tail was last re-rolled and what it shows.
#[derive(Debug, Clone, PartialEq)]
pub struct GlitchState {
    pub last_roll: f64,
    pub current: Option<char>,
}

impl Default for GlitchState {
    fn default() -> Self {
        Self {
            last_roll: f64::NEG_INFINITY,
            current: None,
        }
    }
}

/// Small deterministic generator (Knuth MMIX LCG).
#[derive(Debug, Clone)]
struct Lcg(u64);

impl Lcg {
    fn next_index(&mut self, len: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) % len as u64) as usize
    }
}

#[derive(Debug, Clone)]
struct Glitch {
    alphabet: Vec<char>,
    period: f64,
    state: GlitchState,
    rng: Lcg,
}

impl Glitch {
    /// An empty alphabet has nothing to show; the tail is off.
    fn new(settings: &GlitchSettings, text: &str) -> Option<Self> {
        if settings.alphabet.is_empty() {
            return None;
        }
        Some(Self {
            alphabet: settings.alphabet.clone(),
            period: 1.0 / settings.rate_hz,
            state: GlitchState::default(),
            rng: Lcg(settings.seed ^ fnv1a(text)),
        })
    }

    /// Current tail character at `t`, re-rolling once per period. Earlier
    /// times than the last roll never re-roll.
    fn sample(&mut self, t: f64) -> Option<char> {
        if t - self.state.last_roll >= self.period {
            let idx = self.rng.next_index(self.alphabet.len());
            self.state.current = Some(self.alphabet[idx]);
            self.state.last_roll = t;
        }
        self.state.current
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

/// Number of characters excluding line breaks.
pub fn printable_len(text: &str) -> usize {
    text.chars().filter(|&c| c != '\n').count()
}

/// Frame source for one typed text unit.
pub struct TypingAnimation {
    rasterizer: Arc<TextRasterizer>,
    style: TextStyle,
    chars: Vec<char>,
    printable: usize,
    speed_cps: f64,
    duration: f64,
    canvas_size: (u32, u32),
    glyph_anchor: (i32, i32),
    cursor_glyph: char,
    cursor_period: f64,
    glitch: Option<Glitch>,
    frame_duration: f64,
}

impl std::fmt::Debug for TypingAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingAnimation")
            .field("text", &self.chars.iter().collect::<String>())
            .field("speed_cps", &self.speed_cps)
            .field("duration", &self.duration)
            .field("canvas_size", &self.canvas_size)
            .finish_non_exhaustive()
    }
}

impl TypingAnimation {
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    pub fn glitch_state(&self) -> Option<&GlitchState> {
        self.glitch.as_ref().map(|g| &g.state)
    }

    /// Byte-free prefix length (in chars) covering `floor(t * speed)`
    /// printable characters; line breaks are free.
    fn revealed_prefix(&self, t: f64) -> usize {
        let target = ((t.max(0.0) * self.speed_cps + 1e-9).floor() as usize).min(self.printable);
        if target == 0 {
            return 0;
        }
        let mut seen = 0;
        for (i, &c) in self.chars.iter().enumerate() {
            if c != '\n' {
                seen += 1;
                if seen == target {
                    return i + 1;
                }
            }
        }
        self.chars.len()
    }

    fn cursor_visible(&self, t: f64) -> bool {
        t < self.duration && t.rem_euclid(self.cursor_period) < self.cursor_period / 2.0
    }

    /// The string shown at local time `t`: revealed text, then the glitch
    /// tail, then the cursor. Advances the glitch cadence.
    pub fn text_at(&mut self, t: f64) -> String {
        let prefix = self.revealed_prefix(t);
        let mut text: String = self.chars[..prefix].iter().collect();

        if t < self.duration - self.frame_duration {
            if let Some(c) = self.glitch.as_mut().and_then(|g| g.sample(t)) {
                text.push(c);
            }
        }

        if self.cursor_visible(t) {
            if self.chars.get(prefix) == Some(&'\n') {
                text.push('\n');
            }
            text.push(self.cursor_glyph);
        }
        text
    }

    /// Advance the glitch cadence to `t` without rasterizing.
    pub fn advance(&mut self, t: f64) {
        if t < self.duration - self.frame_duration {
            if let Some(glitch) = self.glitch.as_mut() {
                glitch.sample(t);
            }
        }
    }

    /// Render the frame at local time `t` onto a canvas of the stable size.
    pub fn frame_at(&mut self, t: f64) -> RasterImage {
        let text = self.text_at(t);
        let mut canvas = RasterImage::new(self.canvas_size.0, self.canvas_size.1);
        if !text.is_empty() {
            let raster = self.rasterizer.render(&text, &self.style);
            canvas.composite_over(&raster, self.glyph_anchor.0, self.glyph_anchor.1);
        }
        canvas
    }
}

/// Output of [`TypingBuilder::build`].
#[derive(Debug)]
pub struct TypingResult {
    /// The animated layer.
    pub layer: Layer,
    /// Fully revealed text: no cursor, no glitch.
    pub held: RasterImage,
    /// Footprint of every animated frame.
    pub canvas_size: (u32, u32),
    /// Where `held` sits inside a canvas of `canvas_size`.
    pub glyph_anchor: (i32, i32),
}

impl TypingResult {
    pub fn start(&self) -> f64 {
        self.layer.start
    }

    pub fn end(&self) -> f64 {
        self.layer.end()
    }

    /// `held` padded into the animation's canvas.
    pub fn hold_image(&self) -> RasterImage {
        self.held.padded(self.canvas_size, self.glyph_anchor)
    }
}

/// One text unit to type.
#[derive(Debug, Clone)]
pub struct TypingRequest<'a> {
    pub label: &'a str,
    pub text: &'a str,
    pub position: Position,
    pub start: f64,
    pub style: TextStyle,
    pub speed_cps: f64,
}

/// Builds typing layers that share a rasterizer and effect settings.
#[derive(Debug, Clone)]
pub struct TypingBuilder {
    rasterizer: Arc<TextRasterizer>,
    effects: TypingEffects,
}

impl TypingBuilder {
    pub fn new(rasterizer: Arc<TextRasterizer>, effects: TypingEffects) -> Self {
        Self {
            rasterizer,
            effects,
        }
    }

    pub fn rasterizer(&self) -> &Arc<TextRasterizer> {
        &self.rasterizer
    }

    /// Build the animated layer for `request`. Returns `None` for empty text.
    pub fn build(&self, request: TypingRequest<'_>) -> Option<TypingResult> {
        if request.text.is_empty() {
            return None;
        }

        let text = request.text;
        let style = request.style;
        let speed_cps = request.speed_cps.max(1e-6);

        let probe = self.effects.canvas_probe(text);
        let canvas_size = self.rasterizer.render(&probe, &style).size();

        // Frames grow rightwards from the anchor, so text stays flush left.
        let held = self.rasterizer.render(text, &style);
        let glyph_anchor = (0, (canvas_size.1 as i32 - held.height as i32) / 2);

        let chars: Vec<char> = text.chars().collect();
        let printable = printable_len(text);
        let duration = printable as f64 / speed_cps;

        let animation = TypingAnimation {
            rasterizer: self.rasterizer.clone(),
            style,
            chars,
            printable,
            speed_cps,
            duration,
            canvas_size,
            glyph_anchor,
            cursor_glyph: self.effects.cursor_glyph,
            cursor_period: 1.0 / self.effects.cursor_blink_hz,
            glitch: self.effects.glitch.as_ref().and_then(|g| Glitch::new(g, text)),
            frame_duration: 1.0 / self.effects.fps,
        };

        let layer = Layer::new(
            request.label,
            request.start,
            duration,
            request.position,
            LayerSource::Typing(Box::new(animation)),
        );

        tracing::debug!(
            "typing layer {} [{:.3}, {:.3}) {} chars @ {} cps",
            request.label,
            layer.start,
            layer.end(),
            printable,
            speed_cps
        );

        Some(TypingResult {
            layer,
            held,
            canvas_size,
            glyph_anchor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::default_font;
    use reelgen_core::Color;

    fn builder(glitch: bool) -> TypingBuilder {
        let mut config = StyleConfig::default();
        config.glitch.enabled = glitch;
        let rasterizer = Arc::new(TextRasterizer::new(default_font().unwrap(), 0.25));
        TypingBuilder::new(rasterizer, TypingEffects::from_config(&config))
    }

    fn request<'a>(text: &'a str, speed: f64) -> TypingRequest<'a> {
        TypingRequest {
            label: "test",
            text,
            position: Position::centered(100),
            start: 0.5,
            style: TextStyle::new(40.0, Color::WHITE),
            speed_cps: speed,
        }
    }

    fn animation(result: &mut TypingResult) -> &mut TypingAnimation {
        match &mut result.layer.source {
            LayerSource::Typing(anim) => anim,
            LayerSource::Still(_) => panic!("expected typing layer"),
        }
    }

    #[test]
    fn test_empty_text_builds_nothing() {
        assert!(builder(true).build(request("", 3.0)).is_none());
    }

    #[test]
    fn test_duration_excludes_line_breaks() {
        let result = builder(true).build(request("AB\nCD", 2.0)).unwrap();
        assert!((result.layer.duration - 2.0).abs() < 1e-12);
        assert!((result.start() - 0.5).abs() < 1e-12);
        assert!((result.end() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_reveal_counts_printable_chars() {
        let mut result = builder(false).build(request("AB\nCD", 2.0)).unwrap();
        let anim = animation(&mut result);
        // 1.5s at 2 cps = 3 printable chars; the line break is free.
        assert_eq!(anim.text_at(1.75).trim_end_matches('█'), "AB\nC");
        assert_eq!(anim.text_at(0.0), "█");
    }

    #[test]
    fn test_cursor_moves_to_next_line_at_break() {
        let mut result = builder(false).build(request("AB\nCD", 2.0)).unwrap();
        let anim = animation(&mut result);
        // t = 1.0: "AB" revealed, next char is a break, cursor phase on.
        assert_eq!(anim.text_at(1.0), "AB\n█");
    }

    #[test]
    fn test_cursor_blinks_at_half_duty() {
        let mut result = builder(false).build(request("ABCDEFGHIJ", 1.0)).unwrap();
        let anim = animation(&mut result);
        // 2 Hz blink: on for [0, 0.25), off for [0.25, 0.5).
        assert!(anim.text_at(0.1).ends_with('█'));
        assert!(!anim.text_at(0.3).ends_with('█'));
        assert!(anim.text_at(1.1).ends_with('█'));
        assert!(!anim.text_at(10.0).contains('█'));
    }

    #[test]
    fn test_single_glitch_char_held_between_rolls() {
        let mut result = builder(true).build(request("ABCDEFGHIJ", 1.0)).unwrap();
        let anim = animation(&mut result);
        // Off-phase of the cursor so the tail is the last char.
        let first = anim.text_at(0.26);
        assert_eq!(first.chars().count(), 1);
        let held = anim.text_at(0.3);
        assert_eq!(held, first, "glitch must not re-roll within its period");
        assert_eq!(anim.glitch_state().unwrap().last_roll, 0.26);
        let later = anim.text_at(0.76);
        assert_eq!(later.chars().count(), 1);
        assert_eq!(anim.glitch_state().unwrap().last_roll, 0.76);
    }

    #[test]
    fn test_glitch_stops_in_last_frame() {
        let mut result = builder(true).build(request("ABC", 1.0)).unwrap();
        let anim = animation(&mut result);
        // duration 3.0, last frame starts at 3.0 - 1/30; cursor off at 2.99 (phase 0.49).
        assert_eq!(anim.text_at(2.99), "AB");
        assert_eq!(anim.text_at(3.0), "ABC");
    }

    #[test]
    fn test_backwards_sample_does_not_reroll() {
        let mut result = builder(true).build(request("ABCDEFGHIJ", 1.0)).unwrap();
        let anim = animation(&mut result);
        anim.advance(2.0);
        let state = anim.glitch_state().unwrap().clone();
        anim.advance(1.0);
        assert_eq!(anim.glitch_state().unwrap(), &state);
    }

    #[test]
    fn test_same_text_same_glitch_sequence() {
        let b = builder(true);
        let mut a = b.build(request("DETERMINISM", 3.0)).unwrap();
        let mut c = b.build(request("DETERMINISM", 3.0)).unwrap();
        let times = [0.0, 0.4, 0.8, 1.2, 1.6, 2.0];
        let seq_a: Vec<String> = times.iter().map(|&t| animation(&mut a).text_at(t)).collect();
        let seq_c: Vec<String> = times.iter().map(|&t| animation(&mut c).text_at(t)).collect();
        assert_eq!(seq_a, seq_c);
    }

    #[test]
    fn test_frames_keep_stable_canvas() {
        let mut result = builder(true).build(request("A+B=C\nD", 3.0)).unwrap();
        let size = result.canvas_size;
        assert!(size.0 >= result.held.width && size.1 >= result.held.height);
        let anim = animation(&mut result);
        for i in 0..60 {
            let frame = anim.frame_at(i as f64 / 30.0);
            assert_eq!(frame.size(), size);
        }
    }

    #[test]
    fn test_every_frame_fits_canvas_when_first_line_is_longest() {
        let mut result = builder(true).build(request("ABCDEFGHIJ\nA", 1.0)).unwrap();
        let (canvas_w, canvas_h) = result.canvas_size;
        let (anchor_x, anchor_y) = result.glyph_anchor;
        let style = TextStyle::new(40.0, Color::WHITE);
        let rasterizer = TextRasterizer::new(default_font().unwrap(), 0.25);
        let anim = animation(&mut result);
        let frames = (anim.duration() * 30.0).ceil() as usize;
        for i in 0..=frames {
            let t = i as f64 / 30.0;
            let text = anim.text_at(t);
            if text.is_empty() {
                continue;
            }
            let width = rasterizer.measure(&text, style.size, style.stroke_width);
            let height = rasterizer.render(&text, &style).height;
            assert!(
                width as i32 + anchor_x <= canvas_w as i32,
                "t={:.3} {:?} is {}px wide, canvas {}px",
                t,
                text,
                width,
                canvas_w
            );
            assert!(height as i32 + anchor_y <= canvas_h as i32);
        }
    }

    #[test]
    fn test_empty_glitch_alphabet_disables_tail() {
        let mut config = StyleConfig::default();
        config.glitch.enabled = true;
        let mut effects = TypingEffects::from_config(&config);
        if let Some(glitch) = effects.glitch.as_mut() {
            glitch.alphabet.clear();
        }
        let rasterizer = Arc::new(TextRasterizer::new(default_font().unwrap(), 0.25));
        let mut result = TypingBuilder::new(rasterizer, effects)
            .build(request("ABCDEFGHIJ", 1.0))
            .unwrap();
        let anim = animation(&mut result);
        assert!(anim.glitch_state().is_none());
        // Cursor off-phase: only revealed text remains.
        assert_eq!(anim.text_at(2.3), "AB");
    }

    #[test]
    fn test_hold_image_matches_final_frame_without_effects() {
        let mut result = builder(true).build(request("XYZ", 3.0)).unwrap();
        let hold = result.hold_image();
        assert_eq!(hold.size(), result.canvas_size);
        let anim = animation(&mut result);
        // At t >= duration neither cursor nor glitch is drawn.
        assert_eq!(anim.frame_at(1.0), hold);
    }
}
