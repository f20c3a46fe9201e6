//! Puzzle and sign-off scene assembly.
//!
//! The puzzle scene draws, bottom to top: title typing, line typing,
//! countdown digits, explanation typing and hold, title hold, line holds.
//! Non-anomaly lines stay up until the reveal; the anomaly line stays until
//! the end of the scene.

use std::sync::Arc;

use reelgen_core::{Palette, RasterImage, ReelError, ReelResult, StyleConfig};

use crate::text::{TextRasterizer, TextStyle};
use crate::timeline::{Chain, Layer, Position, Timeline};
use crate::typing::{TypingBuilder, TypingEffects, TypingRequest, TypingResult};

/// A self-contained stage of the video.
#[derive(Debug)]
pub struct Scene {
    pub name: String,
    pub timeline: Timeline,
    pub duration: f64,
}

impl Scene {
    pub fn new(name: impl Into<String>, timeline: Timeline, duration: f64) -> Self {
        Self {
            name: name.into(),
            timeline,
            duration: duration.max(0.0),
        }
    }

    /// Play `next` after this scene: its layers are shifted by this scene's
    /// duration and drawn above this scene's layers.
    pub fn then(mut self, next: Scene) -> Scene {
        let offset = self.duration;
        self.timeline.append_shifted(next.timeline, offset);
        Scene {
            name: format!("{}+{}", self.name, next.name),
            timeline: self.timeline,
            duration: offset + next.duration,
        }
    }
}

/// Puzzle text for one video.
#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleContent {
    pub title: String,
    pub lines: Vec<String>,
    pub anomaly_index: usize,
    pub explanation: String,
}

impl PuzzleContent {
    /// Locate `anomaly_text` among `lines`; falls back to the first line.
    pub fn new(
        title: impl Into<String>,
        lines: Vec<String>,
        anomaly_text: &str,
        explanation: impl Into<String>,
    ) -> Self {
        let anomaly_index = match lines.iter().position(|l| l == anomaly_text) {
            Some(idx) => idx,
            None => {
                tracing::warn!(
                    "anomaly line {:?} not among puzzle lines; defaulting to the first line",
                    anomaly_text
                );
                0
            }
        };
        Self {
            title: title.into(),
            lines,
            anomaly_index,
            explanation: explanation.into(),
        }
    }

    /// Use an explicit anomaly index; out-of-range indices fall back to 0.
    pub fn with_anomaly_index(
        title: impl Into<String>,
        lines: Vec<String>,
        anomaly_index: usize,
        explanation: impl Into<String>,
    ) -> Self {
        let anomaly_index = if anomaly_index < lines.len() {
            anomaly_index
        } else {
            tracing::warn!(
                "anomaly index {} out of range for {} lines; defaulting to the first line",
                anomaly_index,
                lines.len()
            );
            0
        };
        Self {
            title: title.into(),
            lines,
            anomaly_index,
            explanation: explanation.into(),
        }
    }
}

/// Key instants of a built puzzle scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleMarks {
    pub title_end: f64,
    /// Typing end of each line that produced a layer, in order.
    pub line_ends: Vec<f64>,
    pub countdown_start: f64,
    /// Countdown end: the anomaly is disclosed.
    pub reveal_time: f64,
    pub explanation_end: Option<f64>,
}

/// A built puzzle scene plus its timing marks.
#[derive(Debug)]
pub struct PuzzleScene {
    pub scene: Scene,
    pub marks: PuzzleMarks,
}

/// Layer label helpers shared by the builders and their callers.
pub mod labels {
    pub const TITLE: &str = "title";
    pub const TITLE_HOLD: &str = "title:hold";
    pub const EXPLANATION: &str = "explanation";
    pub const EXPLANATION_HOLD: &str = "explanation:hold";

    pub fn line(i: usize) -> String {
        format!("line[{}]", i)
    }

    pub fn line_hold(i: usize) -> String {
        format!("line[{}]:hold", i)
    }

    pub fn countdown(value: u32) -> String {
        format!("countdown[{}]", value)
    }

    pub fn signoff(i: usize) -> String {
        format!("signoff[{}]", i)
    }

    pub fn signoff_hold(i: usize) -> String {
        format!("signoff[{}]:hold", i)
    }
}

/// A typed puzzle line waiting for its hold layer.
struct LineHold {
    index: usize,
    typed_end: f64,
    held: RasterImage,
    canvas_size: (u32, u32),
    glyph_anchor: (i32, i32),
    position: Position,
    is_anomaly: bool,
}

/// Builds scenes for one job from the style config and palette.
#[derive(Debug)]
pub struct SceneBuilder<'a> {
    config: &'a StyleConfig,
    palette: &'a Palette,
    typing: TypingBuilder,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(config: &'a StyleConfig, palette: &'a Palette, rasterizer: Arc<TextRasterizer>) -> Self {
        let typing = TypingBuilder::new(rasterizer, TypingEffects::from_config(config));
        Self {
            config,
            palette,
            typing,
        }
    }

    fn rasterizer(&self) -> &TextRasterizer {
        self.typing.rasterizer()
    }

    fn style(&self, size: f32, stroke_width: u32) -> TextStyle {
        TextStyle::new(size, self.palette.foreground).with_stroke(stroke_width, None)
    }

    fn wrap(&self, text: &str, size: f32) -> String {
        self.rasterizer().wrap(text, size, self.config.font.max_text_width)
    }

    /// Title → lines → countdown → explanation, with holds.
    pub fn puzzle(&self, content: &PuzzleContent) -> ReelResult<PuzzleScene> {
        let cfg = self.config;
        let mut timeline = Timeline::new();

        let title_text = self.wrap(&content.title, cfg.title.font_size);
        let title_position = Position::centered(cfg.title.y);
        let title = self
            .typing
            .build(TypingRequest {
                label: labels::TITLE,
                text: &title_text,
                position: title_position,
                start: cfg.title.delay_s,
                style: self.style(cfg.title.font_size, cfg.title.stroke_width),
                speed_cps: cfg.title.typing_cps,
            })
            .ok_or_else(|| ReelError::Scene("title typing layer could not be created".into()))?;
        let title_end = title.end();
        let title_hold = title.hold_image();
        timeline.append(title.layer);

        // Lines type back to back, each below the previous one.
        let line_style = self.style(cfg.puzzle.font_size, cfg.puzzle.stroke_width);
        let mut chain = Chain::new(title_end, 0.0);
        let mut y = cfg.puzzle.line_start_y;
        let mut holds: Vec<LineHold> = Vec::new();

        for (i, line) in content.lines.iter().enumerate() {
            let text = self.wrap(line, cfg.puzzle.font_size);
            let label = labels::line(i);
            let position = Position::centered(y);
            let Some(typed) = self.typing.build(TypingRequest {
                label: &label,
                text: &text,
                position,
                start: chain.next_start(),
                style: line_style,
                speed_cps: cfg.puzzle.typing_cps,
            }) else {
                tracing::debug!("puzzle line {} is empty; skipping", i);
                continue;
            };
            let TypingResult {
                layer,
                held,
                canvas_size,
                glyph_anchor,
            } = typed;
            let typed_end = layer.end();
            chain.advance(typed_end);
            y += canvas_size.1 as i32 + cfg.puzzle.min_line_gap;
            timeline.append(layer);
            holds.push(LineHold {
                index: i,
                typed_end,
                held,
                canvas_size,
                glyph_anchor,
                position,
                is_anomaly: i == content.anomaly_index,
            });
        }

        let line_ends: Vec<f64> = holds.iter().map(|h| h.typed_end).collect();
        let last_line_end = line_ends.last().copied().unwrap_or(title_end);

        let countdown_start = last_line_end + cfg.countdown.pre_pause_s;
        let reveal_time = countdown_start + cfg.countdown.seconds as f64;

        let digit_style = TextStyle::new(cfg.countdown.font_size, self.palette.foreground);
        for (i, value) in (1..=cfg.countdown.seconds).rev().enumerate() {
            let digit = self.rasterizer().render(&value.to_string(), &digit_style);
            timeline.append(Layer::still(
                labels::countdown(value),
                digit,
                countdown_start + i as f64,
                1.0,
                Position::centered(cfg.countdown.y),
            ));
        }

        let explanation_text = self.wrap(&content.explanation.to_uppercase(), cfg.explanation.font_size);
        let explanation_position = Position::centered(cfg.explanation.y);
        let explanation = self.typing.build(TypingRequest {
            label: labels::EXPLANATION,
            text: &explanation_text,
            position: explanation_position,
            start: reveal_time + cfg.explanation.reveal_delay_s,
            style: self.style(cfg.explanation.font_size, cfg.explanation.stroke_width),
            speed_cps: cfg.explanation.typing_cps,
        });

        let mut total = reveal_time;
        let mut explanation_end = None;
        if let Some(typed) = explanation {
            let hold_start = typed.end();
            let hold = typed.hold_image();
            timeline.append(typed.layer);
            total = hold_start + cfg.explanation.hold_s;
            explanation_end = Some(hold_start);
            timeline.append(Layer::still(
                labels::EXPLANATION_HOLD,
                hold,
                hold_start,
                cfg.explanation.hold_s,
                explanation_position,
            ));
        }

        timeline.append(Layer::still(
            labels::TITLE_HOLD,
            title_hold,
            title_end,
            (reveal_time - title_end).max(0.0),
            title_position,
        ));

        for hold in &holds {
            let start = hold.typed_end;
            let hold_end = if hold.is_anomaly { total } else { reveal_time };
            timeline.append_hold(
                labels::line_hold(hold.index),
                &hold.held,
                hold.canvas_size,
                hold.glyph_anchor,
                start,
                hold_end - start,
                hold.position,
            );
        }

        tracing::info!(
            "puzzle scene: {} layers, reveal at {:.2}s, total {:.2}s",
            timeline.len(),
            reveal_time,
            total
        );

        Ok(PuzzleScene {
            scene: Scene::new("puzzle", timeline, total),
            marks: PuzzleMarks {
                title_end,
                line_ends,
                countdown_start,
                reveal_time,
                explanation_end,
            },
        })
    }

    /// Type the sign-off script line by line, holding every line until a
    /// shared tail point.
    pub fn signoff(&self) -> ReelResult<Scene> {
        let cfg = &self.config.signoff;
        let style = TextStyle::new(cfg.font_size, self.palette.foreground);
        let mut timeline = Timeline::new();
        let mut chain = Chain::new(0.0, cfg.gap_s);
        let mut typed_lines = Vec::new();

        for (i, line) in cfg.lines.iter().enumerate() {
            let label = labels::signoff(i);
            let position = Position::centered(line.y);
            let Some(typed) = self.typing.build(TypingRequest {
                label: &label,
                text: &line.text,
                position,
                start: chain.next_start(),
                style,
                speed_cps: cfg.typing_cps,
            }) else {
                continue;
            };
            let end = typed.end();
            chain.advance(end);
            let hold = typed.hold_image();
            timeline.append(typed.layer);
            typed_lines.push((i, end, hold, position));
        }

        let Some(&(_, last_end, ..)) = typed_lines.last() else {
            tracing::warn!("sign-off script produced no lines; sign-off scene is empty");
            return Ok(Scene::new("signoff", timeline, 0.0));
        };
        let tail = last_end + cfg.hold_s;

        for (i, end, hold, position) in typed_lines {
            timeline.append(Layer::still(
                labels::signoff_hold(i),
                hold,
                end,
                (tail - end).max(0.0),
                position,
            ));
        }

        tracing::info!("sign-off scene: {} layers, total {:.2}s", timeline.len(), tail);
        Ok(Scene::new("signoff", timeline, tail))
    }

    /// Puzzle scene followed by the sign-off scene.
    pub fn full(&self, content: &PuzzleContent) -> ReelResult<Scene> {
        let puzzle = self.puzzle(content)?;
        let signoff = self.signoff()?;
        Ok(puzzle.scene.then(signoff))
    }
}
