use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReelError, ReelResult};
use crate::title::DEFAULT_TITLE_TEMPLATE;
use crate::Color;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FontConfig {
    /// TrueType font to render with. `None` uses the embedded monospace font.
    pub path: Option<PathBuf>,
    /// Extra spacing between wrapped lines, as a fraction of the font size.
    pub multiline_spacing: f32,
    /// Pixel budget used when wrapping titles, lines and explanations.
    pub max_text_width: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            multiline_spacing: 0.25,
            max_text_width: 1080 - 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CursorConfig {
    pub glyph: char,
    pub blink_hz: f64,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            glyph: '█',
            blink_hz: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlitchConfig {
    pub enabled: bool,
    /// Re-rolls of the trailing glitch character per second.
    pub rate_hz: f64,
    /// Width budget reserved on the canvas for the glitch tail.
    pub max_affected_chars: usize,
    pub alphabet: String,
    pub seed: u64,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_hz: 3.0,
            max_affected_chars: 5,
            alphabet: "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".to_string(),
            seed: 0x5EED,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TitleConfig {
    pub template: String,
    pub font_size: f32,
    pub stroke_width: u32,
    pub typing_cps: f64,
    pub y: i32,
    pub delay_s: f64,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TITLE_TEMPLATE.to_string(),
            font_size: 75.0,
            stroke_width: 2,
            typing_cps: 3.0,
            y: 250,
            delay_s: 0.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub font_size: f32,
    pub stroke_width: u32,
    pub typing_cps: f64,
    pub line_start_y: i32,
    pub min_line_gap: i32,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            font_size: 70.0,
            stroke_width: 2,
            typing_cps: 3.0,
            line_start_y: 700,
            min_line_gap: 40,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplanationConfig {
    pub font_size: f32,
    pub stroke_width: u32,
    pub typing_cps: f64,
    pub y: i32,
    /// Pause between the end of the countdown and the explanation typing.
    pub reveal_delay_s: f64,
    pub hold_s: f64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            font_size: 65.0,
            stroke_width: 2,
            typing_cps: 30.0,
            y: 300,
            reveal_delay_s: 0.5,
            hold_s: 1.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CountdownConfig {
    pub seconds: u32,
    pub font_size: f32,
    pub y: i32,
    pub pre_pause_s: f64,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            seconds: 5,
            font_size: 180.0,
            y: 1920 - 500,
            pre_pause_s: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SignoffLine {
    pub text: String,
    pub y: i32,
}

impl SignoffLine {
    pub fn new(text: impl Into<String>, y: i32) -> Self {
        Self {
            text: text.into(),
            y,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignoffConfig {
    pub font_size: f32,
    pub typing_cps: f64,
    pub gap_s: f64,
    pub hold_s: f64,
    pub lines: Vec<SignoffLine>,
}

impl Default for SignoffConfig {
    fn default() -> Self {
        Self {
            font_size: 70.0,
            typing_cps: 30.0,
            gap_s: 0.2,
            hold_s: 1.5,
            lines: vec![
                SignoffLine::new("WERE YOU SUCCESSFUL?", 400),
                SignoffLine::new("LIKE TO CONFIRM", 500),
                SignoffLine::new("SUBSCRIBE FOR", 1050),
                SignoffLine::new("FURTHER TESTING", 1150),
            ],
        }
    }
}

/// A palette declared in the style file, colors as hex strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaletteSpec {
    pub name: Option<String>,
    pub foreground: String,
    pub background: String,
}

impl PaletteSpec {
    pub fn colors(&self) -> ReelResult<(Color, Color)> {
        let parse = |hex: &str| {
            Color::from_hex(hex)
                .map_err(|e| ReelError::Config(format!("palette color {:?}: {}", hex, e)))
        };
        Ok((parse(&self.foreground)?, parse(&self.background)?))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub jobs_dir: PathBuf,
    pub assets_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            jobs_dir: PathBuf::from("jobs"),
            assets_dir: PathBuf::from("assets"),
        }
    }
}

/// Every recognised rendering option with its default.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StyleConfig {
    pub output: OutputConfig,
    pub font: FontConfig,
    pub cursor: CursorConfig,
    pub glitch: GlitchConfig,
    pub title: TitleConfig,
    pub puzzle: PuzzleConfig,
    pub explanation: ExplanationConfig,
    pub countdown: CountdownConfig,
    pub signoff: SignoffConfig,
    pub default_palette: String,
    pub palettes: BTreeMap<String, PaletteSpec>,
    pub paths: PathsConfig,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            font: FontConfig::default(),
            cursor: CursorConfig::default(),
            glitch: GlitchConfig::default(),
            title: TitleConfig::default(),
            puzzle: PuzzleConfig::default(),
            explanation: ExplanationConfig::default(),
            countdown: CountdownConfig::default(),
            signoff: SignoffConfig::default(),
            default_palette: "ghost".to_string(),
            palettes: BTreeMap::new(),
            paths: PathsConfig::default(),
        }
    }
}

impl StyleConfig {
    pub fn load_from_file(path: &Path) -> ReelResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| ReelError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("loaded style config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> ReelResult<Self> {
        let config: StyleConfig =
            toml::from_str(contents).map_err(|e| ReelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> ReelResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ReelError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the timeline math cannot work with.
    pub fn validate(&self) -> ReelResult<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ReelError::Config(format!("{} must be positive, got {}", name, v)))
            }
        };
        let non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ReelError::Config(format!("{} must not be negative, got {}", name, v)))
            }
        };

        if self.output.width == 0 || self.output.height == 0 {
            return Err(ReelError::Config("output size must be non-zero".into()));
        }
        positive("output.fps", self.output.fps)?;
        positive("cursor.blink_hz", self.cursor.blink_hz)?;
        if self.glitch.enabled {
            positive("glitch.rate_hz", self.glitch.rate_hz)?;
        }
        positive("title.typing_cps", self.title.typing_cps)?;
        positive("puzzle.typing_cps", self.puzzle.typing_cps)?;
        positive("explanation.typing_cps", self.explanation.typing_cps)?;
        positive("signoff.typing_cps", self.signoff.typing_cps)?;
        for (name, size) in [
            ("title.font_size", self.title.font_size),
            ("puzzle.font_size", self.puzzle.font_size),
            ("explanation.font_size", self.explanation.font_size),
            ("countdown.font_size", self.countdown.font_size),
            ("signoff.font_size", self.signoff.font_size),
        ] {
            positive(name, size as f64)?;
        }
        non_negative("title.delay_s", self.title.delay_s)?;
        non_negative("explanation.reveal_delay_s", self.explanation.reveal_delay_s)?;
        non_negative("explanation.hold_s", self.explanation.hold_s)?;
        non_negative("countdown.pre_pause_s", self.countdown.pre_pause_s)?;
        non_negative("signoff.gap_s", self.signoff.gap_s)?;
        non_negative("signoff.hold_s", self.signoff.hold_s)?;
        non_negative("font.multiline_spacing", self.font.multiline_spacing as f64)?;

        for (name, spec) in &self.palettes {
            spec.colors()
                .map_err(|e| ReelError::Config(format!("palette {}: {}", name, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StyleConfig::default();
        config.validate().unwrap();
        assert_eq!(config.output.width, 1080);
        assert_eq!(config.font.max_text_width, 980);
        assert_eq!(config.countdown.y, 1420);
        assert_eq!(config.signoff.lines.len(), 4);
        assert_eq!(config.cursor.glyph, '█');
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StyleConfig::from_toml_str(
            r##"
            default_palette = "amber"

            [countdown]
            seconds = 3

            [palettes.mint]
            foreground = "#AAFFCC"
            background = "#001100"
            "##,
        )
        .unwrap();
        assert_eq!(config.default_palette, "amber");
        assert_eq!(config.countdown.seconds, 3);
        assert_eq!(config.countdown.font_size, 180.0);
        assert_eq!(config.puzzle.typing_cps, 3.0);
        assert!(config.palettes.contains_key("mint"));
    }

    #[test]
    fn test_signoff_script_from_toml() {
        let config = StyleConfig::from_toml_str(
            r#"
            [signoff]
            lines = [{ text = "THANKS", y = 900 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.signoff.lines, vec![SignoffLine::new("THANKS", 900)]);
        assert_eq!(config.signoff.hold_s, 1.5);
    }

    #[test]
    fn test_rejects_zero_speed() {
        let err = StyleConfig::from_toml_str("[puzzle]\ntyping_cps = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("puzzle.typing_cps"));
    }

    #[test]
    fn test_rejects_bad_palette_hex() {
        let err = StyleConfig::from_toml_str(
            "[palettes.bad]\nforeground = \"#XYZ\"\nbackground = \"#000000\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("palette bad"));
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("reelgen_style_{}.toml", std::process::id()));
        let mut config = StyleConfig::default();
        config.glitch.enabled = false;
        config.save_to_file(&path).unwrap();
        let loaded = StyleConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(!loaded.glitch.enabled);
        assert_eq!(loaded.signoff.lines, config.signoff.lines);
    }
}
