//! Named visual themes: one foreground (text) and one background color.

use crate::config::StyleConfig;
use crate::Color;

/// A resolved `{foreground, background}` color pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    /// Lookup key, e.g. `ms_dos`.
    pub key: String,
    /// Human-readable name, e.g. `MS-DOS`.
    pub name: String,
    pub foreground: Color,
    pub background: Color,
}

/// Palette used when neither the requested nor the configured default exists.
pub const FALLBACK_PALETTE: &str = "ghost";

const BUILTIN: &[(&str, &str, [u8; 3], [u8; 3])] = &[
    ("ghost", "Ghost", [0, 255, 160], [0, 0, 0]),
    ("amber", "Amber", [255, 197, 51], [21, 13, 0]),
    ("ms_dos", "MS-DOS", [220, 220, 220], [0, 0, 0]),
    ("ice", "Ice", [193, 231, 255], [12, 20, 36]),
    ("cyberpunk", "Cyberpunk", [138, 43, 226], [15, 0, 15]),
    ("ultraviolet", "Ultraviolet", [90, 218, 255], [2, 7, 18]),
];

impl Palette {
    /// Look up one of the built-in themes.
    pub fn builtin(key: &str) -> Option<Palette> {
        BUILTIN
            .iter()
            .find(|(k, ..)| *k == key)
            .map(|(k, name, fg, bg)| Palette {
                key: k.to_string(),
                name: name.to_string(),
                foreground: Color::rgb8(fg[0], fg[1], fg[2]),
                background: Color::rgb8(bg[0], bg[1], bg[2]),
            })
    }

    /// Keys of every built-in theme.
    pub fn builtin_keys() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(k, ..)| *k)
    }

    /// Look up `key` among the configured palettes, then the built-ins.
    pub fn lookup(key: &str, config: &StyleConfig) -> Option<Palette> {
        if let Some(spec) = config.palettes.get(key) {
            match spec.colors() {
                Ok((foreground, background)) => {
                    return Some(Palette {
                        key: key.to_string(),
                        name: spec.name.clone().unwrap_or_else(|| key.to_string()),
                        foreground,
                        background,
                    })
                }
                Err(e) => tracing::warn!("ignoring palette {}: {}", key, e),
            }
        }
        Self::builtin(key)
    }

    /// Resolve the palette for a job: the requested name if known, else the
    /// configured default, else [`FALLBACK_PALETTE`].
    pub fn resolve(requested: Option<&str>, config: &StyleConfig) -> Palette {
        if let Some(name) = requested {
            if let Some(palette) = Self::lookup(name, config) {
                return palette;
            }
            tracing::warn!(
                "unknown palette {:?}; using default {:?}",
                name,
                config.default_palette
            );
        }
        Self::lookup(&config.default_palette, config).unwrap_or_else(|| {
            Self::builtin(FALLBACK_PALETTE).unwrap_or(Palette {
                key: FALLBACK_PALETTE.to_string(),
                name: "Ghost".to_string(),
                foreground: Color::rgb8(0, 255, 160),
                background: Color::BLACK,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaletteSpec;

    #[test]
    fn test_builtin_lookup() {
        let amber = Palette::builtin("amber").unwrap();
        assert_eq!(amber.name, "Amber");
        assert_eq!(amber.foreground.to_rgba8(), [255, 197, 51, 255]);
        assert_eq!(amber.background.to_rgba8(), [21, 13, 0, 255]);
        assert_eq!(Palette::builtin_keys().count(), 6);
    }

    #[test]
    fn test_resolve_unknown_uses_default() {
        let mut config = StyleConfig::default();
        config.default_palette = "ice".into();
        assert_eq!(Palette::resolve(Some("sepia"), &config).key, "ice");
        assert_eq!(Palette::resolve(None, &config).key, "ice");
    }

    #[test]
    fn test_resolve_bad_default_uses_ghost() {
        let mut config = StyleConfig::default();
        config.default_palette = "nope".into();
        let palette = Palette::resolve(Some("also-nope"), &config);
        assert_eq!(palette.key, "ghost");
        assert_eq!(palette.foreground.to_rgba8(), [0, 255, 160, 255]);
    }

    #[test]
    fn test_configured_palette_overrides_builtin() {
        let mut config = StyleConfig::default();
        config.palettes.insert(
            "amber".into(),
            PaletteSpec {
                name: Some("Dim Amber".into()),
                foreground: "#806020".into(),
                background: "#000000".into(),
            },
        );
        let palette = Palette::resolve(Some("amber"), &config);
        assert_eq!(palette.name, "Dim Amber");
        assert_eq!(palette.foreground.to_rgba8(), [0x80, 0x60, 0x20, 255]);
    }
}
