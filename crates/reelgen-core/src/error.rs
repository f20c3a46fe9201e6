/// Core error types for the reelgen engine.
use std::path::PathBuf;

/// A specialized Result type for reelgen operations.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error type encompassing all reelgen subsystems.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("font error: {message} ({path:?})")]
    Font { message: String, path: PathBuf },

    #[error("render error: {0}")]
    Render(String),

    #[error("scene error: {0}")]
    Scene(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReelError {
    /// Create a font error.
    pub fn font(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ReelError::Font {
            message: message.into(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_error_display() {
        let err = ReelError::font("file not found", "/assets/DejaVuSansMono.ttf");
        assert!(err.to_string().contains("file not found"));
        assert!(err.to_string().contains("DejaVuSansMono.ttf"));
    }

    #[test]
    fn test_scene_error_display() {
        let err = ReelError::Scene("title typing layer could not be created".into());
        assert_eq!(
            err.to_string(),
            "scene error: title typing layer could not be created"
        );
    }
}
