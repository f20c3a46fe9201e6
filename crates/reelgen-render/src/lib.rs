//! # reelgen-render
//!
//! The reelgen rendering engine. Builds layered timelines of typed text for
//! the puzzle and sign-off scenes and samples them into raw RGBA frames.
//! CPU-only and single-threaded; frames are produced on demand for an
//! external encoder.

pub mod compositor;
pub mod scene;
pub mod text;
pub mod timeline;
pub mod typing;

pub use compositor::{Compositor, FrameStream};
pub use scene::{PuzzleContent, PuzzleMarks, PuzzleScene, Scene, SceneBuilder};
pub use text::{default_font, load_font, TextRasterizer, TextStyle};
pub use timeline::{Chain, HorizontalAnchor, Layer, LayerSource, Position, Timeline};
pub use typing::{TypingAnimation, TypingBuilder, TypingEffects, TypingRequest, TypingResult};
