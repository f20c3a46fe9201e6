//! # reelgen-core
//!
//! Core types and primitives for the reelgen puzzle video engine.
//! This crate contains the foundational types shared by every reelgen crate:
//! colors, raster images, frame clocks, palettes, title templating, the style
//! configuration, and error types.

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod palette;
pub mod time;
pub mod title;

pub use config::*;

pub use color::Color;
pub use error::{ReelError, ReelResult};
pub use frame::RasterImage;
pub use palette::Palette;
pub use time::FrameClock;
