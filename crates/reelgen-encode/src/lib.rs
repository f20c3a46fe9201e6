//! # reelgen-encode
//!
//! Encoding module: pipes raw RGBA frame streams into FFmpeg for H.264 MP4
//! output, and attaches a music track to a finished silent video.

pub mod ffmpeg;
pub mod mux;

pub use ffmpeg::FfmpegEncoder;
pub use mux::{default_muxed_path, mux_audio};
