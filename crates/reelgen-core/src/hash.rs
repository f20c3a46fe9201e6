//! Content hashing for deterministic rendering verification.
//!
//! Produces a SHA-256 digest of raster data so two renders of the same job
//! can be compared bit-for-bit.

use sha2::{Digest, Sha256};

use crate::frame::RasterImage;

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental hasher over a frame stream, so frames never need to be
/// collected in memory just to be fingerprinted.
#[derive(Default, Clone)]
pub struct StreamHasher {
    hasher: Sha256,
    frames: u64,
}

impl std::fmt::Debug for StreamHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHasher")
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl StreamHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame. Dimensions are included so differently-sized
    /// frames with identical bytes hash differently.
    pub fn update(&mut self, frame: &RasterImage) {
        self.hasher.update(frame.width.to_le_bytes());
        self.hasher.update(frame.height.to_le_bytes());
        self.hasher.update(&frame.data);
        self.frames += 1;
    }

    /// Number of frames hashed so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn finish(self) -> ContentHash {
        let mut hasher = self.hasher;
        hasher.update(self.frames.to_le_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        ContentHash { bytes }
    }
}

/// Compute the content hash of a single raster.
pub fn hash_frame(frame: &RasterImage) -> ContentHash {
    let mut hasher = StreamHasher::new();
    hasher.update(frame);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_same_content_same_hash() {
        let a = RasterImage::solid(4, 4, &Color::WHITE);
        let b = RasterImage::solid(4, 4, &Color::WHITE);
        assert_eq!(hash_frame(&a), hash_frame(&b));
    }

    #[test]
    fn test_dimensions_affect_hash() {
        let a = RasterImage::new(2, 8);
        let b = RasterImage::new(8, 2);
        assert_ne!(hash_frame(&a), hash_frame(&b));
    }

    #[test]
    fn test_stream_hash_counts_frames() {
        let frame = RasterImage::new(2, 2);
        let mut one = StreamHasher::new();
        one.update(&frame);
        let mut two = StreamHasher::new();
        two.update(&frame);
        two.update(&frame);
        assert_eq!(two.frame_count(), 2);
        assert_ne!(one.finish(), two.finish());
    }

    #[test]
    fn test_hex_length() {
        assert_eq!(hash_frame(&RasterImage::new(1, 1)).to_hex().len(), 64);
    }
}
