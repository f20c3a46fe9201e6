use serde::{Deserialize, Serialize};

/// Fixed-rate sampling clock shared by scene builders and the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameClock {
    /// Frames per second.
    fps: f64,
}

impl FrameClock {
    /// Create a clock. Non-positive or non-finite rates fall back to 30 fps.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self { fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Duration of a single frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.fps
    }

    /// Number of frames needed to cover `seconds` (sampled at `i / fps`).
    pub fn frame_count(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        // Guard against 3.0000000004 * 30 rounding up to an extra frame.
        let raw = seconds * self.fps;
        let rounded = raw.round();
        if (raw - rounded).abs() < 1e-6 {
            rounded as u64
        } else {
            raw.ceil() as u64
        }
    }

    /// Sample time of frame `index`.
    pub fn time_of(&self, index: u64) -> f64 {
        index as f64 / self.fps
    }

    /// Index of the frame displayed at `seconds`.
    pub fn frame_at(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.fps + 1e-9).floor() as u64
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let clock = FrameClock::new(30.0);
        assert_eq!(clock.frame_count(1.0), 30);
        assert_eq!(clock.frame_count(0.0), 0);
        assert_eq!(clock.frame_count(1.01), 31);
        assert_eq!(clock.frame_count(0.1 + 0.2), 9);
    }

    #[test]
    fn test_time_of_and_frame_at() {
        let clock = FrameClock::new(30.0);
        assert!((clock.time_of(45) - 1.5).abs() < 1e-12);
        assert_eq!(clock.frame_at(1.5), 45);
        assert_eq!(clock.frame_at(-3.0), 0);
    }

    #[test]
    fn test_invalid_fps_falls_back() {
        assert_eq!(FrameClock::new(0.0).fps(), 30.0);
        assert_eq!(FrameClock::new(f64::NAN).fps(), 30.0);
    }
}
