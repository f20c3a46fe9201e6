use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use reelgen_core::{RasterImage, ReelError, ReelResult};

/// Encoder that shells out to FFmpeg for H.264 encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    /// Check if FFmpeg is available on the system.
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Encode a stream of RGBA frames to an MP4 file using H.264 / yuv420p.
    ///
    /// Frames are written to FFmpeg's stdin as they are produced, so the
    /// stream is never collected in memory. Every frame must be
    /// `width`×`height`. Returns the number of frames written.
    ///
    /// # Arguments
    /// * `frames` - Ordered frame stream
    /// * `width` - Frame width in pixels
    /// * `height` - Frame height in pixels
    /// * `fps` - Frames per second
    /// * `output_path` - Path for the output MP4 file
    pub fn encode_stream<I>(
        frames: I,
        width: u32,
        height: u32,
        fps: f64,
        output_path: &Path,
    ) -> ReelResult<u64>
    where
        I: IntoIterator<Item = RasterImage>,
    {
        let mut frames = frames.into_iter().peekable();
        if frames.peek().is_none() {
            return Err(ReelError::Encode("no frames to encode".into()));
        }

        if !Self::is_available() {
            return Err(ReelError::Encode(
                "ffmpeg not found in PATH. Install FFmpeg: https://ffmpeg.org/download.html".into(),
            ));
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y");
        cmd.args(input_args(width, height, fps));
        cmd.args(output_args());
        cmd.arg(output_path);

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReelError::Encode(format!("failed to start ffmpeg: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::Encode("failed to open ffmpeg stdin".into()))?;

        let mut written = 0u64;
        for frame in frames {
            if frame.width != width || frame.height != height {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ReelError::Encode(format!(
                    "frame {} has dimensions {}x{}, expected {}x{}",
                    written, frame.width, frame.height, width, height
                )));
            }
            if let Err(e) = stdin.write_all(&frame.data) {
                // A broken pipe means ffmpeg exited; its stderr says why.
                drop(stdin);
                let stderr = collect_stderr(child);
                return Err(ReelError::Encode(format!(
                    "failed to write frame {} to ffmpeg: {}. FFmpeg stderr: {}",
                    written, e, stderr
                )));
            }
            written += 1;
            if written % 300 == 0 {
                tracing::debug!("encoded {} frames", written);
            }
        }

        drop(stdin);

        let output = child
            .wait_with_output()
            .map_err(|e| ReelError::Encode(format!("ffmpeg process error: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::Encode(format!(
                "ffmpeg failed with status {}: {}",
                output.status, stderr
            )));
        }

        tracing::info!(
            "Encoded {} frames to {} ({}x{} @ {}fps)",
            written,
            output_path.display(),
            width,
            height,
            fps
        );

        Ok(written)
    }
}

fn input_args(width: u32, height: u32, fps: f64) -> Vec<String> {
    vec![
        "-f".into(),
        "rawvideo".into(),
        "-pixel_format".into(),
        "rgba".into(),
        "-video_size".into(),
        format!("{}x{}", width, height),
        "-framerate".into(),
        format!("{}", fps),
        "-i".into(),
        "-".into(),
    ]
}

fn output_args() -> [&'static str; 10] {
    [
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-preset",
        "medium",
        "-crf",
        "23",
        "-movflags",
        "+faststart",
    ]
}

fn collect_stderr(child: Child) -> String {
    match child.wait_with_output() {
        Ok(output) => String::from_utf8_lossy(&output.stderr).into_owned(),
        Err(e) => format!("<unavailable: {}>", e),
    }
}
