//! Attach a music track to a silent video.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reelgen_core::{ReelError, ReelResult};

use crate::FfmpegEncoder;

/// `temp_silent_video.mp4` → `temp_video.mp4`; names without `_silent`
/// are kept as is.
pub fn default_muxed_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().replace("_silent", ""))
        .unwrap_or_default();
    let name = match video.extension() {
        Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
        None => stem,
    };
    video.with_file_name(name)
}

fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = Vec::new();
    args.push("-y".into());
    args.push("-i".into());
    args.push(video.into());
    // Loop the music forever; -shortest trims it to the video.
    args.extend(["-stream_loop", "-1", "-i"].map(std::ffi::OsString::from));
    args.push(audio.into());
    args.extend(["-shortest", "-c:v", "copy", "-c:a", "aac"].map(std::ffi::OsString::from));
    args.push(output.into());
    args
}

/// Mux `audio` into `video`, writing `output` (or [`default_muxed_path`]).
///
/// The video stream is copied, the audio is looped and trimmed to the video
/// and encoded as AAC. On success the silent source is removed unless it is
/// the output itself.
pub fn mux_audio(video: &Path, audio: &Path, output: Option<&Path>) -> ReelResult<PathBuf> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_muxed_path(video));

    if !video.exists() {
        return Err(ReelError::Encode(format!(
            "video to mux not found: {}",
            video.display()
        )));
    }
    if !audio.exists() {
        return Err(ReelError::Encode(format!(
            "audio track not found: {}",
            audio.display()
        )));
    }
    if !FfmpegEncoder::is_available() {
        return Err(ReelError::Encode("ffmpeg not found in PATH".into()));
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let result = Command::new("ffmpeg")
        .args(mux_args(video, audio, &output))
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ReelError::Encode(format!("failed to start ffmpeg: {}", e)))?;

    if !result.status.success() {
        return Err(ReelError::Encode(format!(
            "ffmpeg mux failed with status {}: {}",
            result.status,
            String::from_utf8_lossy(&result.stderr)
        )));
    }

    if video != output {
        if let Err(e) = std::fs::remove_file(video) {
            tracing::warn!("could not remove silent video {}: {}", video.display(), e);
        }
    }

    tracing::info!(
        "Muxed {} into {}",
        audio.display(),
        output.display()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_muxed_path_strips_silent() {
        let path = Path::new("/jobs/a/temp_silent_video.mp4");
        assert_eq!(default_muxed_path(path), PathBuf::from("/jobs/a/temp_video.mp4"));
        let path = Path::new("clip.mp4");
        assert_eq!(default_muxed_path(path), PathBuf::from("clip.mp4"));
    }

    #[test]
    fn test_mux_args_loop_and_trim_audio() {
        let args = mux_args(Path::new("v.mp4"), Path::new("a.mp3"), Path::new("o.mp4"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-y", "-i", "v.mp4", "-stream_loop", "-1", "-i", "a.mp3", "-shortest", "-c:v",
                "copy", "-c:a", "aac", "o.mp4"
            ]
        );
    }

    #[test]
    fn test_missing_inputs_are_errors() {
        let dir = std::env::temp_dir().join("reelgen_mux_missing");
        let video = dir.join("nope_silent.mp4");
        let audio = dir.join("nope.mp3");
        assert!(matches!(
            mux_audio(&video, &audio, None),
            Err(ReelError::Encode(_))
        ));
    }
}
