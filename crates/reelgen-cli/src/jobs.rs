use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use reelgen_render::PuzzleContent;

pub const PUZZLE_FILE: &str = "puzzle.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SILENT_VIDEO_FILE: &str = "temp_silent_video.mp4";
pub const VIDEO_FILE: &str = "video.mp4";

/// `puzzle.json` as written by the puzzle generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleFile {
    #[serde(default)]
    pub puzzle_lines_with_error: Vec<String>,
    #[serde(default)]
    pub text_of_erroneous_line: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreativeChoices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub video_rendered: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `manifest.json`. Fields the renderer does not know about are carried
/// through `extra` so saving never drops them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, rename = "videoId", skip_serializing_if = "Option::is_none")]
    pub video_id_camel: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_choices: Option<CreativeChoices>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_file: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Manifest {
    pub fn palette(&self) -> Option<&str> {
        self.creative_choices.as_ref()?.palette.as_deref()
    }

    pub fn music_track(&self) -> Option<&str> {
        self.creative_choices
            .as_ref()?
            .music_track
            .as_deref()
            .filter(|t| !t.is_empty())
    }

    /// `video_id`, `id` or `videoId`, whichever is set first.
    pub fn video_id(&self) -> Option<String> {
        [&self.video_id, &self.id, &self.video_id_camel]
            .into_iter()
            .flatten()
            .find_map(id_string)
    }

    pub fn mark_rendered(&mut self, video_file: &str) {
        self.status.video_rendered = true;
        self.video_file = Some(video_file.to_string());
    }
}

/// A job folder with its parsed inputs.
#[derive(Debug, Clone)]
pub struct Job {
    pub dir: PathBuf,
    pub puzzle: PuzzleFile,
    pub manifest: Manifest,
}

impl Job {
    pub fn load(dir: &Path) -> Result<Self> {
        let puzzle_path = dir.join(PUZZLE_FILE);
        let raw = std::fs::read_to_string(&puzzle_path)
            .with_context(|| format!("failed to read puzzle file: {}", puzzle_path.display()))?;
        let puzzle: PuzzleFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse puzzle JSON: {}", puzzle_path.display()))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let raw = std::fs::read_to_string(&manifest_path).with_context(|| {
                format!("failed to read manifest: {}", manifest_path.display())
            })?;
            serde_json::from_str(&raw).with_context(|| {
                format!("failed to parse manifest JSON: {}", manifest_path.display())
            })?
        } else {
            tracing::warn!("{} has no manifest; using defaults", dir.display());
            Manifest::default()
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            puzzle,
            manifest,
        })
    }

    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }

    pub fn video_id(&self) -> String {
        self.manifest.video_id().unwrap_or_else(|| self.name())
    }

    /// Puzzle category, then the manifest's creative choices, then `Unknown`.
    pub fn category(&self) -> String {
        let choices = self.manifest.creative_choices.as_ref();
        [
            self.puzzle.category.as_deref(),
            choices.and_then(|c| c.category.as_deref()),
            choices.and_then(|c| c.puzzle_category.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find(|c| !c.is_empty())
        .unwrap_or("Unknown")
        .to_string()
    }

    pub fn title(&self, template: &str) -> String {
        reelgen_core::title::render_title(template, &self.video_id(), &self.category())
    }

    pub fn content(&self, title: String) -> PuzzleContent {
        PuzzleContent::new(
            title,
            self.puzzle.puzzle_lines_with_error.clone(),
            &self.puzzle.text_of_erroneous_line,
            self.puzzle.explanation.clone(),
        )
    }

    /// The manifest's music track under `assets_dir`, if the file exists.
    pub fn music_path(&self, assets_dir: &Path) -> Option<PathBuf> {
        let track = self.manifest.music_track()?;
        let path = assets_dir.join(track);
        if path.exists() {
            Some(path)
        } else {
            tracing::warn!("music track {} not found; rendering silent", path.display());
            None
        }
    }

    pub fn save_manifest(&self) -> Result<PathBuf> {
        let path = self.dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(&self.manifest)
            .context("failed to serialize manifest")?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write manifest: {}", path.display()))?;
        Ok(path)
    }
}

/// Job folders that have a `puzzle.json` and no `.mp4` yet, sorted by name.
pub fn find_unprocessed_jobs(jobs_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !jobs_dir.exists() {
        return Ok(out);
    }

    for entry in std::fs::read_dir(jobs_dir)
        .with_context(|| format!("failed to read jobs dir: {}", jobs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() || !path.join(PUZZLE_FILE).exists() {
            continue;
        }
        if has_video(&path)? {
            continue;
        }
        out.push(path);
    }

    out.sort();
    Ok(out)
}

fn has_video(dir: &Path) -> Result<bool> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read job dir: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("mp4") {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("reelgen_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn write_job(root: &Path, name: &str, manifest: Option<&str>) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(PUZZLE_FILE),
            r#"{
                "puzzle_lines_with_error": ["2+2=4", "3+3=7", "5+5=10"],
                "text_of_erroneous_line": "3+3=7",
                "explanation": "three plus three is six"
            }"#,
        )
        .unwrap();
        if let Some(m) = manifest {
            std::fs::write(dir.join(MANIFEST_FILE), m).unwrap();
        }
        dir
    }

    #[test]
    fn unprocessed_jobs_skip_rendered_and_incomplete() {
        let root = fixture_root("jobs_pending");
        let a = write_job(&root, "job_a", None);
        let b = write_job(&root, "job_b", None);
        std::fs::write(b.join(VIDEO_FILE), b"").unwrap();
        std::fs::create_dir_all(root.join("job_c")).unwrap();
        std::fs::write(root.join("stray.txt"), "x").unwrap();

        let pending = find_unprocessed_jobs(&root).unwrap();
        assert_eq!(pending, vec![a]);

        assert!(find_unprocessed_jobs(&root.join("missing")).unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn job_resolves_id_category_and_anomaly() {
        let root = fixture_root("jobs_resolve");
        let dir = write_job(
            &root,
            "job_42",
            Some(r#"{"id": 42, "creative_choices": {"palette": "amber", "puzzle_category": "MATH"}}"#),
        );
        let job = Job::load(&dir).unwrap();
        assert_eq!(job.video_id(), "42");
        assert_eq!(job.category(), "MATH");
        assert_eq!(job.manifest.palette(), Some("amber"));

        let content = job.content(job.title("EXP_{video_id} // {category}"));
        assert_eq!(content.title, "EXP_42 // MATH");
        assert_eq!(content.anomaly_index, 1);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn job_without_manifest_falls_back_to_folder_name() {
        let root = fixture_root("jobs_fallback");
        let dir = write_job(&root, "job_xyz", None);
        let job = Job::load(&dir).unwrap();
        assert_eq!(job.video_id(), "job_xyz");
        assert_eq!(job.category(), "Unknown");
        assert!(job.music_path(&root).is_none());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn music_path_requires_existing_file() {
        let root = fixture_root("jobs_music");
        let dir = write_job(
            &root,
            "job_m",
            Some(r#"{"creative_choices": {"music_track": "track_A.mp3"}}"#),
        );
        let job = Job::load(&dir).unwrap();
        let assets = root.join("assets");
        assert!(job.music_path(&assets).is_none());

        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("track_A.mp3"), b"").unwrap();
        assert_eq!(job.music_path(&assets), Some(assets.join("track_A.mp3")));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn mark_rendered_preserves_unknown_fields() {
        let root = fixture_root("jobs_manifest");
        let dir = write_job(
            &root,
            "job_keep",
            Some(
                r#"{
                    "video_id": "abc",
                    "created": "2025-01-01",
                    "creative_choices": {"palette": "ice", "mood": "calm"},
                    "status": {"video_rendered": false, "uploaded": false}
                }"#,
            ),
        );
        let mut job = Job::load(&dir).unwrap();
        job.manifest.mark_rendered(VIDEO_FILE);
        job.save_manifest().unwrap();

        let raw = std::fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap();
        let saved: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved["video_id"], "abc");
        assert_eq!(saved["created"], "2025-01-01");
        assert_eq!(saved["creative_choices"]["mood"], "calm");
        assert_eq!(saved["creative_choices"]["palette"], "ice");
        assert_eq!(saved["status"]["video_rendered"], true);
        assert_eq!(saved["status"]["uploaded"], false);
        assert_eq!(saved["video_file"], "video.mp4");
        let _ = std::fs::remove_dir_all(&root);
    }
}
