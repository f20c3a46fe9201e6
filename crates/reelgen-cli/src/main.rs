mod jobs;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use reelgen_core::{FrameClock, Palette, StyleConfig};
use reelgen_encode::{mux_audio, FfmpegEncoder};
use reelgen_render::{Compositor, FrameStream, HorizontalAnchor, Scene, SceneBuilder, TextRasterizer};

use crate::jobs::Job;

const DEFAULT_CONFIG_FILE: &str = "reelgen.toml";

#[derive(Parser)]
#[command(
    name = "reelgen",
    version,
    about = "reelgen: puzzle videos with typed text",
    long_about = "reelgen renders puzzle job folders into short vertical videos:\na typed title and puzzle lines, a countdown, the explanation and a sign-off."
)]
struct Cli {
    /// Style config (TOML). Defaults to ./reelgen.toml when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List job folders that still need a video
    Pending {
        /// Jobs directory (default: paths.jobs_dir from the config)
        #[arg(long)]
        jobs_dir: Option<PathBuf>,
    },

    /// Render one job folder to video
    Render {
        /// Job folder containing puzzle.json and manifest.json
        #[arg()]
        job_dir: PathBuf,

        /// Output file path (default: <job_dir>/video.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render every pending job
    RenderAll {
        /// Jobs directory (default: paths.jobs_dir from the config)
        #[arg(long)]
        jobs_dir: Option<PathBuf>,
    },

    /// Render a single frame of a job to PNG
    Still {
        /// Job folder containing puzzle.json
        #[arg()]
        job_dir: PathBuf,

        /// Time in seconds
        #[arg(long)]
        at: f64,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the layer timeline of a job
    Inspect {
        /// Job folder containing puzzle.json
        #[arg()]
        job_dir: PathBuf,

        /// Also render every frame and print the content hash
        #[arg(long)]
        hash: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Pending { jobs_dir } => cmd_pending(&config, jobs_dir),
        Commands::Render { job_dir, output } => cmd_render(&config, &job_dir, output),
        Commands::RenderAll { jobs_dir } => cmd_render_all(&config, jobs_dir),
        Commands::Still {
            job_dir,
            at,
            output,
        } => cmd_still(&config, &job_dir, at, &output),
        Commands::Inspect { job_dir, hash } => cmd_inspect(&config, &job_dir, hash),
    }
}

/// An explicit `--config` must load; the default file is best-effort.
fn load_config(path: Option<&Path>) -> Result<StyleConfig> {
    match path {
        Some(path) => StyleConfig::load_from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if !default_path.exists() {
                return Ok(StyleConfig::default());
            }
            Ok(StyleConfig::load_from_file(default_path).unwrap_or_else(|e| {
                tracing::warn!("ignoring {}: {}", DEFAULT_CONFIG_FILE, e);
                StyleConfig::default()
            }))
        }
    }
}

/// Everything needed to sample a job's frames.
struct PreparedJob {
    job: Job,
    palette: Palette,
    scene: Scene,
}

impl PreparedJob {
    fn stream(self, config: &StyleConfig) -> (Job, FrameStream) {
        let stream = FrameStream::from_scene(
            Compositor::from_config(config, &self.palette),
            self.scene,
            FrameClock::new(config.output.fps),
        );
        (self.job, stream)
    }
}

fn prepare_job(config: &StyleConfig, job_dir: &Path) -> Result<PreparedJob> {
    let job = Job::load(job_dir)?;
    let palette = Palette::resolve(job.manifest.palette(), config);
    let title = job.title(&config.title.template);
    let content = job.content(title);

    let rasterizer = Arc::new(TextRasterizer::from_config(&config.font)?);
    let builder = SceneBuilder::new(config, &palette, rasterizer);
    let scene = builder
        .full(&content)
        .with_context(|| format!("failed to build scenes for {}", job_dir.display()))?;

    Ok(PreparedJob {
        job,
        palette,
        scene,
    })
}

fn jobs_dir_or_default(config: &StyleConfig, jobs_dir: Option<PathBuf>) -> PathBuf {
    jobs_dir.unwrap_or_else(|| config.paths.jobs_dir.clone())
}

fn cmd_pending(config: &StyleConfig, jobs_dir: Option<PathBuf>) -> Result<()> {
    let jobs_dir = jobs_dir_or_default(config, jobs_dir);
    let pending = jobs::find_unprocessed_jobs(&jobs_dir)?;
    if pending.is_empty() {
        println!("No unprocessed jobs found in {}", jobs_dir.display());
        return Ok(());
    }
    println!("📋 {} pending job(s) in {}", pending.len(), jobs_dir.display());
    for dir in pending {
        println!("   - {}", dir.display());
    }
    Ok(())
}

fn cmd_render(config: &StyleConfig, job_dir: &Path, output: Option<PathBuf>) -> Result<()> {
    let start = Instant::now();
    println!("🎬 reelgen v{}", env!("CARGO_PKG_VERSION"));
    println!("   Job: {}", job_dir.display());

    let prepared = prepare_job(config, job_dir)?;
    println!("   Palette: {}", prepared.palette.name);
    println!(
        "   ✓ Built {} layers, {:.2}s",
        prepared.scene.timeline.len(),
        prepared.scene.duration
    );

    let (mut job, stream) = prepared.stream(config);
    let (width, height, fps) = (stream.width(), stream.height(), stream.fps());

    let silent = job_dir.join(jobs::SILENT_VIDEO_FILE);
    let frames = FfmpegEncoder::encode_stream(stream, width, height, fps, &silent)
        .with_context(|| format!("failed to encode {}", silent.display()))?;
    println!("   ✓ Encoded {} frames", frames);

    let final_path = output.unwrap_or_else(|| job_dir.join(jobs::VIDEO_FILE));
    match job.music_path(&config.paths.assets_dir) {
        Some(music) => {
            println!("   Music: {}", music.display());
            mux_audio(&silent, &music, Some(&final_path))
                .with_context(|| format!("failed to mux {}", music.display()))?;
        }
        None => {
            println!("   No music in manifest/assets; keeping silent video");
            if final_path != silent {
                std::fs::rename(&silent, &final_path).with_context(|| {
                    format!("failed to move {} to {}", silent.display(), final_path.display())
                })?;
            }
        }
    }

    job.manifest
        .mark_rendered(&manifest_video_file(job_dir, &final_path));
    job.save_manifest()?;

    println!("   ✓ {}", final_path.display());
    println!("   ⚡ Done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Manifest entry for the rendered video: a bare file name inside the job
/// folder, the full path anywhere else.
fn manifest_video_file(job_dir: &Path, video: &Path) -> String {
    match video.strip_prefix(job_dir) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => video.to_string_lossy().into_owned(),
    }
}

fn cmd_render_all(config: &StyleConfig, jobs_dir: Option<PathBuf>) -> Result<()> {
    let jobs_dir = jobs_dir_or_default(config, jobs_dir);
    let pending = jobs::find_unprocessed_jobs(&jobs_dir)?;
    if pending.is_empty() {
        println!("No unprocessed jobs found in {}", jobs_dir.display());
        return Ok(());
    }

    let mut failed = 0usize;
    for dir in &pending {
        println!("--- Processing job: {} ---", dir.display());
        if let Err(e) = cmd_render(config, dir, None) {
            failed += 1;
            tracing::error!("job {} failed: {:#}", dir.display(), e);
        }
    }

    println!(
        "Rendered {} of {} job(s)",
        pending.len() - failed,
        pending.len()
    );
    if failed > 0 {
        anyhow::bail!("{} job(s) failed", failed);
    }
    Ok(())
}

fn cmd_still(config: &StyleConfig, job_dir: &Path, at: f64, output: &Path) -> Result<()> {
    let (_, stream) = prepare_job(config, job_dir)?.stream(config);
    let total = stream.frame_count() as f64 / stream.fps();
    let frame = stream
        .still_at(at)
        .with_context(|| format!("{:.2}s is past the end of the video ({:.2}s)", at, total))?;

    let (width, height) = frame.size();
    let image = image::RgbaImage::from_raw(width, height, frame.data)
        .context("frame buffer does not match its dimensions")?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image
        .save(output)
        .with_context(|| format!("failed to save {}", output.display()))?;
    println!("🖼️  Frame at {:.2}s → {}", at, output.display());
    Ok(())
}

fn cmd_inspect(config: &StyleConfig, job_dir: &Path, hash: bool) -> Result<()> {
    let prepared = prepare_job(config, job_dir)?;
    let scene = &prepared.scene;

    println!("🔍 {} ({})", job_dir.display(), prepared.palette.name);
    println!(
        "   {:<22} {:>8} {:>8} {:>10}",
        "layer", "start", "end", "position"
    );
    for layer in scene.timeline.layers() {
        let x = match layer.position.x {
            HorizontalAnchor::Centered => "center".to_string(),
            HorizontalAnchor::Fixed(x) => x.to_string(),
        };
        println!(
            "   {:<22} {:>8.3} {:>8.3} {:>10}",
            layer.label,
            layer.start,
            layer.end(),
            format!("{},{}", x, layer.position.y)
        );
    }

    let clock = FrameClock::new(config.output.fps);
    println!(
        "   Total: {:.3}s, {} frames @ {} fps",
        scene.duration,
        clock.frame_count(scene.duration),
        clock.fps()
    );

    if hash {
        let (_, stream) = prepared.stream(config);
        println!("   Content hash: {}", stream.content_hash());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_video_file_default_output() {
        let job_dir = Path::new("jobs/job_1");
        let video = job_dir.join(jobs::VIDEO_FILE);
        assert_eq!(manifest_video_file(job_dir, &video), "video.mp4");
    }

    #[test]
    fn test_manifest_video_file_outside_job_dir() {
        let job_dir = Path::new("jobs/job_1");
        let video = Path::new("out/custom.mp4");
        assert_eq!(manifest_video_file(job_dir, video), "out/custom.mp4");
    }
}
