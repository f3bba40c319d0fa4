use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio::frames::{self, DEFAULT_SAMPLE_RATE};
use crate::compose::filter::{self, OUT_LABEL};
use crate::compose::mode::{ProductInputs, ProductMode};
use crate::compose::validate::validate_audio;
use crate::encode::driver::{EncoderPipeDriver, StreamStats};
use crate::encode::job::{EncodeJob, InputSpec};
use crate::encode::preset::QualityPreset;
use crate::foundation::core::{Fps, Rgb8};
use crate::foundation::error::{WavecastError, WavecastResult};
use crate::render::renderer::{RenderThreading, Renderer};
use crate::viz::config::VisualizationConfig;

/// Frame rate of products that do not render a waveform.
pub const OUTPUT_FPS: u32 = 30;

/// Inputs for one compose call.
#[derive(Clone, Debug)]
pub struct ComposeRequest {
    pub audio_path: PathBuf,
    pub outputs_dir: PathBuf,
    /// File stem of the product; the output is `<outputs_dir>/<output_name>.mp4`.
    pub output_name: String,
    pub preset: QualityPreset,
    pub avatar_video: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub visualization: Option<VisualizationConfig>,
    pub threading: RenderThreading,
}

impl ComposeRequest {
    pub fn new(
        audio_path: impl Into<PathBuf>,
        outputs_dir: impl Into<PathBuf>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            audio_path: audio_path.into(),
            outputs_dir: outputs_dir.into(),
            output_name: output_name.into(),
            preset: QualityPreset::default(),
            avatar_video: None,
            background: None,
            visualization: None,
            threading: RenderThreading::default(),
        }
    }

    pub fn with_preset(mut self, preset: QualityPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_avatar(mut self, path: impl Into<PathBuf>) -> Self {
        self.avatar_video = Some(path.into());
        self
    }

    pub fn with_background(mut self, path: impl Into<PathBuf>) -> Self {
        self.background = Some(path.into());
        self
    }

    pub fn with_visualization(mut self, cfg: VisualizationConfig) -> Self {
        self.visualization = Some(cfg);
        self
    }

    pub fn with_threading(mut self, threading: RenderThreading) -> Self {
        self.threading = threading;
        self
    }

    pub fn output_path(&self) -> WavecastResult<PathBuf> {
        let name = self.output_name.trim();
        if name.is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name == ".."
        {
            return Err(WavecastError::config_invalid(format!(
                "output name '{}' must be a plain file stem",
                self.output_name
            )));
        }
        Ok(self.outputs_dir.join(format!("{name}.mp4")))
    }
}

/// Result of a successful compose call.
#[derive(Clone, Debug)]
pub struct ComposeOutcome {
    pub mode: ProductMode,
    pub output: PathBuf,
    pub stats: StreamStats,
}

/// Scratch directory under `<outputs_dir>/.cache/`, removed with everything in it on drop.
#[derive(Debug)]
pub struct CacheDir {
    path: PathBuf,
}

static CACHE_SEQ: AtomicU64 = AtomicU64::new(0);

impl CacheDir {
    pub fn create(outputs_dir: &Path) -> WavecastResult<Self> {
        use anyhow::Context as _;
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let name = format!(
            "job-{}-{nanos}-{}",
            std::process::id(),
            CACHE_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let path = outputs_dir.join(".cache").join(name);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create cache dir '{}'", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for CacheDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove cache dir");
        }
    }
}

/// Chooses a product for a request and drives the encoder to build it.
#[derive(Debug)]
pub struct Compositor {
    driver: EncoderPipeDriver,
}

impl Compositor {
    pub fn new(driver: EncoderPipeDriver) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &EncoderPipeDriver {
        &self.driver
    }

    #[tracing::instrument(skip_all, fields(name = %req.output_name, preset = %req.preset))]
    pub fn compose(&self, req: &ComposeRequest) -> WavecastResult<ComposeOutcome> {
        let output = req.output_path()?;
        let inputs = ProductInputs::detect(
            req.avatar_video.as_deref(),
            req.background.as_deref(),
            req.visualization.is_some(),
        );
        let mode = ProductMode::select(inputs);
        tracing::info!(%mode, output = %output.display(), "compose");

        if let Some(bg) = &req.background
            && !bg.is_file()
        {
            return Err(WavecastError::input_missing(format!(
                "background '{}' does not exist",
                bg.display()
            )));
        }
        let duration = if mode.consumes_audio_file() {
            validate_audio(self.driver.tools(), &req.audio_path)?.duration_sec
        } else {
            0.0
        };
        if self.driver.cancel_token().is_cancelled() {
            return Err(WavecastError::cancelled("compose cancelled before start"));
        }

        let stats = self.build(req, mode, &output, duration)?;
        Ok(ComposeOutcome {
            mode,
            output,
            stats,
        })
    }

    fn build(
        &self,
        req: &ComposeRequest,
        mode: ProductMode,
        output: &Path,
        duration: f64,
    ) -> WavecastResult<StreamStats> {
        let preset = req.preset;
        let res = preset.resolution();
        let fps = Fps::integer(OUTPUT_FPS)?;
        let audio = req.audio_path.as_path();
        let job = EncodeJob::new(output, preset, fps);
        let media = |p: &Path| InputSpec::Media {
            path: p.to_path_buf(),
        };
        let image = |p: &Path| InputSpec::Image {
            path: p.to_path_buf(),
            fps,
        };

        match mode {
            ProductMode::Minimal => {
                let job = job
                    .input(InputSpec::Color {
                        color: Rgb8::BLACK,
                        resolution: res,
                        fps,
                    })
                    .input(media(audio))
                    .audio_from(1)
                    .duration(duration);
                self.driver.run(&job)
            }
            ProductMode::StillImage => {
                let bg = required(req.background.as_deref(), "background")?;
                let job = job
                    .input(image(bg))
                    .input(media(audio))
                    .filter_graph(filter::still_image(res), OUT_LABEL)
                    .audio_from(1)
                    .duration(duration);
                self.driver.run(&job)
            }
            ProductMode::AvatarOnly => {
                let avatar = required(req.avatar_video.as_deref(), "avatar")?;
                let job = job.input(media(avatar)).audio_from(0).copy_streams();
                self.driver.run(&job)
            }
            ProductMode::AvatarOverBackground => {
                let avatar = required(req.avatar_video.as_deref(), "avatar")?;
                let bg = required(req.background.as_deref(), "background")?;
                let job = job
                    .input(media(avatar))
                    .input(image(bg))
                    .filter_graph(filter::avatar_over_background(res), OUT_LABEL)
                    .audio_from(0);
                self.driver.run(&job)
            }
            ProductMode::WaveformOnly => {
                let cfg = self.visualization_for(req)?;
                self.render_waveform(audio, output, cfg, preset, duration, req.threading.clone())
            }
            ProductMode::WaveformOverBackground
            | ProductMode::AvatarWithWaveform
            | ProductMode::AvatarWithBackgroundAndWaveform => {
                let cfg = self.visualization_for(req)?;
                let cache = CacheDir::create(&req.outputs_dir)?;
                let viz = cache.file("waveform.mp4");
                self.render_waveform(audio, &viz, cfg.clone(), preset, duration, req.threading.clone())?;

                let job = match mode {
                    ProductMode::WaveformOverBackground => {
                        let bg = required(req.background.as_deref(), "background")?;
                        job.input(image(bg))
                            .input(media(&viz))
                            .input(media(audio))
                            .filter_graph(filter::waveform_over_background(res), OUT_LABEL)
                            .audio_from(2)
                            .duration(duration)
                    }
                    ProductMode::AvatarWithWaveform => {
                        let avatar = required(req.avatar_video.as_deref(), "avatar")?;
                        job.input(media(avatar))
                            .input(media(&viz))
                            .filter_graph(filter::avatar_with_waveform(res), OUT_LABEL)
                            .audio_from(0)
                    }
                    _ => {
                        let avatar = required(req.avatar_video.as_deref(), "avatar")?;
                        let bg = required(req.background.as_deref(), "background")?;
                        let region = filter::waveform_region(&cfg)?;
                        job.input(media(avatar))
                            .input(image(bg))
                            .input(media(&viz))
                            .filter_graph(
                                filter::full_stack(res, region, cfg.chroma_similarity),
                                OUT_LABEL,
                            )
                            .audio_from(0)
                    }
                };
                let stats = self.driver.run(&job);
                drop(cache);
                stats
            }
        }
    }

    /// The request's visualization, resolved and sized to the preset.
    fn visualization_for(&self, req: &ComposeRequest) -> WavecastResult<VisualizationConfig> {
        let cfg = req
            .visualization
            .clone()
            .ok_or_else(|| WavecastError::config_invalid("product needs a visualization config"))?;
        VisualizationConfig {
            resolution: req.preset.resolution(),
            ..cfg
        }
        .resolve()
    }

    /// Render the waveform for `audio` and stream it straight into an MP4 at `output`.
    ///
    /// `cfg` must already be resolved.
    pub fn render_waveform(
        &self,
        audio: &Path,
        output: &Path,
        cfg: VisualizationConfig,
        preset: QualityPreset,
        duration: f64,
        threading: RenderThreading,
    ) -> WavecastResult<StreamStats> {
        let renderer = Renderer::new(cfg)?;
        let fps = renderer.config().fps()?;
        let resolution = renderer.resolution();
        let windows = frames::iterate(
            self.driver.tools(),
            audio,
            DEFAULT_SAMPLE_RATE,
            fps,
            duration,
        )?;
        tracing::info!(
            frames = windows.total_frames(),
            width = resolution.width,
            height = resolution.height,
            "rendering waveform"
        );
        let job = EncodeJob::waveform(audio, output, duration, preset, resolution, fps);
        let rendered = renderer.into_frames(windows, threading)?;
        self.driver.stream(rendered, &job)
    }
}

fn required<'a>(path: Option<&'a Path>, what: &str) -> WavecastResult<&'a Path> {
    path.ok_or_else(|| WavecastError::config_invalid(format!("product needs a {what} input")))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
