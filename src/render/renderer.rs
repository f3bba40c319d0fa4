use std::collections::VecDeque;

use rayon::prelude::*;

use crate::audio::frames::AudioWindow;
use crate::foundation::core::Resolution;
use crate::foundation::error::{WavecastError, WavecastResult};
use crate::render::frame::Frame;
use crate::render::layout::FrameLayout;
use crate::render::raster::{Rasterizer, Scene};
use crate::render::styles::{ParticleField, SpectrumAnalyzer, circular_scene, spectrum_scene};
use crate::render::waveform::waveform_scene;
use crate::viz::config::{VisualizationConfig, VisualizationStyle};

/// Threading and chunking controls for multi-frame rendering.
#[derive(Clone, Debug)]
pub struct RenderThreading {
    /// Enable parallel rendering when `true`.
    pub parallel: bool,
    /// Chunk size in frames for batched scheduling.
    pub chunk_size: usize,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 32,
            threads: None,
        }
    }
}

/// Frame producer family, chosen once per job.
#[derive(Clone, Debug)]
enum StylePainter {
    Waveform,
    Spectrum(SpectrumAnalyzer),
    Circular,
    Particles(ParticleField),
}

/// Config, layout and style state needed to describe any frame. Shared read-only by workers.
#[derive(Clone, Debug)]
pub struct FramePainter {
    cfg: VisualizationConfig,
    layout: FrameLayout,
    style: StylePainter,
}

impl FramePainter {
    /// `cfg` should already be resolved; it is validated again here.
    pub fn new(cfg: VisualizationConfig) -> WavecastResult<Self> {
        cfg.validate()?;
        let layout = FrameLayout::new(&cfg)?;
        let style = match cfg.style {
            VisualizationStyle::Waveform => StylePainter::Waveform,
            VisualizationStyle::Spectrum => StylePainter::Spectrum(SpectrumAnalyzer::default()),
            VisualizationStyle::Circular => StylePainter::Circular,
            VisualizationStyle::Particles => {
                StylePainter::Particles(ParticleField::new(&cfg, layout.bands.len()))
            }
        };
        Ok(Self { cfg, layout, style })
    }

    pub fn config(&self) -> &VisualizationConfig {
        &self.cfg
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn scene(&self, window: &AudioWindow) -> Scene {
        let samples = &window.samples;
        match &self.style {
            StylePainter::Waveform => waveform_scene(&self.cfg, &self.layout, samples),
            StylePainter::Spectrum(a) => spectrum_scene(&self.cfg, &self.layout, a, samples),
            StylePainter::Circular => circular_scene(&self.cfg, &self.layout, samples),
            StylePainter::Particles(p) => p.scene(&self.cfg, &self.layout, window.index.0, samples),
        }
    }
}

/// Turns audio windows into frames for one visualization job.
pub struct Renderer {
    painter: FramePainter,
    rasterizer: Rasterizer,
}

impl Renderer {
    pub fn new(cfg: VisualizationConfig) -> WavecastResult<Self> {
        Ok(Self {
            painter: FramePainter::new(cfg)?,
            rasterizer: Rasterizer::new(),
        })
    }

    pub fn painter(&self) -> &FramePainter {
        &self.painter
    }

    pub fn config(&self) -> &VisualizationConfig {
        self.painter.config()
    }

    pub fn resolution(&self) -> Resolution {
        self.painter.cfg.resolution
    }

    pub fn render_frame(&mut self, window: &AudioWindow) -> WavecastResult<Frame> {
        let scene = self.painter.scene(window);
        self.rasterizer.rasterize(&scene)
    }

    /// Lazily render every window of `windows`, in order.
    pub fn into_frames<I>(self, windows: I, threading: RenderThreading) -> WavecastResult<RenderedFrames<I>>
    where
        I: Iterator<Item = AudioWindow>,
    {
        let pool = if threading.parallel {
            Some(build_thread_pool(threading.threads)?)
        } else {
            None
        };
        Ok(RenderedFrames {
            renderer: self,
            windows,
            chunk_size: threading.chunk_size.max(1),
            pool,
            ready: VecDeque::new(),
        })
    }
}

/// Iterator of rendered frames; in parallel mode whole chunks are rendered ahead and released in
/// frame order.
pub struct RenderedFrames<I> {
    renderer: Renderer,
    windows: I,
    chunk_size: usize,
    pool: Option<rayon::ThreadPool>,
    ready: VecDeque<WavecastResult<Frame>>,
}

impl<I> RenderedFrames<I>
where
    I: Iterator<Item = AudioWindow>,
{
    fn fill_chunk(&mut self, pool: &rayon::ThreadPool) {
        let chunk: Vec<AudioWindow> = self.windows.by_ref().take(self.chunk_size).collect();
        if chunk.is_empty() {
            return;
        }
        let painter = &self.renderer.painter;
        let rendered: Vec<WavecastResult<Frame>> = pool.install(|| {
            chunk
                .par_iter()
                .map_init(Rasterizer::new, |raster, w| raster.rasterize(&painter.scene(w)))
                .collect()
        });
        self.ready.extend(rendered);
    }
}

impl<I> Iterator for RenderedFrames<I>
where
    I: Iterator<Item = AudioWindow>,
{
    type Item = WavecastResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(f) = self.ready.pop_front() {
            return Some(f);
        }
        match self.pool.take() {
            Some(pool) => {
                self.fill_chunk(&pool);
                self.pool = Some(pool);
                self.ready.pop_front()
            }
            None => {
                let w = self.windows.next()?;
                Some(self.renderer.render_frame(&w))
            }
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> WavecastResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(WavecastError::config_invalid(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| WavecastError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
