//! Alternate frame producers. They share the band layout, line/instance replication and the
//! rasterizer with the waveform, and differ only in what they draw.

use std::sync::Arc;

use kurbo::{Affine, Point};
use rand::Rng;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::render::envelope::{AmplitudeSummary, Envelope, compress};
use crate::render::layout::{FrameLayout, rotation};
use crate::render::raster::{Primitive, Scene, Shape};
use crate::render::waveform::profile_scene;
use crate::viz::config::{Axis, VisualizationConfig, WaveformStyle};

/// FFT length used by the spectrum style.
pub const FFT_SIZE: usize = 2048;

/// Upper bound on spectrum bars per band.
pub const MAX_BARS: usize = 64;

/// Particles per band.
pub const PARTICLES_PER_BAND: usize = 64;

/// Magnitude spectrum grouped into log-spaced bars.
#[derive(Clone)]
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("size", &self.window.len())
            .finish()
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new(FFT_SIZE)
    }
}

impl SpectrumAnalyzer {
    pub fn new(size: usize) -> Self {
        let size = size.max(8);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(size);
        let denom = (size - 1) as f32;
        let window = (0..size)
            .map(|i| 0.5 - 0.5 * (std::f32::consts::TAU * i as f32 / denom).cos())
            .collect();
        Self { fft, window }
    }

    /// Mean normalized magnitude for each of `bars` log-spaced frequency ranges.
    pub fn bars(&self, samples: &[f32], bars: usize) -> Vec<f32> {
        let size = self.window.len();
        let mut buf: Vec<Complex<f32>> = self
            .window
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let s = samples.get(i).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
                Complex::new(s * w, 0.0)
            })
            .collect();
        self.fft.process(&mut buf);

        // Hann window has a coherent gain of 0.5.
        let norm = 4.0 / size as f32;
        let half = size / 2;
        let mags: Vec<f32> = buf[..half].iter().map(|c| c.norm() * norm).collect();

        let bars = bars.max(1);
        let lo = 1.0f64;
        let hi = half as f64;
        (0..bars)
            .map(|b| {
                let a = (lo * (hi / lo).powf(b as f64 / bars as f64)).floor() as usize;
                let z = (lo * (hi / lo).powf((b + 1) as f64 / bars as f64)).floor() as usize;
                let (a, z) = (a.clamp(1, half - 1), z.clamp(a + 1, half));
                let slice = &mags[a..z];
                slice.iter().sum::<f32>() / slice.len() as f32
            })
            .collect()
    }
}

/// Spectrum bars standing on each band's baseline.
pub fn spectrum_scene(
    cfg: &VisualizationConfig,
    layout: &FrameLayout,
    analyzer: &SpectrumAnalyzer,
    samples: &[f32],
) -> Scene {
    let amplitude =
        AmplitudeSummary::of(samples).amplitude(cfg.sensitivity, cfg.amplitude_multiplier);
    let gain = cfg.amplitude_multiplier;
    let bars_for = |len: f64| ((len / 8.0) as usize).clamp(4, MAX_BARS);
    let bar_width = layout
        .bands
        .first()
        .map(|b| 0.7 * b.length() / bars_for(b.length()) as f64);
    profile_scene(cfg, layout, amplitude, WaveformStyle::Bars, bar_width, |band| {
        let raw = analyzer.bars(samples, bars_for(band.length()));
        Envelope::from_values(
            raw.into_iter()
                .map(|m| compress(f64::from(m), gain) as f32)
                .collect(),
        )
    })
}

/// Envelope wrapped around a circle centered in each band.
pub fn circular_scene(cfg: &VisualizationConfig, layout: &FrameLayout, samples: &[f32]) -> Scene {
    let gain = cfg.amplitude_multiplier;
    let mut scene = Scene {
        canvas: layout.canvas,
        output: layout.output,
        anti_alias: cfg.anti_alias,
        clip: None,
        shapes: Vec::new(),
    };
    let n_lines = cfg.num_lines as usize;
    for band in &layout.bands {
        let max_r = 0.5 * band.rect.width().min(band.rect.height());
        let inner = 0.35 * max_r;
        let points = ((std::f64::consts::TAU * max_r) as usize).clamp(16, 360);
        let env = Envelope::build(samples, points, gain);
        let values = env.values();
        let center = band.center();
        let rot = rotation(band, cfg.rotation);
        let ring = (max_r - inner) / n_lines as f64;

        for (instance, shift) in layout.instance_shifts(band, cfg).into_iter().enumerate() {
            let xf = Affine::translate(shift) * rot;
            for line in 0..n_lines {
                let thickness = f64::from(cfg.line_thickness_px(line)) * layout.scale;
                let r0 = inner + line as f64 * ring * 0.5;
                let reach = (max_r - r0 - thickness / 2.0).max(0.0);
                let pts = values
                    .iter()
                    .enumerate()
                    .map(|(k, &c)| {
                        let theta = std::f64::consts::TAU * k as f64 / points as f64
                            - std::f64::consts::FRAC_PI_2;
                        let r = r0 + f64::from(c) * reach;
                        xf * Point::new(center.x + r * theta.cos(), center.y + r * theta.sin())
                    })
                    .collect();
                scene.shapes.push(Shape {
                    primitive: Primitive::Polyline {
                        points: pts,
                        closed: true,
                    },
                    color: cfg.effective_line_color(line),
                    thickness,
                    line,
                    instance,
                });
            }
        }
    }
    scene
}

/// Seeded particle field; positions drift with the frame index and radius follows amplitude.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleField {
    /// Per band: `(along, across, speed)` in band-relative units.
    seeds: Vec<Vec<(f64, f64, f64)>>,
}

impl ParticleField {
    pub fn new(cfg: &VisualizationConfig, bands: usize) -> Self {
        let mut rng = crate::viz::random::create_rng(cfg.seed);
        let seeds = (0..bands)
            .map(|_| {
                (0..PARTICLES_PER_BAND)
                    .map(|_| {
                        (
                            rng.gen_range(0.0..1.0),
                            rng.gen_range(0.05..0.95),
                            rng.gen_range(0.002..0.01),
                        )
                    })
                    .collect()
            })
            .collect();
        Self { seeds }
    }

    pub fn scene(
        &self,
        cfg: &VisualizationConfig,
        layout: &FrameLayout,
        frame_index: u64,
        samples: &[f32],
    ) -> Scene {
        let amplitude = AmplitudeSummary::of(samples)
            .amplitude(cfg.sensitivity, cfg.amplitude_multiplier)
            .clamp(0.0, 1.0);
        let mut scene = Scene {
            canvas: layout.canvas,
            output: layout.output,
            anti_alias: cfg.anti_alias,
            clip: layout.clip_rects(cfg),
            shapes: Vec::new(),
        };
        let n_lines = cfg.num_lines as usize;
        for (band, seeds) in layout.bands.iter().zip(&self.seeds) {
            let rot = rotation(band, cfg.rotation);
            for (instance, shift) in layout.instance_shifts(band, cfg).into_iter().enumerate() {
                let xf = Affine::translate(shift) * rot;
                for line in 0..n_lines {
                    let thickness = f64::from(cfg.line_thickness_px(line)) * layout.scale;
                    let centers = seeds
                        .iter()
                        .skip(line)
                        .step_by(n_lines)
                        .map(|&(u, v, speed)| {
                            let u = (u + speed * frame_index as f64).fract();
                            let p = match band.axis {
                                Axis::Horizontal => Point::new(
                                    band.rect.x0 + u * band.rect.width(),
                                    band.rect.y0 + v * band.rect.height(),
                                ),
                                Axis::Vertical => Point::new(
                                    band.rect.x0 + v * band.rect.width(),
                                    band.rect.y0 + u * band.rect.height(),
                                ),
                            };
                            xf * p
                        })
                        .collect();
                    scene.shapes.push(Shape {
                        primitive: Primitive::Dots {
                            centers,
                            radius: thickness / 2.0 * (1.0 + 3.0 * amplitude),
                        },
                        color: cfg.effective_line_color(line),
                        thickness,
                        line,
                        instance,
                    });
                }
            }
        }
        scene
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/styles.rs"]
mod tests;
