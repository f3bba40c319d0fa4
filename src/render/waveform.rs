use kurbo::{Affine, Point, Vec2};

use crate::render::envelope::{AmplitudeSummary, Envelope, point_count};
use crate::render::layout::{Anchor, Band, Baseline, FrameLayout, line_offsets, resolve_baseline, rotation};
use crate::render::raster::{Primitive, Scene, Shape};
use crate::viz::config::{Axis, VisualizationConfig, WaveformStyle};

/// Minimum envelope, as a fraction of band width, for audible frames on vertical bands.
pub const VERTICAL_MIN_FRACTION: f32 = 0.1;

/// Build the scene for one waveform frame.
pub fn waveform_scene(cfg: &VisualizationConfig, layout: &FrameLayout, samples: &[f32]) -> Scene {
    let amplitude =
        AmplitudeSummary::of(samples).amplitude(cfg.sensitivity, cfg.amplitude_multiplier);
    let gain = cfg.amplitude_multiplier;
    profile_scene(cfg, layout, amplitude, cfg.waveform_style, None, |band| {
        Envelope::build(samples, point_count(band.length() as u32), gain)
    })
}

/// Lay out one envelope per band, replicated over lines and instances.
///
/// `bar_width` overrides the per-line thickness for [`WaveformStyle::Bars`].
pub(crate) fn profile_scene(
    cfg: &VisualizationConfig,
    layout: &FrameLayout,
    amplitude: f64,
    style: WaveformStyle,
    bar_width: Option<f64>,
    envelope_for: impl Fn(&Band) -> Envelope,
) -> Scene {
    let mut scene = Scene {
        canvas: layout.canvas,
        output: layout.output,
        anti_alias: cfg.anti_alias,
        clip: layout.clip_rects(cfg),
        shapes: Vec::new(),
    };
    let num_lines = cfg.num_lines as usize;

    for band in &layout.bands {
        let mut env = envelope_for(band);
        let silent = amplitude <= 0.0 || env.is_silent();
        if band.axis == Axis::Vertical && !silent {
            env = env.with_floor(VERTICAL_MIN_FRACTION);
        }
        let baseline = resolve_baseline(band, layout.canvas, f64::from(env.midpoint()), silent);
        let offsets = line_offsets(
            num_lines,
            band.extent(),
            &baseline,
            band.anchor != Anchor::Dynamic,
        );
        let profile = match style {
            WaveformStyle::Continuous | WaveformStyle::Filled => {
                env.interpolate(band.length().round().max(2.0) as usize)
            }
            WaveformStyle::Bars | WaveformStyle::Dots => env.values().to_vec(),
        };
        let rot = rotation(band, cfg.rotation);

        for (instance, shift) in layout.instance_shifts(band, cfg).into_iter().enumerate() {
            let xf = Affine::translate(shift) * rot;
            for (line, &offset) in offsets.iter().enumerate() {
                let thickness = match (style, bar_width) {
                    (WaveformStyle::Bars, Some(w)) => w,
                    _ => f64::from(cfg.line_thickness_px(line)) * layout.scale,
                };
                let geom = LineGeometry {
                    band,
                    baseline,
                    offset,
                    xf,
                };
                scene.shapes.push(Shape {
                    primitive: geom.primitive(style, &profile, thickness),
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

struct LineGeometry<'a> {
    band: &'a Band,
    baseline: Baseline,
    offset: f64,
    xf: Affine,
}

impl LineGeometry<'_> {
    /// Canvas point for sample `k` of `n` at envelope value `c`.
    fn point(&self, k: usize, n: usize, c: f64) -> Point {
        let across = self.baseline.at(c) + self.offset;
        let along_len = self.band.length();
        let p = match self.band.axis {
            Axis::Horizontal => {
                let x = self.band.rect.x0 + (k as f64 + 0.5) * along_len / n as f64;
                Point::new(x, across)
            }
            Axis::Vertical => {
                let y = self.band.rect.y0 + (k as f64 + 0.5) * along_len / n as f64;
                Point::new(across, y)
            }
        };
        self.xf * p
    }

    /// Unit vector in which amplitude grows, after transformation.
    fn growth(&self) -> Vec2 {
        let v = match self.band.axis {
            Axis::Horizontal => Vec2::new(0.0, self.baseline.direction),
            Axis::Vertical => Vec2::new(self.baseline.direction, 0.0),
        };
        let o = self.xf * Point::ORIGIN;
        (self.xf * v.to_point()) - o
    }

    fn primitive(&self, style: WaveformStyle, profile: &[f32], thickness: f64) -> Primitive {
        let n = profile.len().max(1);
        let env = |k: usize| self.point(k, n, f64::from(profile[k]));
        let base = |k: usize| self.point(k, n, 0.0);
        match style {
            WaveformStyle::Continuous => Primitive::Polyline {
                points: (0..profile.len()).map(env).collect(),
                closed: false,
            },
            WaveformStyle::Bars => {
                let g = self.growth() * 0.5;
                Primitive::Segments(
                    (0..profile.len())
                        .map(|k| (base(k) - g, env(k) + g))
                        .collect(),
                )
            }
            WaveformStyle::Dots => Primitive::Dots {
                centers: (0..profile.len()).map(env).collect(),
                radius: thickness / 2.0,
            },
            WaveformStyle::Filled => {
                let mut points: Vec<Point> = (0..profile.len()).map(env).collect();
                if let Some(last) = profile.len().checked_sub(1) {
                    points.push(base(last));
                    points.push(base(0));
                }
                Primitive::Polygon(points)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/waveform.rs"]
mod tests;
