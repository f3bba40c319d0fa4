//! Band geometry: where each waveform lives on the supersampled canvas.

use kurbo::{Affine, Point, Rect, Vec2};

use crate::foundation::core::Resolution;
use crate::foundation::error::WavecastResult;
use crate::viz::config::{Axis, Position, VisualizationConfig};

/// Fraction of the band extent spread across all lines.
const LINE_SPREAD: f64 = 0.9;

/// Edge a band's amplitude grows away from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// Baseline on the band's top edge, amplitude extends downward.
    Top,
    /// Baseline on the band's bottom edge, amplitude extends upward.
    Bottom,
    /// Baseline on the band's left edge, amplitude extends right.
    Left,
    /// Baseline on the band's right edge, amplitude extends left.
    Right,
    /// Baseline picked per frame from the envelope midpoint.
    Dynamic,
}

/// One waveform region on the supersampled canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Band {
    pub position: Position,
    pub axis: Axis,
    pub rect: Rect,
    pub anchor: Anchor,
}

impl Band {
    /// Size across the band (height for horizontal, width for vertical).
    pub fn extent(&self) -> f64 {
        match self.axis {
            Axis::Horizontal => self.rect.height(),
            Axis::Vertical => self.rect.width(),
        }
    }

    /// Size along the time axis.
    pub fn length(&self) -> f64 {
        match self.axis {
            Axis::Horizontal => self.rect.width(),
            Axis::Vertical => self.rect.height(),
        }
    }

    pub fn center(&self) -> Point {
        self.rect.center()
    }

    /// Unit vector pointing from the anchored edge into the frame.
    pub fn inward(&self) -> Vec2 {
        match self.anchor {
            Anchor::Top => Vec2::new(0.0, 1.0),
            Anchor::Bottom | Anchor::Dynamic => Vec2::new(0.0, -1.0),
            Anchor::Left => Vec2::new(1.0, 0.0),
            Anchor::Right => Vec2::new(-1.0, 0.0),
        }
    }
}

/// Per-frame baseline: amplitude `c` in `[0, 1]` maps to `origin + direction * c * reach`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Baseline {
    /// Coordinate on the band-orthogonal axis (y for horizontal, x for vertical).
    pub origin: f64,
    /// +1 or -1.
    pub direction: f64,
    /// `extent - 1`.
    pub reach: f64,
}

impl Baseline {
    pub fn at(&self, c: f64) -> f64 {
        self.origin + self.direction * c * self.reach
    }
}

/// Bands, canvas and scale shared by every frame of one job.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameLayout {
    pub canvas: Resolution,
    pub output: Resolution,
    pub scale: f64,
    pub bands: Vec<Band>,
    pub centered: bool,
}

impl FrameLayout {
    pub fn new(cfg: &VisualizationConfig) -> WavecastResult<Self> {
        let canvas = cfg.supersampled();
        let scale = f64::from(canvas.width) / f64::from(cfg.resolution.width);
        let centered = cfg.is_centered();
        let bands = cfg
            .positions()?
            .into_iter()
            .map(|p| band_for(cfg, canvas, scale, p, centered))
            .collect();
        Ok(Self {
            canvas,
            output: cfg.resolution,
            scale,
            bands,
            centered,
        })
    }

    pub fn canvas_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.canvas.width),
            f64::from(self.canvas.height),
        )
    }

    /// Translation of each instance of `band`.
    ///
    /// Instances move away from the anchored edge by `instances_offset` output pixels each. Unless
    /// `instances_intersect` is set, the shift stops at the frame edge.
    pub fn instance_shifts(&self, band: &Band, cfg: &VisualizationConfig) -> Vec<Vec2> {
        let step = f64::from(cfg.instances_offset) * self.scale;
        let dir = band.inward();
        let frame = self.canvas_rect();
        let room = match band.anchor {
            Anchor::Top => frame.y1 - band.rect.y1,
            Anchor::Bottom | Anchor::Dynamic => band.rect.y0 - frame.y0,
            Anchor::Left => frame.x1 - band.rect.x1,
            Anchor::Right => band.rect.x0 - frame.x0,
        }
        .max(0.0);
        (0..cfg.num_instances)
            .map(|i| {
                let d = f64::from(i) * step;
                let d = if cfg.instances_intersect { d } else { d.min(room) };
                dir * d
            })
            .collect()
    }

    /// Regions outside of which drawing is discarded, or `None` when the whole canvas is allowed.
    ///
    /// Clipping only applies to unrotated, non-centered, non-intersecting layouts, where every
    /// shape is known to stay inside its (shifted) band.
    pub fn clip_rects(&self, cfg: &VisualizationConfig) -> Option<Vec<Rect>> {
        if cfg.rotation.rem_euclid(360.0) != 0.0 || cfg.instances_intersect || self.centered {
            return None;
        }
        let frame = self.canvas_rect();
        let mut out = Vec::new();
        for band in &self.bands {
            for shift in self.instance_shifts(band, cfg) {
                let r = (band.rect + shift).intersect(frame);
                if r.area() > 0.0 {
                    out.push(r);
                }
            }
        }
        Some(out)
    }
}

fn band_for(
    cfg: &VisualizationConfig,
    canvas: Resolution,
    scale: f64,
    position: Position,
    centered: bool,
) -> Band {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let axis = cfg.axis_for(position);
    match axis {
        Axis::Horizontal => {
            let band = (h * f64::from(cfg.height_percent) / 100.0).round().max(1.0);
            let y0 = match cfg.orientation_offset {
                Some(off) => ((h - band) * (1.0 - off / 100.0)).round(),
                None => match position {
                    Position::Top => 0.0,
                    Position::Bottom => h - band,
                    _ => ((h - band) / 2.0).round(),
                },
            };
            let anchor = if centered {
                Anchor::Dynamic
            } else if cfg.orientation_offset.is_some_and(|o| o > 50.0)
                || (cfg.orientation_offset.is_none() && position == Position::Top)
            {
                Anchor::Top
            } else {
                Anchor::Bottom
            };
            Band {
                position,
                axis,
                rect: Rect::new(0.0, y0, w, y0 + band),
                anchor,
            }
        }
        Axis::Vertical => {
            let band = (w * f64::from(cfg.width_percent) / 100.0).round().max(1.0);
            let left = f64::from(cfg.left_spacing) * scale;
            let right = f64::from(cfg.right_spacing) * scale;
            let (x0, anchor) = match position {
                Position::Left => (left, Anchor::Left),
                Position::Right => (w - band - right, Anchor::Right),
                _ => (((w - band) / 2.0).round(), Anchor::Left),
            };
            let x0 = x0.clamp(0.0, (w - band).max(0.0));
            Band {
                position,
                axis,
                rect: Rect::new(x0, 0.0, x0 + band, h),
                anchor,
            }
        }
    }
}

/// Baseline for `band` on the current frame.
///
/// For [`Anchor::Dynamic`] the envelope midpoint chooses a frame edge: above one half the
/// baseline sits on the bottom row and grows upward, otherwise on the top row growing downward.
/// A silent frame sits on the band center.
pub fn resolve_baseline(band: &Band, canvas: Resolution, midpoint: f64, silent: bool) -> Baseline {
    let reach = (band.extent() - 1.0).max(0.0);
    let r = band.rect;
    let (origin, direction) = match band.anchor {
        Anchor::Top => (r.y0, 1.0),
        Anchor::Bottom => (r.y1 - 1.0, -1.0),
        Anchor::Left => (r.x0, 1.0),
        Anchor::Right => (r.x1 - 1.0, -1.0),
        Anchor::Dynamic if silent => (band.center().y, -1.0),
        Anchor::Dynamic if midpoint > 0.5 => (f64::from(canvas.height) - 1.0, -1.0),
        Anchor::Dynamic => (0.0, 1.0),
    };
    Baseline {
        origin,
        direction,
        reach,
    }
}

/// Band-orthogonal offsets of `n` lines.
///
/// Lines are `0.9 * extent / n` apart and centered on the baseline. Edge-anchored baselines push
/// the whole group inward so every line starts inside the band.
pub fn line_offsets(n: usize, extent: f64, baseline: &Baseline, edge_anchored: bool) -> Vec<f64> {
    let n = n.max(1);
    let spacing = LINE_SPREAD * extent / n as f64;
    let half_span = (n - 1) as f64 * spacing / 2.0;
    (0..n)
        .map(|l| {
            let centered = l as f64 * spacing - half_span;
            if edge_anchored {
                centered + baseline.direction * half_span
            } else {
                centered
            }
        })
        .collect()
}

/// Rotation by `degrees` about the band center.
pub fn rotation(band: &Band, degrees: f64) -> Affine {
    if degrees == 0.0 {
        return Affine::IDENTITY;
    }
    Affine::rotate_about(degrees.to_radians(), band.center())
}

#[cfg(test)]
#[path = "../../tests/unit/render/layout.rs"]
mod tests;
