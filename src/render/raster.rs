use kurbo::{BezPath, Point, Rect, Shape as _};

use crate::foundation::core::{Resolution, Rgb8};
use crate::foundation::error::{WavecastError, WavecastResult};
use crate::foundation::math::{premul_rgba_to_rgb_over_black, threshold_premul_alpha};
use crate::render::frame::Frame;

/// Geometry of one drawable, in supersampled canvas coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// Stroked polyline, optionally closed.
    Polyline { points: Vec<Point>, closed: bool },
    /// Independent stroked segments with butt caps.
    Segments(Vec<(Point, Point)>),
    /// Filled disks.
    Dots { centers: Vec<Point>, radius: f64 },
    /// Filled closed polygon.
    Polygon(Vec<Point>),
}

/// A colored primitive tagged with the line and instance it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub primitive: Primitive,
    pub color: Rgb8,
    /// Stroke width in canvas pixels.
    pub thickness: f64,
    pub line: usize,
    pub instance: usize,
}

/// Everything needed to rasterize one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub canvas: Resolution,
    pub output: Resolution,
    pub anti_alias: bool,
    /// Drawing outside these canvas rectangles is discarded.
    pub clip: Option<Vec<Rect>>,
    pub shapes: Vec<Shape>,
}

impl Scene {
    pub fn empty(canvas: Resolution, output: Resolution, anti_alias: bool) -> Self {
        Self {
            canvas,
            output,
            anti_alias,
            clip: None,
            shapes: Vec::new(),
        }
    }
}

/// CPU rasterizer that turns a [`Scene`] into an RGB24 [`Frame`].
///
/// Renders premultiplied RGBA on the supersampled canvas, clips, downsamples with Lanczos3, then
/// flattens over black. The render context is reused between frames of equal canvas size.
#[derive(Default)]
pub struct Rasterizer {
    ctx: Option<vello_cpu::RenderContext>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rasterize(&mut self, scene: &Scene) -> WavecastResult<Frame> {
        if scene.shapes.is_empty() {
            return Ok(Frame::black(scene.output));
        }
        let (w, h) = dims_u16(scene.canvas)?;

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        for shape in &scene.shapes {
            draw_shape(&mut ctx, shape);
        }
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        let mut rgba = pixmap.data_as_u8_slice().to_vec();
        if let Some(rects) = &scene.clip {
            clear_outside(&mut rgba, scene.canvas, &pixel_boxes(rects, 1.0));
        }

        let mut rgba = if scene.canvas == scene.output {
            rgba
        } else {
            let mut small = downsample(rgba, scene.canvas, scene.output)?;
            if let Some(rects) = &scene.clip {
                let k = f64::from(scene.output.width) / f64::from(scene.canvas.width);
                clear_outside(&mut small, scene.output, &pixel_boxes(rects, k));
            }
            small
        };

        if !scene.anti_alias {
            threshold_premul_alpha(&mut rgba);
        }
        let mut rgb = vec![0u8; scene.output.rgb24_len()];
        premul_rgba_to_rgb_over_black(&mut rgb, &rgba);
        Frame::from_rgb24(scene.output, rgb)
    }
}

fn dims_u16(res: Resolution) -> WavecastResult<(u16, u16)> {
    let w = u16::try_from(res.width)
        .map_err(|_| WavecastError::config_invalid("canvas width exceeds 65535"))?;
    let h = u16::try_from(res.height)
        .map_err(|_| WavecastError::config_invalid("canvas height exceeds 65535"))?;
    Ok((w, h))
}

fn draw_shape(ctx: &mut vello_cpu::RenderContext, shape: &Shape) {
    use vello_cpu::kurbo::{Cap, Join, Stroke};

    let c = shape.color;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, 255));
    let width = shape.thickness.max(1.0);

    match &shape.primitive {
        Primitive::Polyline { points, closed } => {
            if points.len() < 2 {
                return;
            }
            let mut path = BezPath::new();
            path.move_to(points[0]);
            for &p in &points[1..] {
                path.line_to(p);
            }
            if *closed {
                path.close_path();
            }
            ctx.set_stroke(
                Stroke::new(width)
                    .with_caps(Cap::Round)
                    .with_join(Join::Round),
            );
            ctx.stroke_path(&bezpath_to_cpu(&path));
        }
        Primitive::Segments(pairs) => {
            if pairs.is_empty() {
                return;
            }
            let mut path = BezPath::new();
            for &(a, b) in pairs {
                path.move_to(a);
                path.line_to(b);
            }
            ctx.set_stroke(Stroke::new(width).with_caps(Cap::Butt));
            ctx.stroke_path(&bezpath_to_cpu(&path));
        }
        Primitive::Dots { centers, radius } => {
            if centers.is_empty() || *radius <= 0.0 {
                return;
            }
            let mut path = BezPath::new();
            for &c in centers {
                path.extend(kurbo::Circle::new(c, *radius).path_elements(0.1));
            }
            ctx.fill_path(&bezpath_to_cpu(&path));
        }
        Primitive::Polygon(points) => {
            if points.len() < 3 {
                return;
            }
            let mut path = BezPath::new();
            path.move_to(points[0]);
            for &p in &points[1..] {
                path.line_to(p);
            }
            path.close_path();
            ctx.fill_path(&bezpath_to_cpu(&path));
        }
    }
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Integer pixel box `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelBox {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

fn pixel_boxes(rects: &[Rect], k: f64) -> Vec<PixelBox> {
    rects
        .iter()
        .map(|r| PixelBox {
            x0: (r.x0 * k).floor().max(0.0) as u32,
            y0: (r.y0 * k).floor().max(0.0) as u32,
            x1: (r.x1 * k).ceil().max(0.0) as u32,
            y1: (r.y1 * k).ceil().max(0.0) as u32,
        })
        .collect()
}

/// Zero every RGBA pixel that lies outside all `boxes`.
fn clear_outside(rgba: &mut [u8], res: Resolution, boxes: &[PixelBox]) {
    let w = res.width as usize;
    let mut keep = vec![false; w];
    for (y, row) in rgba.chunks_exact_mut(w * 4).enumerate() {
        let y = y as u32;
        keep.fill(false);
        for b in boxes.iter().filter(|b| b.y0 <= y && y < b.y1) {
            let x1 = (b.x1 as usize).min(w);
            for k in keep.iter_mut().take(x1).skip(b.x0 as usize) {
                *k = true;
            }
        }
        for (px, &k) in row.chunks_exact_mut(4).zip(&keep) {
            if !k {
                px.fill(0);
            }
        }
    }
}

fn downsample(rgba: Vec<u8>, from: Resolution, to: Resolution) -> WavecastResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(from.width, from.height, rgba).ok_or_else(|| {
        WavecastError::Other(anyhow::anyhow!(
            "canvas buffer does not match {}",
            from.ffmpeg_size()
        ))
    })?;
    let small = image::imageops::resize(
        &img,
        to.width,
        to.height,
        image::imageops::FilterType::Lanczos3,
    );
    Ok(small.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
