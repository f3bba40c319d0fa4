//! Filter-graph synthesis for each multi-input product.
//!
//! Input numbering is fixed per product and documented on each builder. Every graph ends in
//! [`OUT_LABEL`].

use kurbo::Rect;

use crate::foundation::core::Resolution;
use crate::foundation::error::WavecastResult;
use crate::render::layout::FrameLayout;
use crate::viz::config::VisualizationConfig;

pub const OUT_LABEL: &str = "[vout]";
/// Opacity of the waveform in the screen blend over a background.
pub const SCREEN_OPACITY: f64 = 0.7;
/// Saturation applied after the three-layer stack.
pub const SATURATION_BOOST: f64 = 1.3;
/// Side of the square avatar canvas relative to the shorter frame side.
pub const AVATAR_CANVAS_FRACTION: f64 = 0.75;

/// Axis-aligned pixel rectangle in output coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    pub fn full(res: Resolution) -> Self {
        Self {
            x: 0,
            y: 0,
            width: res.width,
            height: res.height,
        }
    }

    fn crop(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

/// Fixed square canvas the avatar is fitted and padded into.
pub fn avatar_canvas(res: Resolution) -> Resolution {
    let side = f64::from(res.width.min(res.height)) * AVATAR_CANVAS_FRACTION;
    let side = ((side / 2.0).floor() as u32 * 2).max(2);
    Resolution {
        width: side,
        height: side,
    }
}

/// Part of the output frame the waveform can occupy.
///
/// Unrotated, non-intersecting, non-centered layouts map to the union of their bands; anything
/// else may draw anywhere and gets the full frame.
pub fn waveform_region(cfg: &VisualizationConfig) -> WavecastResult<PixelRegion> {
    let layout = FrameLayout::new(cfg)?;
    let res = cfg.resolution;
    let union = layout
        .clip_rects(cfg)
        .and_then(|rects| rects.into_iter().reduce(|a, b| a.union(b)));
    let Some(union) = union else {
        return Ok(PixelRegion::full(res));
    };
    let r = Rect::new(
        union.x0 / layout.scale,
        union.y0 / layout.scale,
        union.x1 / layout.scale,
        union.y1 / layout.scale,
    );
    let x = (r.x0.floor().max(0.0) as u32).min(res.width.saturating_sub(2)) & !1;
    let y = (r.y0.floor().max(0.0) as u32).min(res.height.saturating_sub(2)) & !1;
    Ok(PixelRegion {
        x,
        y,
        width: even_span(x, r.x1.ceil() as u32, res.width),
        height: even_span(y, r.y1.ceil() as u32, res.height),
    })
}

fn even_span(start: u32, end: u32, limit: u32) -> u32 {
    let room = limit.saturating_sub(start) & !1;
    let span = end.min(limit).saturating_sub(start).max(2);
    (span + span % 2).min(room).max(2)
}

fn letterbox(input: &str, res: Resolution, out: &str) -> String {
    let (w, h) = (res.width, res.height);
    format!(
        "[{input}]scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1[{out}]"
    )
}

fn fit_avatar(input: &str, canvas: Resolution, out: &str) -> String {
    let (w, h) = (canvas.width, canvas.height);
    format!(
        "[{input}]scale={w}:{h}:force_original_aspect_ratio=decrease,format=rgba,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black@0,setsar=1[{out}]"
    )
}

fn full_frame(input: &str, res: Resolution, out: &str) -> String {
    format!(
        "[{input}]scale={}:{},setsar=1[{out}]",
        res.width, res.height
    )
}

const CENTER: &str = "(W-w)/2:(H-h)/2";

/// `0` = still image.
pub fn still_image(res: Resolution) -> String {
    letterbox("0:v", res, "vout")
}

/// `0` = background image, `1` = waveform video. Screen blend at [`SCREEN_OPACITY`].
pub fn waveform_over_background(res: Resolution) -> String {
    [
        letterbox("0:v", res, "bg"),
        full_frame("1:v", res, "wf"),
        "[bg]format=gbrp[bgp]".to_string(),
        "[wf]format=gbrp[wfp]".to_string(),
        format!(
            "[bgp][wfp]blend=all_mode=screen:all_opacity={SCREEN_OPACITY}:shortest=1,format=yuv420p{OUT_LABEL}"
        ),
    ]
    .join(";")
}

/// `0` = avatar video, `1` = background image.
pub fn avatar_over_background(res: Resolution) -> String {
    [
        letterbox("1:v", res, "bg"),
        fit_avatar("0:v", avatar_canvas(res), "av"),
        format!("[bg][av]overlay={CENTER}:shortest=1,format=yuv420p{OUT_LABEL}"),
    ]
    .join(";")
}

/// `0` = avatar video, `1` = waveform video.
pub fn avatar_with_waveform(res: Resolution) -> String {
    [
        full_frame("1:v", res, "wf"),
        fit_avatar("0:v", avatar_canvas(res), "av"),
        format!("[wf][av]overlay={CENTER}:shortest=1,format=yuv420p{OUT_LABEL}"),
    ]
    .join(";")
}

/// `0` = avatar video, `1` = background image, `2` = waveform video.
///
/// The waveform is cropped to `region`, keyed against pure black and laid over the
/// background+avatar composite at the region's origin.
pub fn full_stack(res: Resolution, region: PixelRegion, chroma_similarity: f64) -> String {
    [
        letterbox("1:v", res, "bg"),
        format!(
            "[2:v]scale={}:{},setsar=1,{},format=rgba,colorkey=0x000000:{chroma_similarity}:0.0[wf]",
            res.width,
            res.height,
            region.crop()
        ),
        fit_avatar("0:v", avatar_canvas(res), "av"),
        format!("[bg][av]overlay={CENTER}:shortest=1[base]"),
        format!(
            "[base][wf]overlay={}:{}:shortest=1,eq=saturation={SATURATION_BOOST},format=yuv420p{OUT_LABEL}",
            region.x, region.y
        ),
    ]
    .join(";")
}

#[cfg(test)]
#[path = "../../tests/unit/compose/filter.rs"]
mod tests;
