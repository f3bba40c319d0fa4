use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::foundation::core::Rgb8;
use crate::viz::config::{LineThickness, VisualizationConfig, WaveformStyle};

const NEON_PALETTE: [Rgb8; 8] = [
    Rgb8::new(0, 255, 255),
    Rgb8::new(255, 0, 255),
    Rgb8::new(0, 255, 128),
    Rgb8::new(255, 64, 160),
    Rgb8::new(128, 96, 255),
    Rgb8::new(255, 200, 0),
    Rgb8::new(64, 160, 255),
    Rgb8::new(255, 96, 64),
];

const STYLES: [WaveformStyle; 4] = [
    WaveformStyle::Continuous,
    WaveformStyle::Bars,
    WaveformStyle::Dots,
    WaveformStyle::Filled,
];

pub(crate) fn create_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Resample the bounded visual fields of `cfg` from its seed.
///
/// Geometry that callers pin explicitly (position, orientation, rotation, instances) is kept.
pub(crate) fn randomize(cfg: &mut VisualizationConfig) {
    let mut rng = create_rng(cfg.seed);

    let primary = NEON_PALETTE[rng.gen_range(0..NEON_PALETTE.len())];
    let mut secondary = NEON_PALETTE[rng.gen_range(0..NEON_PALETTE.len())];
    if secondary == primary {
        secondary = Rgb8::new(255 - primary.r, 255 - primary.g, 255 - primary.b);
    }

    let num_lines: u32 = rng.gen_range(1..=4);
    let colors = (0..num_lines)
        .map(|i| lerp_color(primary, secondary, f64::from(i) / f64::from(num_lines.max(2) - 1)))
        .collect::<Vec<_>>();

    cfg.primary_color = primary;
    cfg.secondary_color = secondary;
    cfg.num_lines = num_lines;
    cfg.line_colors = Some(colors);
    cfg.line_thickness = LineThickness::Uniform(rng.gen_range(2..=8));
    cfg.height_percent = rng.gen_range(15..=40);
    cfg.waveform_style = STYLES[rng.gen_range(0..STYLES.len())];
    cfg.opacity = rng.gen_range(0.7..=1.0);
}

fn lerp_color(a: Rgb8, b: Rgb8, t: f64) -> Rgb8 {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    Rgb8::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}

#[cfg(test)]
#[path = "../../tests/unit/viz/random.rs"]
mod tests;
