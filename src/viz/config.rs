use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use crate::foundation::core::{Fps, Resolution, Rgb8};
use crate::foundation::error::{WavecastError, WavecastResult};

/// Maximum number of independent lines per waveform.
pub const MAX_LINES: u32 = 10;

/// Tolerance (in offset percent) inside which `orientation_offset` counts as centered.
pub const CENTER_TOLERANCE: f64 = 1.0;

/// Frame producer family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationStyle {
    #[default]
    Waveform,
    Spectrum,
    Circular,
    Particles,
}

impl FromStr for VisualizationStyle {
    type Err = WavecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waveform" => Ok(Self::Waveform),
            "spectrum" => Ok(Self::Spectrum),
            "circular" => Ok(Self::Circular),
            "particles" => Ok(Self::Particles),
            other => Err(WavecastError::config_invalid(format!(
                "unknown visualization style '{other}'"
            ))),
        }
    }
}

/// Frame edge (or center) a waveform band is anchored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    Bottom,
    Middle,
    Left,
    Right,
}

impl Position {
    /// Axis used when orientation is `auto`.
    pub fn natural_axis(self) -> Axis {
        match self {
            Self::Top | Self::Bottom | Self::Middle => Axis::Horizontal,
            Self::Left | Self::Right => Axis::Vertical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Middle => "middle",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl FromStr for Position {
    type Err = WavecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "middle" | "center" => Ok(Self::Middle),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(WavecastError::config_invalid(format!(
                "unknown position '{other}' (expected top, bottom, middle, left or right)"
            ))),
        }
    }
}

/// Requested orientation; `auto` derives it from the position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Auto,
    Horizontal,
    Vertical,
}

impl FromStr for Orientation {
    type Err = WavecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            other => Err(WavecastError::config_invalid(format!(
                "unknown orientation '{other}'"
            ))),
        }
    }
}

/// Resolved waveform axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Time runs along x, amplitude along y.
    Horizontal,
    /// Time runs along y, amplitude along x.
    Vertical,
}

/// How each polyline is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformStyle {
    #[default]
    Continuous,
    Bars,
    Dots,
    Filled,
}

impl FromStr for WaveformStyle {
    type Err = WavecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" | "line" => Ok(Self::Continuous),
            "bars" => Ok(Self::Bars),
            "dots" => Ok(Self::Dots),
            "filled" => Ok(Self::Filled),
            other => Err(WavecastError::config_invalid(format!(
                "unknown waveform style '{other}'"
            ))),
        }
    }
}

/// Line thickness in output pixels, either one value for every line or one per line.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LineThickness {
    Uniform(u32),
    PerLine(Vec<u32>),
}

impl Default for LineThickness {
    fn default() -> Self {
        Self::Uniform(4)
    }
}

impl LineThickness {
    /// Thickness for line `line`; single-entry lists broadcast.
    pub fn for_line(&self, line: usize) -> u32 {
        match self {
            Self::Uniform(t) => *t,
            Self::PerLine(v) if v.len() == 1 => v[0],
            Self::PerLine(v) => v.get(line).copied().or(v.last().copied()).unwrap_or(1),
        }
    }
}

/// Immutable description of how a waveform is rendered.
///
/// Construct with [`VisualizationConfig::default`] or JSON ([`VisualizationConfig::from_path`]),
/// apply overrides, then call [`VisualizationConfig::resolve`] once to obtain the effective record.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub resolution: Resolution,
    pub fps: u32,
    pub style: VisualizationStyle,
    pub primary_color: Rgb8,
    pub secondary_color: Rgb8,
    pub background_color: Rgb8,
    pub sensitivity: f64,
    pub amplitude_multiplier: f64,
    pub render_scale: f64,
    pub anti_alias: bool,
    pub num_lines: u32,
    pub line_thickness: LineThickness,
    pub line_colors: Option<Vec<Rgb8>>,
    /// Comma-separated subset of `top,bottom,middle,left,right`.
    pub position: String,
    pub orientation: Orientation,
    pub height_percent: u32,
    pub width_percent: u32,
    pub left_spacing: u32,
    pub right_spacing: u32,
    /// 0 = bottom, 100 = top, ~50 = centered with a dynamic baseline.
    pub orientation_offset: Option<f64>,
    /// Degrees, applied around the band center.
    pub rotation: f64,
    pub num_instances: u32,
    pub instances_offset: u32,
    pub instances_intersect: bool,
    pub opacity: f64,
    pub waveform_style: WaveformStyle,
    pub randomize: bool,
    /// Seed for `randomize`; identical seeds give identical configs.
    pub seed: u64,
    /// Chroma-key similarity used when this waveform is keyed over other layers.
    pub chroma_similarity: f64,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 1280,
                height: 720,
            },
            fps: 30,
            style: VisualizationStyle::Waveform,
            primary_color: Rgb8::new(0, 255, 255),
            secondary_color: Rgb8::new(255, 0, 255),
            background_color: Rgb8::BLACK,
            sensitivity: 1.0,
            amplitude_multiplier: 1.0,
            render_scale: 2.0,
            anti_alias: true,
            num_lines: 1,
            line_thickness: LineThickness::default(),
            line_colors: None,
            position: "bottom".to_string(),
            orientation: Orientation::Auto,
            height_percent: 25,
            width_percent: 15,
            left_spacing: 0,
            right_spacing: 0,
            orientation_offset: None,
            rotation: 0.0,
            num_instances: 1,
            instances_offset: 0,
            instances_intersect: false,
            opacity: 1.0,
            waveform_style: WaveformStyle::Continuous,
            randomize: false,
            seed: 0,
            chroma_similarity: 0.05,
        }
    }
}

impl VisualizationConfig {
    /// Parse a config from a JSON reader. Missing fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> WavecastResult<Self> {
        serde_json::from_reader(r).map_err(|e| {
            WavecastError::config_invalid(format!("parse visualization config JSON: {e}"))
        })
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> WavecastResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            WavecastError::input_missing(format!(
                "open visualization config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Normalize, randomize (if requested) and validate. The result is the effective config.
    pub fn resolve(self) -> WavecastResult<Self> {
        let mut cfg = self.normalized();
        if cfg.randomize {
            crate::viz::random::randomize(&mut cfg);
            cfg = cfg.normalized();
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Clamp numeric fields to their nearest valid value.
    pub fn normalized(mut self) -> Self {
        self.num_lines = self.num_lines.clamp(1, MAX_LINES);
        self.height_percent = self.height_percent.clamp(10, 100);
        self.width_percent = self.width_percent.clamp(10, 100);
        self.opacity = finite_or(self.opacity, 1.0).clamp(0.0, 1.0);
        self.render_scale = finite_or(self.render_scale, 1.0).max(1.0);
        self.sensitivity = positive_or(self.sensitivity, 1.0);
        self.amplitude_multiplier = positive_or(self.amplitude_multiplier, 1.0);
        self.rotation = finite_or(self.rotation, 0.0);
        self.orientation_offset = self
            .orientation_offset
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 100.0));
        self.num_instances = self.num_instances.max(1);
        self.chroma_similarity = finite_or(self.chroma_similarity, 0.05).clamp(0.0, 1.0);
        self
    }

    /// Reject values that cannot be normalized.
    pub fn validate(&self) -> WavecastResult<()> {
        Resolution::new(self.resolution.width, self.resolution.height)?;
        if self.resolution.width > u32::from(u16::MAX) || self.resolution.height > u32::from(u16::MAX)
        {
            return Err(WavecastError::config_invalid(
                "resolution exceeds the rasterizer limit of 65535 pixels per side",
            ));
        }
        if self.fps == 0 {
            return Err(WavecastError::config_invalid("fps must be > 0"));
        }
        if !(1..=MAX_LINES).contains(&self.num_lines) {
            return Err(WavecastError::config_invalid(format!(
                "num_lines must be in [1, {MAX_LINES}], got {}",
                self.num_lines
            )));
        }
        self.positions()?;

        let n = self.num_lines as usize;
        if let LineThickness::PerLine(v) = &self.line_thickness {
            if v.is_empty() || (v.len() != 1 && v.len() != n) {
                return Err(WavecastError::config_invalid(format!(
                    "line_thickness has {} entries but num_lines is {n}",
                    v.len()
                )));
            }
            if v.contains(&0) {
                return Err(WavecastError::config_invalid(
                    "line_thickness entries must be > 0",
                ));
            }
        } else if self.line_thickness.for_line(0) == 0 {
            return Err(WavecastError::config_invalid("line_thickness must be > 0"));
        }
        if let Some(colors) = &self.line_colors
            && (colors.is_empty() || (colors.len() != 1 && colors.len() != n))
        {
            return Err(WavecastError::config_invalid(format!(
                "line_colors has {} entries but num_lines is {n}",
                colors.len()
            )));
        }

        let scaled_w = (f64::from(self.resolution.width) * self.render_scale).round();
        let scaled_h = (f64::from(self.resolution.height) * self.render_scale).round();
        if scaled_w > f64::from(u16::MAX) || scaled_h > f64::from(u16::MAX) {
            return Err(WavecastError::config_invalid(format!(
                "render_scale {} makes the supersampled canvas exceed 65535 pixels per side",
                self.render_scale
            )));
        }
        Ok(())
    }

    pub fn fps(&self) -> WavecastResult<Fps> {
        Fps::integer(self.fps)
    }

    /// Parsed, de-duplicated position tokens in declaration order.
    pub fn positions(&self) -> WavecastResult<Vec<Position>> {
        parse_positions(&self.position)
    }

    /// Axis for a given position token after applying the orientation rule.
    pub fn axis_for(&self, position: Position) -> Axis {
        match self.orientation {
            Orientation::Auto => position.natural_axis(),
            Orientation::Horizontal => Axis::Horizontal,
            Orientation::Vertical => Axis::Vertical,
        }
    }

    /// `orientation_offset` within [`CENTER_TOLERANCE`] of 50.
    pub fn is_centered(&self) -> bool {
        self.orientation_offset
            .is_some_and(|o| (o - 50.0).abs() <= CENTER_TOLERANCE)
    }

    /// Base color for a line before opacity.
    pub fn line_color(&self, line: usize) -> Rgb8 {
        match &self.line_colors {
            Some(v) if v.len() == 1 => v[0],
            Some(v) => v.get(line).copied().unwrap_or(self.primary_color),
            None => self.primary_color,
        }
    }

    /// Line color scaled by `opacity` (over black, scaling is equivalent to alpha blending).
    pub fn effective_line_color(&self, line: usize) -> Rgb8 {
        self.line_color(line).scaled(self.opacity)
    }

    pub fn line_thickness_px(&self, line: usize) -> u32 {
        self.line_thickness.for_line(line).max(1)
    }

    /// Supersampled canvas size.
    pub fn supersampled(&self) -> Resolution {
        let w = (f64::from(self.resolution.width) * self.render_scale).round() as u32;
        let h = (f64::from(self.resolution.height) * self.render_scale).round() as u32;
        Resolution {
            width: w.max(1),
            height: h.max(1),
        }
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

fn positive_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { fallback }
}

/// Parse a comma-separated position list such as `bottom,left`.
pub fn parse_positions(s: &str) -> WavecastResult<Vec<Position>> {
    let mut out = Vec::new();
    for tok in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let p: Position = tok.parse()?;
        if !out.contains(&p) {
            out.push(p);
        }
    }
    if out.is_empty() {
        return Err(WavecastError::config_invalid(
            "position must name at least one of top, bottom, middle, left, right",
        ));
    }
    Ok(out)
}

/// Parse a single `r,g,b` color.
pub fn parse_color(s: &str) -> WavecastResult<Rgb8> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(WavecastError::config_invalid(format!(
            "color '{s}' must have three components r,g,b"
        )));
    }
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        *slot = part.parse::<u8>().map_err(|e| {
            WavecastError::config_invalid(format!("color component '{part}' in '{s}': {e}"))
        })?;
    }
    Ok(Rgb8::from(rgb))
}

/// Parse a colon-separated color list: `r,g,b:r,g,b:...`.
pub fn parse_color_list(s: &str) -> WavecastResult<Vec<Rgb8>> {
    let colors = s
        .split(':')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_color)
        .collect::<WavecastResult<Vec<_>>>()?;
    if colors.is_empty() {
        return Err(WavecastError::config_invalid("color list is empty"));
    }
    Ok(colors)
}

/// Parse a thickness flag: either `8` or `6,4,...`.
pub fn parse_thickness(s: &str) -> WavecastResult<LineThickness> {
    let values = s
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<u32>().map_err(|e| {
                WavecastError::config_invalid(format!("line thickness '{t}': {e}"))
            })
        })
        .collect::<WavecastResult<Vec<_>>>()?;
    match values.as_slice() {
        [] => Err(WavecastError::config_invalid("line thickness is empty")),
        [one] => Ok(LineThickness::Uniform(*one)),
        _ => Ok(LineThickness::PerLine(values)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/viz/config.rs"]
mod tests;
