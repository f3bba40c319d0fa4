use crate::foundation::error::{WavecastError, WavecastResult};

/// Absolute 0-based video frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> WavecastResult<Self> {
        if den == 0 {
            return Err(WavecastError::config_invalid("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(WavecastError::config_invalid("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Integer frame rate.
    pub fn integer(num: u32) -> WavecastResult<Self> {
        Self::new(num, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }

    /// `num/den` form accepted by ffmpeg's `-r`.
    pub fn ffmpeg_rate(self) -> String {
        format!("{}/{}", self.num, self.den)
    }
}

/// Output frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution; both sides must be non-zero.
    pub fn new(width: u32, height: u32) -> WavecastResult<Self> {
        if width == 0 || height == 0 {
            return Err(WavecastError::config_invalid(
                "resolution width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Byte length of one packed RGB24 frame.
    pub fn rgb24_len(self) -> usize {
        self.pixel_count().saturating_mul(3)
    }

    /// `WxH` form accepted by ffmpeg's `-s`.
    pub fn ffmpeg_size(self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Return `true` when both sides are even (required for yuv420p output).
    pub fn is_yuv420_compatible(self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }
}

/// Straight 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Pure black, the chroma-key color.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Construct from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `factor` in `[0, 1]`.
    pub fn scaled(self, factor: f64) -> Self {
        let k = (factor.clamp(0.0, 1.0) * 255.0).round() as u16;
        Self {
            r: crate::foundation::math::mul_div255_u8(u16::from(self.r), k),
            g: crate::foundation::math::mul_div255_u8(u16::from(self.g), k),
            b: crate::foundation::math::mul_div255_u8(u16::from(self.b), k),
        }
    }

    /// Return `true` for exact (0,0,0).
    pub fn is_black(self) -> bool {
        self == Self::BLACK
    }
}

impl From<[u8; 3]> for Rgb8 {
    fn from(v: [u8; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Rgb8> for [u8; 3] {
    fn from(c: Rgb8) -> Self {
        [c.r, c.g, c.b]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
