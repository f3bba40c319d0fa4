use std::str::FromStr;

use crate::foundation::core::Resolution;
use crate::foundation::error::WavecastError;

/// Named bundle of output size, encoder effort and bitrates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    #[default]
    Fastest,
    Fast,
    Medium,
    High,
}

/// Fixed encoder parameters for a [`QualityPreset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresetSpec {
    pub resolution: Resolution,
    /// Hardware encoder preset code (`p1`..`p7`).
    pub hw_preset: &'static str,
    /// Software encoder preset.
    pub sw_preset: &'static str,
    /// CQ for the hardware encoder, CRF for the software one.
    pub quality: u8,
    pub video_bitrate: &'static str,
    pub max_bitrate: &'static str,
    pub buffer_size: &'static str,
    pub audio_bitrate: &'static str,
}

impl QualityPreset {
    pub const ALL: [Self; 4] = [Self::Fastest, Self::Fast, Self::Medium, Self::High];

    pub fn spec(self) -> PresetSpec {
        let (w, h, hw_preset, quality, video_bitrate, max_bitrate, buffer_size, audio_bitrate) =
            match self {
                Self::Fastest => (854, 480, "p7", 28, "2M", "3M", "6M", "128k"),
                Self::Fast => (1280, 720, "p6", 26, "3M", "4M", "8M", "160k"),
                Self::Medium => (1280, 720, "p5", 24, "4M", "5M", "10M", "192k"),
                Self::High => (1920, 1080, "p4", 23, "5M", "6M", "12M", "192k"),
            };
        PresetSpec {
            resolution: Resolution {
                width: w,
                height: h,
            },
            hw_preset,
            sw_preset: "faster",
            quality,
            video_bitrate,
            max_bitrate,
            buffer_size,
            audio_bitrate,
        }
    }

    pub fn resolution(self) -> Resolution {
        self.spec().resolution
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = WavecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fastest" => Ok(Self::Fastest),
            "fast" => Ok(Self::Fast),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(WavecastError::config_invalid(format!(
                "unknown quality preset '{other}' (expected fastest, fast, medium or high)"
            ))),
        }
    }
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/preset.rs"]
mod tests;
