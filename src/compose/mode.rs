use std::path::Path;

/// Top-level output product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProductMode {
    /// Solid black video over the audio.
    Minimal,
    /// Letterboxed still image over the audio.
    StillImage,
    WaveformOnly,
    WaveformOverBackground,
    /// Avatar video copied as-is.
    AvatarOnly,
    AvatarOverBackground,
    AvatarWithWaveform,
    AvatarWithBackgroundAndWaveform,
}

/// Which optional inputs a compose request actually has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProductInputs {
    pub avatar: bool,
    pub visualization: bool,
    pub background: bool,
}

impl ProductInputs {
    /// An avatar only counts when the file exists and is non-empty.
    pub fn detect(avatar: Option<&Path>, background: Option<&Path>, visualization: bool) -> Self {
        let avatar = avatar.is_some_and(|p| {
            let usable = std::fs::metadata(p).is_ok_and(|m| m.is_file() && m.len() > 0);
            if !usable {
                tracing::warn!(path = %p.display(), "avatar video missing or empty; ignoring it");
            }
            usable
        });
        Self {
            avatar,
            visualization,
            background: background.is_some(),
        }
    }
}

impl ProductMode {
    /// First match wins: avatar, then visualization, then background.
    pub fn select(inputs: ProductInputs) -> Self {
        let ProductInputs {
            avatar,
            visualization,
            background,
        } = inputs;
        match (avatar, visualization, background) {
            (true, true, true) => Self::AvatarWithBackgroundAndWaveform,
            (true, true, false) => Self::AvatarWithWaveform,
            (true, false, true) => Self::AvatarOverBackground,
            (true, false, false) => Self::AvatarOnly,
            (false, true, true) => Self::WaveformOverBackground,
            (false, true, false) => Self::WaveformOnly,
            (false, false, true) => Self::StillImage,
            (false, false, false) => Self::Minimal,
        }
    }

    pub fn renders_waveform(self) -> bool {
        matches!(
            self,
            Self::WaveformOnly
                | Self::WaveformOverBackground
                | Self::AvatarWithWaveform
                | Self::AvatarWithBackgroundAndWaveform
        )
    }

    /// Output audio comes from the avatar video rather than the audio file.
    pub fn uses_avatar_audio(self) -> bool {
        matches!(
            self,
            Self::AvatarOnly
                | Self::AvatarOverBackground
                | Self::AvatarWithWaveform
                | Self::AvatarWithBackgroundAndWaveform
        )
    }

    /// Whether the audio file is read at all (and so must be validated first).
    pub fn consumes_audio_file(self) -> bool {
        self.renders_waveform() || !self.uses_avatar_audio()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::StillImage => "still_image",
            Self::WaveformOnly => "waveform_only",
            Self::WaveformOverBackground => "waveform_over_background",
            Self::AvatarOnly => "avatar_only",
            Self::AvatarOverBackground => "avatar_over_background",
            Self::AvatarWithWaveform => "avatar_with_waveform",
            Self::AvatarWithBackgroundAndWaveform => "avatar_with_background_and_waveform",
        }
    }
}

impl std::fmt::Display for ProductMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/mode.rs"]
mod tests;
