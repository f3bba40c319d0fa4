use std::path::Path;

use crate::audio::probe::{MediaProbe, probe_media};
use crate::foundation::error::{ErrorKind, WavecastError, WavecastResult};
use crate::foundation::tools::MediaTools;

/// Smallest audio file accepted.
pub const MIN_AUDIO_BYTES: u64 = 100;

/// Probe stderr substrings that mark a damaged file.
pub const CORRUPTION_KEYWORDS: [&str; 3] = ["illegal", "invalid", "corrupt"];

const TROUBLESHOOTING: &str =
    "re-export the audio as 44.1 kHz WAV or MP3 and check that it plays in a media player";

fn invalid(path: &Path, why: impl std::fmt::Display) -> WavecastError {
    WavecastError::audio_invalid(format!(
        "'{}' {why}; {TROUBLESHOOTING}",
        path.display()
    ))
}

/// Check that `path` is a usable audio file before any encoder is spawned.
pub fn validate_audio(tools: &MediaTools, path: &Path) -> WavecastResult<MediaProbe> {
    let meta = std::fs::metadata(path).map_err(|_| {
        WavecastError::input_missing(format!("audio '{}' does not exist", path.display()))
    })?;
    if !meta.is_file() {
        return Err(WavecastError::input_missing(format!(
            "audio '{}' is not a file",
            path.display()
        )));
    }
    if meta.len() <= MIN_AUDIO_BYTES {
        return Err(invalid(
            path,
            format!("is only {} bytes (minimum {MIN_AUDIO_BYTES})", meta.len()),
        ));
    }

    let probe = probe_media(tools, path).map_err(|e| match e.kind() {
        ErrorKind::AudioInvalid => invalid(path, format!("could not be probed ({e})")),
        _ => e,
    })?;

    let lower = probe.stderr.to_ascii_lowercase();
    if let Some(k) = CORRUPTION_KEYWORDS.iter().find(|k| lower.contains(*k)) {
        return Err(invalid(
            path,
            format!("looks damaged (probe reported '{k}': {})", probe.stderr.trim()),
        ));
    }
    if !probe.has_audio {
        return Err(invalid(path, "has no audio stream"));
    }
    if probe.duration_sec <= 0.0 {
        return Err(invalid(path, "reports a zero duration"));
    }
    tracing::debug!(
        path = %path.display(),
        duration = probe.duration_sec,
        codec = probe.audio_codec.as_deref().unwrap_or("-"),
        "audio validated"
    );
    Ok(probe)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/validate.rs"]
mod tests;
