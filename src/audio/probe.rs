use std::path::{Path, PathBuf};
use std::process::Command;

use crate::foundation::error::{WavecastError, WavecastResult};
use crate::foundation::tools::MediaTools;

/// Duration used when the probe cannot report a positive one.
pub const FALLBACK_DURATION_SECS: f64 = 10.0;

/// Container-level facts reported by `ffprobe`.
#[derive(Clone, Debug, Default)]
pub struct MediaProbe {
    pub source_path: PathBuf,
    pub duration_sec: f64,
    pub has_audio: bool,
    pub has_video: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,
    pub pix_fmt: Option<String>,
    /// Raw probe stderr; callers scan it for corruption keywords.
    pub stderr: String,
}

/// Run `ffprobe` on `path` and parse its JSON report.
///
/// A missing file is `InputMissing`; a probe that cannot run or cannot parse the file is
/// `AudioInvalid` carrying the probe's stderr.
pub fn probe_media(tools: &MediaTools, path: &Path) -> WavecastResult<MediaProbe> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        codec_name: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        pix_fmt: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u16>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    if !path.exists() {
        return Err(WavecastError::input_missing(format!(
            "'{}' does not exist",
            path.display()
        )));
    }

    let out = Command::new(&tools.ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            WavecastError::audio_invalid(format!(
                "failed to run '{}': {e}",
                tools.ffprobe.display()
            ))
        })?;
    let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
    if !out.status.success() {
        return Err(WavecastError::audio_invalid(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            stderr.trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout).map_err(|e| {
        WavecastError::audio_invalid(format!(
            "ffprobe json parse failed for '{}': {e}",
            path.display()
        ))
    })?;

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .unwrap_or(0.0);

    Ok(MediaProbe {
        source_path: path.to_path_buf(),
        duration_sec,
        has_audio: audio.is_some(),
        has_video: video.is_some(),
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        sample_rate: audio
            .and_then(|a| a.sample_rate.as_deref())
            .and_then(|s| s.parse().ok()),
        channels: audio.and_then(|a| a.channels),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
        video_codec: video.and_then(|v| v.codec_name.clone()),
        pix_fmt: video.and_then(|v| v.pix_fmt.clone()),
        stderr,
    })
}

/// Probe the duration of `path`, falling back to [`FALLBACK_DURATION_SECS`].
///
/// Never loads the audio into memory.
pub fn probe_duration_or_fallback(tools: &MediaTools, path: &Path) -> f64 {
    match probe_media(tools, path) {
        Ok(p) if p.duration_sec > 0.0 => p.duration_sec,
        Ok(_) => {
            tracing::warn!(
                path = %path.display(),
                "probe reported non-positive duration; using {FALLBACK_DURATION_SECS}s"
            );
            FALLBACK_DURATION_SECS
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "duration probe failed; using {FALLBACK_DURATION_SECS}s"
            );
            FALLBACK_DURATION_SECS
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/probe.rs"]
mod tests;
