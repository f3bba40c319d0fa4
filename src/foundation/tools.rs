use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::error::{WavecastError, WavecastResult};

/// Locations of the external media transcoder and its probe.
///
/// Defaults to `ffmpeg` and `ffprobe` resolved through `PATH`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for MediaTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl MediaTools {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Return `true` when both binaries answer `-version`.
    pub fn available(&self) -> bool {
        answers_version(&self.ffmpeg) && answers_version(&self.ffprobe)
    }

    pub fn ensure_ffmpeg(&self) -> WavecastResult<()> {
        if answers_version(&self.ffmpeg) {
            return Ok(());
        }
        Err(WavecastError::encode_failed(format!(
            "'{}' is required for MP4 encoding, but could not be run",
            self.ffmpeg.display()
        )))
    }
}

fn answers_version(bin: &Path) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> WavecastResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Size of `path` in bytes, or 0 when it does not exist.
pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
