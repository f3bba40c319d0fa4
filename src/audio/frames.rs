use std::path::Path;

use crate::audio::pcm::{PcmSource, open_pcm_source};
use crate::foundation::core::{FrameIndex, Fps};
use crate::foundation::error::{WavecastError, WavecastResult};
use crate::foundation::tools::MediaTools;

/// Overlap added around each frame's window, in seconds (half before, half after).
pub const WINDOW_OVERLAP_SECS: f64 = 0.05;

/// Default decode rate for visualization windows.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// The short slice of audio associated with one video frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioWindow {
    pub index: FrameIndex,
    pub samples: Vec<f32>,
}

impl AudioWindow {
    pub fn silent(index: FrameIndex, len: usize) -> Self {
        Self {
            index,
            samples: vec![0.0; len],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Sample range `(start, len)` covered by frame `frame`.
///
/// The window spans `[i/fps - eps/2, i/fps - eps/2 + 1/fps + eps]`, with the start clamped to 0.
pub fn window_bounds(frame: FrameIndex, fps: Fps, sample_rate: u32) -> (u64, usize) {
    let sr = f64::from(sample_rate);
    let t0 = fps.frames_to_secs(frame.0) - WINDOW_OVERLAP_SECS / 2.0;
    let start = (t0.max(0.0) * sr).round() as u64;
    let len = (sr * (fps.frame_duration_secs() + WINDOW_OVERLAP_SECS)).round() as usize;
    (start, len)
}

/// Number of frames produced for `duration_secs` of audio.
pub fn frame_count(duration_secs: f64, fps: Fps) -> u64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 0;
    }
    fps.secs_to_frames_floor(duration_secs)
}

/// Lazy, finite sequence of per-frame audio windows.
///
/// Decode failures never end the sequence early: the affected frame gets a zero-filled window of
/// nominal length. The underlying source (and any decoder child) is released on drop.
pub struct AudioFrames {
    source: Box<dyn PcmSource>,
    fps: Fps,
    next: u64,
    total: u64,
    degraded: u64,
}

impl std::fmt::Debug for AudioFrames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrames")
            .field("fps", &self.fps)
            .field("next", &self.next)
            .field("total", &self.total)
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

impl AudioFrames {
    pub fn new(source: Box<dyn PcmSource>, fps: Fps, duration_secs: f64) -> Self {
        Self {
            source,
            fps,
            next: 0,
            total: frame_count(duration_secs, fps),
            degraded: 0,
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total
    }

    /// Windows that were replaced by silence so far.
    pub fn degraded_windows(&self) -> u64 {
        self.degraded
    }
}

impl Iterator for AudioFrames {
    type Item = AudioWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let index = FrameIndex(self.next);
        self.next += 1;

        let (start, len) = window_bounds(index, self.fps, self.source.sample_rate());
        match self.source.read_window(start, len) {
            Ok(mut samples) => {
                for s in &mut samples {
                    if !s.is_finite() {
                        *s = 0.0;
                    }
                }
                Some(AudioWindow { index, samples })
            }
            Err(e) => {
                self.degraded += 1;
                tracing::debug!(frame = index.0, error = %e, "audio window decode failed; using silence");
                Some(AudioWindow::silent(index, len))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = usize::try_from(self.total.saturating_sub(self.next)).unwrap_or(usize::MAX);
        (rem, Some(rem))
    }
}

impl ExactSizeIterator for AudioFrames {}

/// Open `audio_path` and iterate its windows for `duration_secs` at `fps`.
///
/// A missing file is `InputMissing`; everything after opening degrades to silence.
pub fn iterate(
    tools: &MediaTools,
    audio_path: &Path,
    sample_rate: u32,
    fps: Fps,
    duration_secs: f64,
) -> WavecastResult<AudioFrames> {
    if !audio_path.is_file() {
        return Err(WavecastError::input_missing(format!(
            "audio '{}' does not exist",
            audio_path.display()
        )));
    }
    let source = open_pcm_source(tools, audio_path, sample_rate)?;
    Ok(AudioFrames::new(source, fps, duration_secs))
}

#[cfg(test)]
#[path = "../../tests/unit/audio/frames.rs"]
mod tests;
