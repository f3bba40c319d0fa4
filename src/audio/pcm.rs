use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::error::{WavecastError, WavecastResult};
use crate::foundation::tools::MediaTools;

/// Random-ish access to mono `f32` PCM at a fixed sample rate.
///
/// Windows are requested in non-decreasing start order. Reads past the end of the stream are
/// zero-padded; a read that cannot be served returns an error, which callers turn into silence.
pub trait PcmSource: Send {
    fn sample_rate(&self) -> u32;

    /// Return exactly `len` samples starting at sample `start`.
    fn read_window(&mut self, start: u64, len: usize) -> WavecastResult<Vec<f32>>;
}

/// Open the cheapest source able to deliver `path` at `sample_rate`.
///
/// WAV files whose native rate already matches are read in place with `hound`; everything else is
/// decoded and resampled by a streaming `ffmpeg` child.
pub fn open_pcm_source(
    tools: &MediaTools,
    path: &Path,
    sample_rate: u32,
) -> WavecastResult<Box<dyn PcmSource>> {
    if !path.exists() {
        return Err(WavecastError::input_missing(format!(
            "audio '{}' does not exist",
            path.display()
        )));
    }
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        match WavPcmSource::open(path) {
            Ok(src) if src.sample_rate() == sample_rate => return Ok(Box::new(src)),
            Ok(src) => tracing::debug!(
                native = src.sample_rate(),
                requested = sample_rate,
                "wav sample rate differs; resampling through ffmpeg"
            ),
            Err(e) => tracing::debug!(error = %e, "hound could not open wav; decoding through ffmpeg"),
        }
    }
    Ok(Box::new(FfmpegPcmStream::spawn(tools, path, sample_rate)?))
}

/// Seekable WAV reader that downmixes to mono.
pub struct WavPcmSource {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    len_frames: u64,
}

impl WavPcmSource {
    pub fn open(path: &Path) -> WavecastResult<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| {
            WavecastError::audio_invalid(format!("read wav '{}': {e}", path.display()))
        })?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(WavecastError::audio_invalid(format!(
                "wav '{}' declares zero channels",
                path.display()
            )));
        }
        let len_frames = u64::from(reader.duration());
        Ok(Self {
            reader,
            spec,
            len_frames,
        })
    }

    pub fn len_frames(&self) -> u64 {
        self.len_frames
    }

    fn read_interleaved(&mut self, count: usize) -> WavecastResult<Vec<f32>> {
        let bad = |e: hound::Error| WavecastError::audio_invalid(format!("decode wav: {e}"));
        match self.spec.sample_format {
            hound::SampleFormat::Float => self
                .reader
                .samples::<f32>()
                .take(count)
                .map(|s| s.map_err(bad))
                .collect(),
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                self.reader
                    .samples::<i32>()
                    .take(count)
                    .map(|s| s.map(|v| v as f32 * scale).map_err(bad))
                    .collect()
            }
        }
    }
}

impl PcmSource for WavPcmSource {
    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn read_window(&mut self, start: u64, len: usize) -> WavecastResult<Vec<f32>> {
        let mut out = vec![0.0f32; len];
        if start >= self.len_frames || len == 0 {
            return Ok(out);
        }
        let pos = u32::try_from(start)
            .map_err(|_| WavecastError::audio_invalid("wav seek position out of range"))?;
        self.reader
            .seek(pos)
            .map_err(|e| WavecastError::audio_invalid(format!("seek wav: {e}")))?;

        let avail = (self.len_frames - start).min(len as u64) as usize;
        let channels = usize::from(self.spec.channels);
        let interleaved = self.read_interleaved(avail * channels)?;
        downmix_into(&interleaved, channels, &mut out);
        Ok(out)
    }
}

fn downmix_into(interleaved: &[f32], channels: usize, out: &mut [f32]) {
    let inv = 1.0 / channels as f32;
    for (dst, frame) in out.iter_mut().zip(interleaved.chunks_exact(channels)) {
        *dst = frame.iter().sum::<f32>() * inv;
    }
}

/// Forward-only decoder: `ffmpeg` writes mono `f32le` to a pipe which is consumed incrementally.
///
/// Only the samples between the last requested start and the decode head are retained, so memory
/// stays bounded by one window regardless of file length.
pub struct FfmpegPcmStream {
    child: Child,
    stdout: Option<ChildStdout>,
    sample_rate: u32,
    buf: VecDeque<f32>,
    /// Absolute sample index of `buf[0]`.
    buf_start: u64,
    pending: Vec<u8>,
    eof: bool,
}

impl FfmpegPcmStream {
    pub fn spawn(tools: &MediaTools, path: &Path, sample_rate: u32) -> WavecastResult<Self> {
        let mut child = Command::new(&tools.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-vn", "-f", "f32le", "-acodec", "pcm_f32le", "-ac", "1", "-ar"])
            .arg(sample_rate.to_string())
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                WavecastError::audio_invalid(format!(
                    "failed to spawn '{}' for audio decode: {e}",
                    tools.ffmpeg.display()
                ))
            })?;
        let stdout = child.stdout.take();
        Ok(Self {
            child,
            stdout,
            sample_rate,
            buf: VecDeque::new(),
            buf_start: 0,
            pending: Vec::new(),
            eof: false,
        })
    }

    fn fill_to(&mut self, end: u64) -> WavecastResult<()> {
        let mut chunk = [0u8; 16 * 1024];
        while !self.eof && self.buf_start + (self.buf.len() as u64) < end {
            let Some(stdout) = self.stdout.as_mut() else {
                self.eof = true;
                break;
            };
            let n = stdout
                .read(&mut chunk)
                .map_err(|e| WavecastError::audio_invalid(format!("read decoded audio: {e}")))?;
            if n == 0 {
                self.eof = true;
                break;
            }
            self.pending.extend_from_slice(&chunk[..n]);
            let whole = self.pending.len() / 4 * 4;
            self.buf.extend(
                self.pending[..whole]
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
            self.pending.drain(..whole);
        }
        Ok(())
    }
}

impl PcmSource for FfmpegPcmStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_window(&mut self, start: u64, len: usize) -> WavecastResult<Vec<f32>> {
        if start < self.buf_start {
            return Err(WavecastError::audio_invalid(format!(
                "stream already advanced past sample {start}"
            )));
        }
        let end = start + len as u64;
        self.fill_to(end)?;

        let drop_n = ((start - self.buf_start) as usize).min(self.buf.len());
        self.buf.drain(..drop_n);
        self.buf_start = start;

        let mut out = vec![0.0f32; len];
        for (dst, src) in out.iter_mut().zip(self.buf.iter()) {
            *dst = *src;
        }
        Ok(out)
    }
}

impl Drop for FfmpegPcmStream {
    fn drop(&mut self) {
        drop(self.stdout.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Samples already resident in memory. Used by tests and by callers that synthesize audio.
#[derive(Clone, Debug)]
pub struct InMemoryPcm {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl InMemoryPcm {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl PcmSource for InMemoryPcm {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_window(&mut self, start: u64, len: usize) -> WavecastResult<Vec<f32>> {
        let mut out = vec![0.0f32; len];
        let Ok(start) = usize::try_from(start) else {
            return Ok(out);
        };
        if let Some(src) = self.samples.get(start..) {
            let n = src.len().min(len);
            out[..n].copy_from_slice(&src[..n]);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/pcm.rs"]
mod tests;
