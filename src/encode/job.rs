use std::path::{Path, PathBuf};

use crate::encode::capability::VideoEncoder;
use crate::encode::preset::QualityPreset;
use crate::foundation::core::{Fps, Resolution, Rgb8};
use crate::foundation::error::{WavecastError, WavecastResult};

/// Audio sample rate of every produced MP4.
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;
/// Audio channel count of every produced MP4.
pub const OUTPUT_CHANNELS: u32 = 2;
/// GOP length and minimum keyframe interval.
pub const GOP: u32 = 30;

/// One transcoder input.
#[derive(Clone, Debug, PartialEq)]
pub enum InputSpec {
    /// Raw RGB24 frames written by the driver to the child's stdin.
    RawFrames { resolution: Resolution, fps: Fps },
    /// Still image looped at `fps`.
    Image { path: PathBuf, fps: Fps },
    /// Any container the transcoder can demux (video or audio).
    Media { path: PathBuf },
    /// Generated solid color source.
    Color {
        color: Rgb8,
        resolution: Resolution,
        fps: Fps,
    },
}

impl InputSpec {
    fn push_args(&self, out: &mut Vec<String>) {
        match self {
            Self::RawFrames { resolution, fps } => out.extend([
                "-f".into(),
                "rawvideo".into(),
                "-pix_fmt".into(),
                "rgb24".into(),
                "-s".into(),
                resolution.ffmpeg_size(),
                "-r".into(),
                fps.ffmpeg_rate(),
                "-i".into(),
                "pipe:0".into(),
            ]),
            Self::Image { path, fps } => out.extend([
                "-loop".into(),
                "1".into(),
                "-framerate".into(),
                fps.ffmpeg_rate(),
                "-i".into(),
                path.display().to_string(),
            ]),
            Self::Media { path } => out.extend(["-i".into(), path.display().to_string()]),
            Self::Color {
                color,
                resolution,
                fps,
            } => out.extend([
                "-f".into(),
                "lavfi".into(),
                "-i".into(),
                format!(
                    "color=c=0x{:02x}{:02x}{:02x}:s={}:r={}",
                    color.r,
                    color.g,
                    color.b,
                    resolution.ffmpeg_size(),
                    fps.ffmpeg_rate()
                ),
            ]),
        }
    }
}

/// Which input supplies the output's audio track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioSelector {
    #[default]
    None,
    /// First audio stream of the input at this index.
    Input(usize),
}

/// Whether the video stream is re-encoded or copied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VideoOutput {
    #[default]
    Encode,
    /// Passthrough; every stream is copied untouched.
    Copy,
}

/// Everything needed to run one transcoder invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeJob {
    inputs: Vec<InputSpec>,
    filter_graph: Option<String>,
    video_map: String,
    audio: AudioSelector,
    output: PathBuf,
    preset: QualityPreset,
    fps: Fps,
    duration_secs: Option<f64>,
    video: VideoOutput,
}

impl EncodeJob {
    pub fn new(output: impl Into<PathBuf>, preset: QualityPreset, fps: Fps) -> Self {
        Self {
            inputs: Vec::new(),
            filter_graph: None,
            video_map: "0:v:0".to_string(),
            audio: AudioSelector::None,
            output: output.into(),
            preset,
            fps,
            duration_secs: None,
            video: VideoOutput::Encode,
        }
    }

    /// Raw frames on stdin muxed with the audio file.
    pub fn waveform(
        audio_path: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        duration_secs: f64,
        preset: QualityPreset,
        resolution: Resolution,
        fps: Fps,
    ) -> Self {
        Self::new(output, preset, fps)
            .input(InputSpec::RawFrames { resolution, fps })
            .input(InputSpec::Media {
                path: audio_path.into(),
            })
            .audio_from(1)
            .duration(duration_secs)
    }

    pub fn input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    /// Route video through `graph`, taking the stream labelled `out_label` (e.g. `[vout]`).
    pub fn filter_graph(mut self, graph: impl Into<String>, out_label: impl Into<String>) -> Self {
        self.filter_graph = Some(graph.into());
        self.video_map = out_label.into();
        self
    }

    pub fn map_video(mut self, spec: impl Into<String>) -> Self {
        self.video_map = spec.into();
        self
    }

    pub fn audio_from(mut self, input: usize) -> Self {
        self.audio = AudioSelector::Input(input);
        self
    }

    pub fn duration(mut self, secs: f64) -> Self {
        self.duration_secs = (secs.is_finite() && secs > 0.0).then_some(secs);
        self
    }

    pub fn copy_streams(mut self) -> Self {
        self.video = VideoOutput::Copy;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn preset(&self) -> QualityPreset {
        self.preset
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    pub fn audio(&self) -> AudioSelector {
        self.audio
    }

    pub fn video_output(&self) -> VideoOutput {
        self.video
    }

    /// Size and rate of the stdin frame stream, if the job has one.
    pub fn raw_input(&self) -> Option<(Resolution, Fps)> {
        self.inputs.iter().find_map(|i| match i {
            InputSpec::RawFrames { resolution, fps } => Some((*resolution, *fps)),
            _ => None,
        })
    }

    pub fn validate(&self) -> WavecastResult<()> {
        if self.inputs.is_empty() {
            return Err(WavecastError::config_invalid("encode job has no inputs"));
        }
        let raw = self
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, i)| matches!(i, InputSpec::RawFrames { .. }))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        match raw.as_slice() {
            [] => {}
            [0] => {}
            _ => {
                return Err(WavecastError::config_invalid(
                    "raw frame input must be the single first input",
                ));
            }
        }
        if let Some((res, _)) = self.raw_input()
            && !res.is_yuv420_compatible()
        {
            return Err(WavecastError::config_invalid(format!(
                "raw frame size {} must be even (required for yuv420p mp4 output)",
                res.ffmpeg_size()
            )));
        }
        if let AudioSelector::Input(idx) = self.audio {
            match self.inputs.get(idx) {
                Some(InputSpec::Media { .. }) => {}
                _ => {
                    return Err(WavecastError::config_invalid(format!(
                        "audio input #{idx} is not a media file input"
                    )));
                }
            }
        }
        if self.video == VideoOutput::Copy && (self.filter_graph.is_some() || self.raw_input().is_some()) {
            return Err(WavecastError::config_invalid(
                "stream copy cannot be combined with a filter graph or raw frames",
            ));
        }
        Ok(())
    }

    /// Full transcoder argv (without the program name).
    pub fn args(&self, encoder: &VideoEncoder) -> Vec<String> {
        let spec = self.preset.spec();
        let mut out: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error", "-nostats"]
            .map(String::from)
            .to_vec();
        if self.raw_input().is_none() {
            out.push("-nostdin".into());
        }
        for input in &self.inputs {
            input.push_args(&mut out);
        }
        if let Some(graph) = &self.filter_graph {
            out.extend(["-filter_complex".into(), graph.clone()]);
        }
        out.extend(["-map".into(), self.video_map.clone()]);
        match self.audio {
            AudioSelector::Input(idx) => out.extend(["-map".into(), format!("{idx}:a:0")]),
            AudioSelector::None => out.push("-an".into()),
        }

        match self.video {
            VideoOutput::Copy => out.extend(["-c".into(), "copy".into()]),
            VideoOutput::Encode => {
                out.extend(encoder.args(&spec));
                out.extend(
                    [
                        "-profile:v",
                        "baseline",
                        "-level",
                        "3.1",
                        "-g",
                        &GOP.to_string(),
                        "-keyint_min",
                        &GOP.to_string(),
                        "-sc_threshold",
                        "0",
                        "-pix_fmt",
                        "yuv420p",
                        "-r",
                        &self.fps.ffmpeg_rate(),
                    ]
                    .map(String::from),
                );
                if self.audio != AudioSelector::None {
                    out.extend(
                        [
                            "-c:a",
                            "aac",
                            "-b:a",
                            spec.audio_bitrate,
                            "-ar",
                            &OUTPUT_SAMPLE_RATE.to_string(),
                            "-ac",
                            &OUTPUT_CHANNELS.to_string(),
                        ]
                        .map(String::from),
                    );
                }
            }
        }

        if let Some(secs) = self.duration_secs {
            out.extend(["-t".into(), format!("{secs:.3}")]);
        }
        out.extend(["-movflags".into(), "+faststart".into()]);
        if self.audio != AudioSelector::None {
            out.push("-shortest".into());
        }
        out.push(self.output.display().to_string());
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/job.rs"]
mod tests;
