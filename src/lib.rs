//! Wavecast turns podcast audio into video.
//!
//! Two layers:
//!
//! - A deterministic, audio-reactive waveform renderer ([`Renderer`]) fed by a chunked audio
//!   frame source ([`audio::frames::iterate`]).
//! - A compositor ([`Compositor`]) that overlays avatar video, waveform and background image
//!   into a final MP4 by driving an external transcoder through [`EncoderPipeDriver`].
#![forbid(unsafe_code)]

mod foundation;

pub mod audio;
pub mod compose;
pub mod encode;
pub mod render;
pub mod viz;

pub use crate::foundation::core::{Fps, FrameIndex, Resolution, Rgb8};
pub use crate::foundation::error::{EncoderDiagnostics, ErrorKind, WavecastError, WavecastResult};
pub use crate::foundation::tools::MediaTools;

pub use crate::audio::frames::AudioWindow;
pub use crate::audio::pcm::{InMemoryPcm, PcmSource};
pub use crate::audio::probe::{MediaProbe, probe_media};
pub use crate::compose::compositor::{CacheDir, ComposeOutcome, ComposeRequest, Compositor};
pub use crate::compose::mode::{ProductInputs, ProductMode};
pub use crate::encode::capability::{EncoderSupport, GpuCapability, VideoEncoder};
pub use crate::encode::driver::{
    CancelToken, EncodeLimits, EncoderPipeDriver, StreamState, StreamStats,
};
pub use crate::encode::job::{AudioSelector, EncodeJob, InputSpec};
pub use crate::encode::preset::QualityPreset;
pub use crate::render::frame::Frame;
pub use crate::render::renderer::{RenderThreading, Renderer};
pub use crate::viz::config::{
    LineThickness, Orientation, Position, VisualizationConfig, VisualizationStyle, WaveformStyle,
};
