use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::encode::preset::PresetSpec;
use crate::foundation::tools::MediaTools;

/// Name the transcoder reports for its hardware H.264 encoder.
pub const HW_H264_ENCODER: &str = "h264_nvenc";

/// What the host GPU probe reported.
///
/// Absence of a GPU only selects the software encoder; it never fails a job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GpuCapability {
    pub available: bool,
    pub name: Option<String>,
    pub total_memory_mb: Option<u64>,
}

static DETECTED: OnceLock<GpuCapability> = OnceLock::new();

impl GpuCapability {
    pub fn none() -> Self {
        Self::default()
    }

    /// Probe once per process and return the cached record.
    pub fn cached() -> &'static Self {
        DETECTED.get_or_init(|| {
            let cap = Self::detect();
            tracing::info!(
                available = cap.available,
                name = cap.name.as_deref().unwrap_or("-"),
                memory_mb = cap.total_memory_mb.unwrap_or(0),
                "gpu capability"
            );
            cap
        })
    }

    /// Run `nvidia-smi` and parse its first GPU.
    pub fn detect() -> Self {
        let out = Command::new("nvidia-smi")
            .args([
                "--query-gpu=name,memory.total",
                "--format=csv,noheader,nounits",
            ])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match out {
            Ok(o) if o.status.success() => {
                parse_gpu_query(&String::from_utf8_lossy(&o.stdout)).unwrap_or_default()
            }
            _ => Self::none(),
        }
    }

    /// Current utilization of the first GPU in percent, if it can be sampled.
    pub fn sample_utilization(&self) -> Option<u32> {
        if !self.available {
            return None;
        }
        let out = Command::new("nvidia-smi")
            .args([
                "--query-gpu=utilization.gpu",
                "--format=csv,noheader,nounits",
            ])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !out.status.success() {
            return None;
        }
        String::from_utf8_lossy(&out.stdout)
            .lines()
            .next()?
            .trim()
            .parse()
            .ok()
    }
}

fn parse_gpu_query(stdout: &str) -> Option<GpuCapability> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let mut parts = line.split(',').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty())?.to_string();
    let total_memory_mb = parts.next().and_then(|m| m.parse().ok());
    Some(GpuCapability {
        available: true,
        name: Some(name),
        total_memory_mb,
    })
}

/// Encoders the transcoder reports through its feature probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderSupport {
    pub hardware_h264: bool,
}

impl EncoderSupport {
    pub fn probe(tools: &MediaTools) -> Self {
        let out = Command::new(&tools.ffmpeg)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        let support = match out {
            Ok(o) if o.status.success() => Self::from_listing(&String::from_utf8_lossy(&o.stdout)),
            _ => Self::default(),
        };
        tracing::info!(hardware_h264 = support.hardware_h264, "encoder probe");
        support
    }

    pub fn from_listing(listing: &str) -> Self {
        Self {
            hardware_h264: listing
                .lines()
                .any(|l| l.split_whitespace().nth(1) == Some(HW_H264_ENCODER)),
        }
    }
}

/// Concrete H.264 encoder for one job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoEncoder {
    Hardware { preset: &'static str, cq: u8 },
    Software { preset: &'static str, crf: u8 },
}

impl VideoEncoder {
    /// Hardware only when the transcoder has it AND a GPU is present.
    pub fn select(spec: &PresetSpec, support: EncoderSupport, gpu: &GpuCapability) -> Self {
        if support.hardware_h264 && gpu.available {
            Self::Hardware {
                preset: spec.hw_preset,
                cq: spec.quality,
            }
        } else {
            Self::software(spec)
        }
    }

    pub fn software(spec: &PresetSpec) -> Self {
        Self::Software {
            preset: spec.sw_preset,
            crf: spec.quality,
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Hardware { .. })
    }

    /// Codec-specific output arguments.
    pub fn args(&self, spec: &PresetSpec) -> Vec<String> {
        let mut out: Vec<String> = match self {
            Self::Hardware { preset, cq } => vec![
                "-c:v".into(),
                HW_H264_ENCODER.into(),
                "-preset".into(),
                (*preset).into(),
                "-rc".into(),
                "vbr".into(),
                "-cq".into(),
                cq.to_string(),
            ],
            Self::Software { preset, crf } => vec![
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                (*preset).into(),
                "-crf".into(),
                crf.to_string(),
            ],
        };
        out.extend(
            [
                "-b:v",
                spec.video_bitrate,
                "-maxrate",
                spec.max_bitrate,
                "-bufsize",
                spec.buffer_size,
            ]
            .map(String::from),
        );
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/capability.rs"]
mod tests;
