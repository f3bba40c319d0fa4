use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::encode::driver::{CancelToken, EncodeLimits};
use crate::encode::stderr::StderrTail;
use crate::foundation::error::WavecastError;

const UNSET: u64 = u64::MAX;

/// Frame counters shared between the producer, the writer and the monitor.
///
/// Timestamps are stored as milliseconds since `started`.
#[derive(Debug)]
pub struct Progress {
    started: Instant,
    produced: AtomicU64,
    written: AtomicU64,
    last_produced_ms: AtomicU64,
    first_written_ms: AtomicU64,
    producing_done: AtomicBool,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(UNSET - 1)
}

impl Progress {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            produced: AtomicU64::new(0),
            written: AtomicU64::new(0),
            last_produced_ms: AtomicU64::new(UNSET),
            first_written_ms: AtomicU64::new(UNSET),
            producing_done: AtomicBool::new(false),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn frame_produced(&self) {
        self.frame_produced_at(self.elapsed());
    }

    pub fn frame_produced_at(&self, at: Duration) {
        self.produced.fetch_add(1, Ordering::Relaxed);
        self.last_produced_ms.store(millis(at), Ordering::Relaxed);
    }

    pub fn frame_written(&self) {
        self.frame_written_at(self.elapsed());
    }

    pub fn frame_written_at(&self, at: Duration) {
        let _ = self.first_written_ms.compare_exchange(
            UNSET,
            millis(at),
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finish_producing(&self) {
        self.producing_done.store(true, Ordering::Relaxed);
    }

    pub fn is_producing(&self) -> bool {
        !self.producing_done.load(Ordering::Relaxed)
    }

    pub fn frames_produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    pub fn frames_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn stamp(&self, slot: &AtomicU64) -> Option<Duration> {
        match slot.load(Ordering::Relaxed) {
            UNSET => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn last_produced_at(&self) -> Option<Duration> {
        self.stamp(&self.last_produced_ms)
    }

    pub fn first_written_at(&self) -> Option<Duration> {
        self.stamp(&self.first_written_ms)
    }
}

/// Why a running encode was stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    HardTimeout(Duration),
    FirstFrameTimeout(Duration),
    ZeroByteOutput(Duration),
    InterFrameTimeout(Duration),
    NoOutputGrowth(Duration),
    QueueFull(Duration),
    FinalizeTimeout(Duration),
    FatalStderr(String),
    MemoryExceeded { used: u64, ceiling: u64 },
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "encode cancelled"),
            Self::HardTimeout(d) => write!(f, "encode exceeded the hard timeout of {}s", d.as_secs()),
            Self::FirstFrameTimeout(d) => {
                write!(f, "no frame was produced within {:.1}s", d.as_secs_f64())
            }
            Self::ZeroByteOutput(d) => write!(
                f,
                "encoder output is still 0 bytes {:.1}s after the first frame",
                d.as_secs_f64()
            ),
            Self::InterFrameTimeout(d) => {
                write!(f, "no new frame for {:.1}s mid-stream", d.as_secs_f64())
            }
            Self::NoOutputGrowth(d) => write!(
                f,
                "encoder output has not grown for {:.1}s while frames keep arriving",
                d.as_secs_f64()
            ),
            Self::QueueFull(d) => write!(
                f,
                "frame queue stayed full for {:.1}s; encoder is not draining its input",
                d.as_secs_f64()
            ),
            Self::FinalizeTimeout(d) => write!(
                f,
                "encoder did not finish writing the output within {}s",
                d.as_secs()
            ),
            Self::FatalStderr(line) => write!(f, "encoder reported: {line}"),
            Self::MemoryExceeded { used, ceiling } => write!(
                f,
                "resident memory {} MiB exceeds ceiling {} MiB",
                used / (1024 * 1024),
                ceiling / (1024 * 1024)
            ),
        }
    }
}

impl AbortReason {
    pub fn into_error(self) -> WavecastError {
        let msg = self.to_string();
        match self {
            Self::Cancelled => WavecastError::cancelled(msg),
            Self::MemoryExceeded { .. } => WavecastError::resource_exhausted(msg),
            Self::FatalStderr(_) => WavecastError::encode_failed(msg),
            Self::HardTimeout(_)
            | Self::FirstFrameTimeout(_)
            | Self::ZeroByteOutput(_)
            | Self::InterFrameTimeout(_)
            | Self::NoOutputGrowth(_)
            | Self::QueueFull(_)
            | Self::FinalizeTimeout(_) => WavecastError::stalled(msg),
        }
    }
}

/// First-wins abort flag shared by every thread of one encode.
#[derive(Debug, Default)]
pub struct AbortSignal {
    raised: AtomicBool,
    reason: Mutex<Option<AbortReason>>,
}

impl AbortSignal {
    fn slot(&self) -> MutexGuard<'_, Option<AbortReason>> {
        self.reason.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `reason` unless an earlier one is already set. Returns `true` if this call won.
    pub fn raise(&self, reason: AbortReason) -> bool {
        let mut slot = self.slot();
        if slot.is_some() {
            return false;
        }
        tracing::warn!(%reason, "aborting encode");
        *slot = Some(reason);
        self.raised.store(true, Ordering::Release);
        true
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.slot().clone()
    }

    /// Raise `reason` and return the error for whichever reason won.
    pub fn abort(&self, reason: AbortReason) -> WavecastError {
        self.raise(reason.clone());
        self.reason().unwrap_or(reason).into_error()
    }
}

/// Periodic liveness guard for one encode.
///
/// `check` is pure with respect to time: callers pass the elapsed time and the current
/// output size, so the rules can be exercised without sleeping.
#[derive(Debug)]
pub struct LivenessMonitor<'a> {
    limits: &'a EncodeLimits,
    progress: &'a Progress,
    stderr: &'a StderrTail,
    cancel: &'a CancelToken,
    frame_checks: bool,
    last_size: u64,
    last_growth: Duration,
    next_size_check: Duration,
}

impl<'a> LivenessMonitor<'a> {
    /// Monitor for a job fed with frames from the driver.
    pub fn for_stream(
        limits: &'a EncodeLimits,
        progress: &'a Progress,
        stderr: &'a StderrTail,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            limits,
            progress,
            stderr,
            cancel,
            frame_checks: true,
            last_size: 0,
            last_growth: Duration::ZERO,
            next_size_check: limits.stall_check_interval,
        }
    }

    /// Monitor for a job whose inputs are all files.
    pub fn for_files(
        limits: &'a EncodeLimits,
        progress: &'a Progress,
        stderr: &'a StderrTail,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            frame_checks: false,
            ..Self::for_stream(limits, progress, stderr, cancel)
        }
    }

    pub fn check(&mut self, now: Duration, output_len: Option<u64>) -> Option<AbortReason> {
        let limits = self.limits;
        if self.cancel.is_cancelled() {
            return Some(AbortReason::Cancelled);
        }
        if now >= limits.hard_timeout {
            return Some(AbortReason::HardTimeout(limits.hard_timeout));
        }

        let streaming = self.frame_checks && self.progress.is_producing();
        if self.frame_checks
            && self.progress.frames_written() >= limits.fatal_min_frames
            && let Some(line) = self.stderr.first_fatal()
        {
            return Some(AbortReason::FatalStderr(line));
        }

        let since_last_frame = self
            .progress
            .last_produced_at()
            .map(|at| now.saturating_sub(at));
        if streaming {
            match since_last_frame {
                None if now >= limits.first_frame_timeout => {
                    return Some(AbortReason::FirstFrameTimeout(limits.first_frame_timeout));
                }
                Some(idle) if idle >= limits.inter_frame_timeout => {
                    return Some(AbortReason::InterFrameTimeout(idle));
                }
                _ => {}
            }
            if let Some(first) = self.progress.first_written_at() {
                let waited = now.saturating_sub(first);
                if output_len == Some(0)
                    && waited >= limits.zero_byte_wait
                    && self.progress.frames_written() >= limits.zero_byte_min_frames
                {
                    return Some(AbortReason::ZeroByteOutput(waited));
                }
            }
        }

        if now >= self.next_size_check {
            self.next_size_check = now + limits.stall_check_interval;
            let size = output_len.unwrap_or(0);
            if size > self.last_size {
                self.last_size = size;
                self.last_growth = now;
            } else {
                let idle = now.saturating_sub(self.last_growth);
                let frames_arriving = if self.frame_checks {
                    streaming && since_last_frame.is_some_and(|d| d < limits.inter_frame_timeout)
                } else {
                    true
                };
                if idle > limits.stall_timeout && frames_arriving {
                    return Some(AbortReason::NoOutputGrowth(idle));
                }
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/monitor.rs"]
mod tests;
