use std::io::Write as _;
use std::path::Path;
use std::process::{ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender};

use crate::encode::capability::{EncoderSupport, GpuCapability, VideoEncoder};
use crate::encode::child::OwnedChild;
use crate::encode::job::{EncodeJob, VideoOutput};
use crate::encode::memory;
use crate::encode::monitor::{AbortReason, AbortSignal, LivenessMonitor, Progress};
use crate::encode::preset::QualityPreset;
use crate::encode::stderr::{StderrTail, spawn_drain};
use crate::foundation::core::Resolution;
use crate::foundation::error::{EncoderDiagnostics, ErrorKind, WavecastError, WavecastResult};
use crate::foundation::tools::{MediaTools, ensure_parent_dir, file_len};
use crate::render::frame::Frame;

const FINALIZE_POLL: Duration = Duration::from_millis(50);
const MAX_MONITOR_POLL: Duration = Duration::from_millis(500);
const PROGRESS_EVERY: u64 = 30;

/// Supervision thresholds for one encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeLimits {
    /// Frames buffered between the producer and the stdin writer.
    pub queue_capacity: usize,
    /// How long the producer may wait for a slot in a full queue.
    pub queue_wait: Duration,
    /// Combined resident memory of this process and the encoder.
    pub memory_ceiling_bytes: u64,
    pub memory_poll_frames: u64,
    pub stall_timeout: Duration,
    pub stall_check_interval: Duration,
    pub inter_frame_timeout: Duration,
    pub first_frame_timeout: Duration,
    pub zero_byte_wait: Duration,
    pub zero_byte_min_frames: u64,
    pub hard_timeout: Duration,
    pub finalize_timeout: Duration,
    pub terminate_grace: Duration,
    pub kill_grace: Duration,
    /// Frames that must have been written before a fatal stderr line aborts.
    pub fatal_min_frames: u64,
    pub stderr_lines: usize,
    pub diagnostic_tail_bytes: usize,
    pub poll_interval: Duration,
}

impl Default for EncodeLimits {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            queue_wait: Duration::from_secs(5),
            memory_ceiling_bytes: 15 * 1024 * 1024 * 1024,
            memory_poll_frames: 30,
            stall_timeout: Duration::from_secs(30),
            stall_check_interval: Duration::from_secs(5),
            inter_frame_timeout: Duration::from_secs(10),
            first_frame_timeout: Duration::from_secs(5),
            zero_byte_wait: Duration::from_secs(3),
            zero_byte_min_frames: 60,
            hard_timeout: Duration::from_secs(600),
            finalize_timeout: Duration::from_secs(300),
            terminate_grace: OwnedChild::DEFAULT_TERM_GRACE,
            kill_grace: OwnedChild::DEFAULT_KILL_GRACE,
            fatal_min_frames: 10,
            stderr_lines: crate::encode::stderr::DEFAULT_CAPACITY,
            diagnostic_tail_bytes: 1000,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Outcome of a finished encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_written: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
    pub used_hardware_encoder: bool,
}

/// Lifecycle of one encoder invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Init,
    Spawned,
    Streaming,
    Finalizing,
    Done,
    Aborting,
    Terminated,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Terminated)
    }

    pub fn can_advance_to(self, next: Self) -> bool {
        use StreamState::*;
        match (self, next) {
            (Init, Spawned)
            | (Spawned, Streaming)
            | (Spawned, Finalizing)
            | (Streaming, Finalizing)
            | (Finalizing, Done)
            | (Aborting, Terminated) => true,
            (from, Aborting) => !from.is_terminal() && from != Aborting,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct StateTracker(StreamState);

impl StateTracker {
    fn new() -> Self {
        Self(StreamState::Init)
    }

    fn advance(&mut self, next: StreamState) {
        if !self.0.can_advance_to(next) {
            tracing::warn!(from = ?self.0, to = ?next, "unexpected encoder state transition");
        }
        tracing::debug!(from = ?self.0, to = ?next, "encoder state");
        self.0 = next;
    }
}

/// One spawned encoder plus everything the supervising threads share.
struct Session {
    child: OwnedChild,
    stderr: Arc<StderrTail>,
    drain: Option<JoinHandle<()>>,
    progress: Progress,
    abort: AbortSignal,
    done: AtomicBool,
}

impl Session {
    fn join_drain(&mut self) {
        if let Some(handle) = self.drain.take()
            && handle.join().is_err()
        {
            tracing::warn!("encoder stderr drain thread panicked");
        }
    }
}

/// Drives an external transcoder: raw RGB24 frames in, MP4 out, under liveness and memory bounds.
#[derive(Debug)]
pub struct EncoderPipeDriver {
    tools: MediaTools,
    gpu: GpuCapability,
    support: OnceLock<EncoderSupport>,
    limits: EncodeLimits,
    cancel: CancelToken,
}

impl EncoderPipeDriver {
    pub fn new(tools: MediaTools, gpu: GpuCapability) -> Self {
        Self {
            tools,
            gpu,
            support: OnceLock::new(),
            limits: EncodeLimits::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_limits(mut self, limits: EncodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Skip the encoder feature probe and use `support` instead.
    pub fn with_encoder_support(self, support: EncoderSupport) -> Self {
        let _ = self.support.set(support);
        self
    }

    pub fn tools(&self) -> &MediaTools {
        &self.tools
    }

    pub fn limits(&self) -> &EncodeLimits {
        &self.limits
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn select_encoder(&self, preset: QualityPreset) -> VideoEncoder {
        let support = *self
            .support
            .get_or_init(|| EncoderSupport::probe(&self.tools));
        VideoEncoder::select(&preset.spec(), support, &self.gpu)
    }

    /// Feed `frames` to the encoder described by `job` and wait for a finished MP4.
    ///
    /// On any failure the child is reaped, the partial output is removed and the error
    /// carries the encoder's stderr tail, the frame index reached and the output size.
    ///
    /// Abort conditions are checked before and after every pull from `frames`, but a pull that
    /// never returns cannot be interrupted: the caller owns the liveness of its generator.
    /// The encoder is still torn down by the monitor in that case.
    #[tracing::instrument(skip_all, fields(output = %job.output().display(), preset = %job.preset()))]
    pub fn stream<I>(&self, frames: I, job: &EncodeJob) -> WavecastResult<StreamStats>
    where
        I: IntoIterator<Item = WavecastResult<Frame>>,
    {
        job.validate()?;
        let Some((resolution, _)) = job.raw_input() else {
            return Err(WavecastError::config_invalid(
                "stream requires a job with a raw frame input",
            ));
        };
        if self.cancel.is_cancelled() {
            return Err(AbortReason::Cancelled.into_error());
        }
        prepare_output(job.output())?;

        let encoder = self.select_encoder(job.preset());
        let mut state = StateTracker::new();
        let mut session = self.spawn(job, &encoder, true)?;
        state.advance(StreamState::Spawned);

        let output = job.output();
        let result = std::thread::scope(|scope| -> WavecastResult<()> {
            let session = &session;
            let stdin = session.child.take_stdin().ok_or_else(|| {
                WavecastError::encode_failed("failed to open encoder stdin (unexpected)")
            })?;
            let (tx, rx) = crossbeam_channel::bounded::<Frame>(self.limits.queue_capacity.max(1));

            let monitor = scope.spawn(move || self.watch(session, output, true));
            let writer = scope.spawn(move || write_frames(stdin, rx, &session.progress));
            state.advance(StreamState::Streaming);

            let produced = self.produce(frames, resolution, tx, session, output);
            session.progress.finish_producing();
            if produced.is_err() {
                // Unblocks a writer stuck on a full pipe.
                session.child.shutdown();
            }
            let written = writer.join().unwrap_or_else(|_| {
                Err(WavecastError::encode_failed("encoder writer thread panicked"))
            });

            let mut res = match (produced, written) {
                (Ok(()), written) => written,
                (Err(p), Ok(())) => Err(p),
                // A closed queue only means the writer failed first; its error says why.
                (Err(p), Err(w)) if p.kind() == ErrorKind::EncodeFailed => Err(w),
                (Err(p), Err(_)) => Err(p),
            };
            if res.is_ok() {
                state.advance(StreamState::Finalizing);
                res = self.finalize(session, output, self.limits.finalize_timeout);
            }
            session.done.store(true, Ordering::Release);
            if monitor.join().is_err() {
                tracing::warn!("encoder monitor thread panicked");
            }
            res
        });

        self.conclude(result, &mut session, output, &mut state, encoder.is_hardware())
    }

    /// Run a job whose inputs are all files (no frames on stdin).
    ///
    /// A failing hardware encode is retried once with the software encoder.
    #[tracing::instrument(skip_all, fields(output = %job.output().display(), preset = %job.preset()))]
    pub fn run(&self, job: &EncodeJob) -> WavecastResult<StreamStats> {
        job.validate()?;
        if job.raw_input().is_some() {
            return Err(WavecastError::config_invalid(
                "jobs with a raw frame input must be driven through stream",
            ));
        }
        if self.cancel.is_cancelled() {
            return Err(AbortReason::Cancelled.into_error());
        }
        prepare_output(job.output())?;

        let encoder = self.select_encoder(job.preset());
        match self.run_with(job, &encoder) {
            Err(e)
                if encoder.is_hardware()
                    && job.video_output() == VideoOutput::Encode
                    && e.kind() == ErrorKind::EncodeFailed =>
            {
                tracing::warn!(error = %e, "hardware encode failed, retrying with software encoder");
                self.run_with(job, &VideoEncoder::software(&job.preset().spec()))
            }
            other => other,
        }
    }

    fn run_with(&self, job: &EncodeJob, encoder: &VideoEncoder) -> WavecastResult<StreamStats> {
        let mut state = StateTracker::new();
        let mut session = self.spawn(job, encoder, false)?;
        state.advance(StreamState::Spawned);

        let output = job.output();
        let result = std::thread::scope(|scope| {
            let session = &session;
            let monitor = scope.spawn(move || self.watch(session, output, false));
            state.advance(StreamState::Finalizing);
            let res = self.finalize(session, output, self.limits.hard_timeout);
            session.done.store(true, Ordering::Release);
            if monitor.join().is_err() {
                tracing::warn!("encoder monitor thread panicked");
            }
            res
        });

        self.conclude(result, &mut session, output, &mut state, encoder.is_hardware())
    }

    fn spawn(
        &self,
        job: &EncodeJob,
        encoder: &VideoEncoder,
        pipe_frames: bool,
    ) -> WavecastResult<Session> {
        let args = job.args(encoder);
        tracing::debug!(program = %self.tools.ffmpeg.display(), ?args, "encoder argv");

        let mut cmd = Command::new(&self.tools.ffmpeg);
        cmd.args(&args)
            .stdin(if pipe_frames {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let child = OwnedChild::spawn(cmd, "encoder")?
            .with_grace(self.limits.terminate_grace, self.limits.kill_grace);

        let stderr = Arc::new(StderrTail::new(self.limits.stderr_lines));
        let drain = child
            .take_stderr()
            .map(|s| spawn_drain(s, Arc::clone(&stderr)));
        tracing::info!(pid = child.pid(), ?encoder, "encoder spawned");

        Ok(Session {
            child,
            stderr,
            drain,
            progress: Progress::new(),
            abort: AbortSignal::default(),
            done: AtomicBool::new(false),
        })
    }

    fn produce<I>(
        &self,
        frames: I,
        resolution: Resolution,
        tx: Sender<Frame>,
        session: &Session,
        output: &Path,
    ) -> WavecastResult<()>
    where
        I: IntoIterator<Item = WavecastResult<Frame>>,
    {
        let poll_every = self.limits.memory_poll_frames.max(1);
        let mut frames = frames.into_iter();
        for idx in 0u64.. {
            if let Some(reason) = session.abort.reason() {
                return Err(reason.into_error());
            }
            if self.cancel.is_cancelled() {
                return Err(session.abort.abort(AbortReason::Cancelled));
            }
            let Some(frame) = frames.next() else {
                break;
            };
            // The monitor may have given up on us while the generator was busy.
            if let Some(reason) = session.abort.reason() {
                return Err(reason.into_error());
            }
            let frame = frame?;
            if frame.resolution() != resolution {
                return Err(WavecastError::config_invalid(format!(
                    "frame {idx} is {}x{}, encoder expects {}",
                    frame.width(),
                    frame.height(),
                    resolution.ffmpeg_size()
                )));
            }
            session.progress.frame_produced();

            if idx % poll_every == 0 {
                self.check_memory(session)?;
            }
            if idx % PROGRESS_EVERY == 0 {
                tracing::debug!(
                    frame = idx,
                    frames_written = session.progress.frames_written(),
                    elapsed_ms = session.progress.elapsed().as_millis() as u64,
                    output_bytes = file_len(output),
                    "encode progress"
                );
            }
            self.enqueue(&tx, frame, session)?;
        }
        Ok(())
    }

    fn enqueue(&self, tx: &Sender<Frame>, mut frame: Frame, session: &Session) -> WavecastResult<()> {
        let start = Instant::now();
        loop {
            if let Some(reason) = session.abort.reason() {
                return Err(reason.into_error());
            }
            match tx.send_timeout(frame, self.limits.poll_interval) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(f)) => {
                    frame = f;
                    let waited = start.elapsed();
                    if waited >= self.limits.queue_wait {
                        return Err(session.abort.abort(AbortReason::QueueFull(waited)));
                    }
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(WavecastError::encode_failed(
                        "encoder stopped accepting frames",
                    ));
                }
            }
        }
    }

    fn check_memory(&self, session: &Session) -> WavecastResult<()> {
        let ceiling = self.limits.memory_ceiling_bytes;
        if let Some(used) = memory::pipeline_resident_bytes(Some(session.child.pid()))
            && used > ceiling
        {
            return Err(session
                .abort
                .abort(AbortReason::MemoryExceeded { used, ceiling }));
        }
        Ok(())
    }

    /// Wait for the child to exit on its own, then verify the output.
    fn finalize(&self, session: &Session, output: &Path, limit: Duration) -> WavecastResult<()> {
        let start = Instant::now();
        loop {
            if let Some(reason) = session.abort.reason() {
                return Err(reason.into_error());
            }
            if let Some(status) = session.child.try_wait()? {
                if !status.success() {
                    return Err(WavecastError::encode_failed(format!(
                        "encoder exited with {status}"
                    )));
                }
                if file_len(output) == 0 {
                    return Err(WavecastError::encode_failed(
                        "encoder exited successfully but the output is empty",
                    ));
                }
                return Ok(());
            }
            if start.elapsed() >= limit {
                return Err(session.abort.abort(AbortReason::FinalizeTimeout(limit)));
            }
            std::thread::sleep(FINALIZE_POLL);
        }
    }

    /// Monitor loop; runs until the driver sets `done` or an abort is raised.
    fn watch(&self, session: &Session, output: &Path, frames: bool) {
        let (limits, progress, stderr) = (&self.limits, &session.progress, &*session.stderr);
        let mut monitor = if frames {
            LivenessMonitor::for_stream(limits, progress, stderr, &self.cancel)
        } else {
            LivenessMonitor::for_files(limits, progress, stderr, &self.cancel)
        };
        let poll = limits.poll_interval.min(MAX_MONITOR_POLL);
        while !session.done.load(Ordering::Acquire) && !session.abort.is_raised() {
            let len = std::fs::metadata(output).ok().map(|m| m.len());
            if let Some(reason) = monitor.check(progress.elapsed(), len) {
                if session.abort.raise(reason) {
                    session.child.shutdown();
                }
                return;
            }
            std::thread::sleep(poll);
        }
    }

    fn conclude(
        &self,
        result: WavecastResult<()>,
        session: &mut Session,
        output: &Path,
        state: &mut StateTracker,
        used_hardware_encoder: bool,
    ) -> WavecastResult<StreamStats> {
        match result {
            Ok(()) => {
                session.join_drain();
                state.advance(StreamState::Done);
                let stats = StreamStats {
                    frames_written: session.progress.frames_written(),
                    output_bytes: file_len(output),
                    elapsed: session.progress.elapsed(),
                    used_hardware_encoder,
                };
                tracing::info!(
                    frames = stats.frames_written,
                    bytes = stats.output_bytes,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "encode finished"
                );
                Ok(stats)
            }
            Err(err) => {
                state.advance(StreamState::Aborting);
                session.child.shutdown();
                session.join_drain();
                let err = session.abort.reason().map_or(err, AbortReason::into_error);
                let diagnostics = EncoderDiagnostics {
                    stderr_tail: session.stderr.tail_bytes(self.limits.diagnostic_tail_bytes),
                    frame_index: Some(session.progress.frames_written()),
                    output_bytes: file_len(output),
                };
                remove_partial(output);
                state.advance(StreamState::Terminated);
                tracing::warn!(error = %err, "encode aborted");
                Err(err.with_diagnostics(diagnostics))
            }
        }
    }
}

fn write_frames(
    mut stdin: ChildStdin,
    rx: Receiver<Frame>,
    progress: &Progress,
) -> WavecastResult<()> {
    for frame in rx.iter() {
        let idx = progress.frames_written();
        stdin
            .write_all(frame.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(|e| {
                WavecastError::encode_failed(format!(
                    "failed to write frame {idx} to encoder stdin: {e}"
                ))
            })?;
        progress.frame_written();
    }
    Ok(())
}

fn prepare_output(output: &Path) -> WavecastResult<()> {
    ensure_parent_dir(output)?;
    if output.exists() {
        use anyhow::Context as _;
        std::fs::remove_file(output)
            .with_context(|| format!("failed to replace existing output '{}'", output.display()))?;
    }
    Ok(())
}

fn remove_partial(output: &Path) {
    if output.exists()
        && let Err(e) = std::fs::remove_file(output)
    {
        tracing::warn!(path = %output.display(), error = %e, "failed to remove partial output");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/driver.rs"]
mod tests;
