use std::process::{Child, ChildStderr, ChildStdin, Command, ExitStatus};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::foundation::error::{WavecastError, WavecastResult};

const POLL: Duration = Duration::from_millis(20);

/// An external process that is always reaped.
///
/// Every exit path ends in [`OwnedChild::shutdown`]: pipe handles are closed, the
/// process (and on unix its whole process group) gets a terminate request, then a
/// kill if it outlives the grace period. `Drop` runs the same sequence.
#[derive(Debug)]
pub struct OwnedChild {
    child: Mutex<Child>,
    pid: u32,
    label: String,
    exit: Mutex<Option<ExitStatus>>,
    term_grace: Duration,
    kill_grace: Duration,
}

impl OwnedChild {
    pub const DEFAULT_TERM_GRACE: Duration = Duration::from_secs(2);
    pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(1);

    /// Spawn `cmd` in its own process group so the group can be signalled as a unit.
    pub fn spawn(mut cmd: Command, label: impl Into<String>) -> WavecastResult<Self> {
        let label = label.into();
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            cmd.process_group(0);
        }
        let child = cmd.spawn().map_err(|e| {
            WavecastError::encode_failed(format!(
                "failed to spawn {label} (is it installed and on PATH?): {e}"
            ))
        })?;
        let pid = child.id();
        tracing::debug!(pid, label = %label, "spawned child");
        Ok(Self {
            child: Mutex::new(child),
            pid,
            label,
            exit: Mutex::new(None),
            term_grace: Self::DEFAULT_TERM_GRACE,
            kill_grace: Self::DEFAULT_KILL_GRACE,
        })
    }

    pub fn with_grace(mut self, term_grace: Duration, kill_grace: Duration) -> Self {
        self.term_grace = term_grace;
        self.kill_grace = kill_grace;
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn exit_slot(&self) -> MutexGuard<'_, Option<ExitStatus>> {
        self.exit.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn take_stdin(&self) -> Option<ChildStdin> {
        self.lock().stdin.take()
    }

    pub fn take_stderr(&self) -> Option<ChildStderr> {
        self.lock().stderr.take()
    }

    /// Non-blocking exit check. The status is remembered once observed.
    pub fn try_wait(&self) -> WavecastResult<Option<ExitStatus>> {
        if let Some(status) = *self.exit_slot() {
            return Ok(Some(status));
        }
        let status = self.lock().try_wait().map_err(|e| {
            WavecastError::encode_failed(format!("failed to poll {}: {e}", self.label))
        })?;
        if let Some(s) = status {
            *self.exit_slot() = Some(s);
        }
        Ok(status)
    }

    /// Poll until the child exits or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> WavecastResult<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            std::thread::sleep(POLL);
        }
    }

    pub fn has_exited(&self) -> bool {
        matches!(self.try_wait(), Ok(Some(_)))
    }

    /// Ask the process group to exit.
    pub fn terminate(&self) {
        if self.has_exited() {
            return;
        }
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;
            if let Ok(pid) = i32::try_from(self.pid)
                && let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGTERM)
            {
                tracing::debug!(pid, error = %e, "SIGTERM to process group failed");
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.lock().kill();
        }
    }

    /// Forcefully kill the process group.
    ///
    /// A reaped child's pgid may already belong to another group, so nothing is signalled
    /// once an exit status has been observed.
    pub fn kill(&self) {
        if self.has_exited() {
            return;
        }
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;
            if let Ok(pid) = i32::try_from(self.pid) {
                let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
            }
        }
        if !self.has_exited() {
            let _ = self.lock().kill();
        }
    }

    /// Close pipes, terminate, wait, kill, wait. Returns the exit status if the child was reaped.
    pub fn shutdown(&self) -> Option<ExitStatus> {
        {
            let mut child = self.lock();
            drop(child.stdin.take());
            drop(child.stdout.take());
            drop(child.stderr.take());
        }
        if let Ok(Some(status)) = self.try_wait() {
            return Some(status);
        }
        self.terminate();
        if let Ok(Some(status)) = self.wait_timeout(self.term_grace) {
            return Some(status);
        }
        tracing::warn!(pid = self.pid, label = %self.label, "child ignored terminate, killing");
        self.kill();
        match self.wait_timeout(self.kill_grace) {
            Ok(Some(status)) => Some(status),
            _ => {
                tracing::warn!(pid = self.pid, label = %self.label, "child could not be reaped");
                None
            }
        }
    }
}

impl Drop for OwnedChild {
    fn drop(&mut self) {
        if !self.has_exited() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/child.rs"]
mod tests;
