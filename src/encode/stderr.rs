use std::collections::VecDeque;
use std::io::{BufRead as _, BufReader, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

/// Substrings (case-insensitive) that mark an encoder stderr line as fatal.
pub const FATAL_KEYWORDS: [&str; 4] = ["error", "failed", "cannot open", "no such file"];

/// Default number of stderr lines retained.
pub const DEFAULT_CAPACITY: usize = 200;

pub fn is_fatal_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    FATAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[derive(Debug, Default)]
struct TailInner {
    lines: VecDeque<String>,
    first_fatal: Option<String>,
    total: u64,
}

/// Append-only ring of the most recent encoder stderr lines.
///
/// Written by the drain thread, read by the driver and the liveness monitor.
#[derive(Debug)]
pub struct StderrTail {
    inner: Mutex<TailInner>,
    capacity: usize,
}

impl Default for StderrTail {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StderrTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TailInner::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TailInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        let mut inner = self.lock();
        if inner.first_fatal.is_none() && is_fatal_line(&line) {
            inner.first_fatal = Some(line.clone());
        }
        if inner.lines.len() == self.capacity {
            inner.lines.pop_front();
        }
        inner.lines.push_back(line);
        inner.total += 1;
    }

    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.iter().cloned().collect()
    }

    /// Lines seen since creation, including evicted ones.
    pub fn total_lines(&self) -> u64 {
        self.lock().total
    }

    /// First line that matched a fatal keyword, even if it was evicted.
    pub fn first_fatal(&self) -> Option<String> {
        self.lock().first_fatal.clone()
    }

    /// The last `max_bytes` bytes of the retained text, cut on a char boundary.
    pub fn tail_bytes(&self, max_bytes: usize) -> String {
        let joined = self
            .lock()
            .lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if joined.len() <= max_bytes {
            return joined;
        }
        let mut start = joined.len() - max_bytes;
        while !joined.is_char_boundary(start) {
            start += 1;
        }
        joined[start..].to_string()
    }
}

/// Read `stream` line by line into `tail` until EOF.
pub fn spawn_drain<R>(stream: R, tail: Arc<StderrTail>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    tracing::debug!(target: "wavecast::encoder", "{line}");
                    tail.push(line);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "encoder stderr read failed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/stderr.rs"]
mod tests;
