//! Resident-memory sampling from `/proc`. Returns `None` where `/proc` is unavailable.

/// Parse the `VmRSS:` line of a `/proc/<pid>/status` file into bytes.
pub fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut parts = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    let scale = match parts.next().unwrap_or("kB") {
        "kB" | "KB" => 1024,
        "mB" | "MB" => 1024 * 1024,
        "B" => 1,
        _ => return None,
    };
    value.checked_mul(scale)
}

pub fn resident_bytes(pid: u32) -> Option<u64> {
    read_status(&format!("/proc/{pid}/status"))
}

pub fn self_resident_bytes() -> Option<u64> {
    read_status("/proc/self/status")
}

fn read_status(path: &str) -> Option<u64> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| parse_vm_rss(&s))
}

/// Combined resident set of this process and the encoder child.
pub fn pipeline_resident_bytes(child_pid: Option<u32>) -> Option<u64> {
    let own = self_resident_bytes();
    let child = child_pid.and_then(resident_bytes);
    match (own, child) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/memory.rs"]
mod tests;
