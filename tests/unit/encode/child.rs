use super::*;

#[test]
fn spawn_failure_is_encode_failed() {
    let err = OwnedChild::spawn(Command::new("/nonexistent/wavecast-encoder"), "encoder").unwrap_err();
    assert_eq!(err.kind(), crate::foundation::error::ErrorKind::EncodeFailed);
}

#[cfg(unix)]
#[test]
fn shutdown_reaps_a_sleeping_child() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "sleep 30"]).stdin(std::process::Stdio::piped());
    let child = OwnedChild::spawn(cmd, "sleeper")
        .unwrap()
        .with_grace(Duration::from_millis(500), Duration::from_millis(500));
    assert!(!child.has_exited());

    let start = Instant::now();
    let status = child.shutdown();
    assert!(status.is_some());
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(child.has_exited());
}

#[cfg(unix)]
#[test]
fn shutdown_kills_a_child_that_ignores_terminate() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "trap '' TERM; while true; do sleep 1; done"]);
    let child = OwnedChild::spawn(cmd, "stubborn")
        .unwrap()
        .with_grace(Duration::from_millis(300), Duration::from_secs(2));
    std::thread::sleep(Duration::from_millis(100));
    assert!(child.shutdown().is_some());
}

#[cfg(unix)]
#[test]
fn wait_timeout_reports_natural_exit() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "exit 3"]);
    let child = OwnedChild::spawn(cmd, "quick").unwrap();
    let status = child.wait_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert_eq!(status.code(), Some(3));
    // Remembered after the first observation.
    assert_eq!(child.try_wait().unwrap().and_then(|s| s.code()), Some(3));
}

#[cfg(unix)]
#[test]
fn kill_after_exit_leaves_the_status_alone() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "exit 0"]);
    let child = OwnedChild::spawn(cmd, "done").unwrap();
    let status = child.wait_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(status.success());

    child.kill();
    child.terminate();
    assert_eq!(child.try_wait().unwrap(), Some(status));
    assert_eq!(child.shutdown(), Some(status));
}
