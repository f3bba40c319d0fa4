use super::*;
use crate::foundation::error::ErrorKind;

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

struct Fixture {
    limits: EncodeLimits,
    progress: Progress,
    stderr: StderrTail,
    cancel: CancelToken,
}

impl Fixture {
    fn new() -> Self {
        Self {
            limits: EncodeLimits::default(),
            progress: Progress::new(),
            stderr: StderrTail::default(),
            cancel: CancelToken::new(),
        }
    }

    fn stream(&self) -> LivenessMonitor<'_> {
        LivenessMonitor::for_stream(&self.limits, &self.progress, &self.stderr, &self.cancel)
    }

    fn write_frames(&self, n: u64, at: Duration) {
        for _ in 0..n {
            self.progress.frame_produced_at(at);
            self.progress.frame_written_at(at);
        }
    }
}

#[test]
fn healthy_stream_passes() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    fx.write_frames(30, secs(0.5));
    assert_eq!(mon.check(secs(1.0), Some(0)), None);
    fx.write_frames(60, secs(2.0));
    assert_eq!(mon.check(secs(2.1), Some(4096)), None);
}

#[test]
fn no_first_frame_times_out_after_five_seconds() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    assert_eq!(mon.check(secs(4.9), None), None);
    assert_eq!(
        mon.check(secs(5.0), None),
        Some(AbortReason::FirstFrameTimeout(secs(5.0)))
    );
}

#[test]
fn zero_byte_output_aborts_after_grace() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    fx.write_frames(60, secs(0.2));
    assert_eq!(mon.check(secs(3.0), Some(0)), None);
    fx.progress.frame_produced_at(secs(3.1));
    assert!(matches!(
        mon.check(secs(3.3), Some(0)),
        Some(AbortReason::ZeroByteOutput(_))
    ));
}

#[test]
fn missing_output_is_not_zero_bytes() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    fx.write_frames(60, secs(0.2));
    fx.progress.frame_produced_at(secs(3.4));
    assert_eq!(mon.check(secs(3.5), None), None);
}

#[test]
fn inter_frame_gap_aborts() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    fx.write_frames(5, secs(1.0));
    assert_eq!(mon.check(secs(10.9), Some(100)), None);
    assert_eq!(
        mon.check(secs(11.0), Some(100)),
        Some(AbortReason::InterFrameTimeout(secs(10.0)))
    );
}

#[test]
fn inter_frame_gap_is_ignored_once_production_finished() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    fx.write_frames(5, secs(1.0));
    fx.progress.finish_producing();
    assert_eq!(mon.check(secs(20.0), Some(100)), None);
}

#[test]
fn no_growth_for_thirty_seconds_while_frames_arrive_is_a_stall() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    let mut t = 0.0;
    let mut verdict = None;
    while t <= 40.0 && verdict.is_none() {
        fx.write_frames(1, secs(t));
        let size = if t < 5.0 { None } else { Some(1000) };
        verdict = mon.check(secs(t + 0.1), size);
        t += 0.5;
    }
    match verdict {
        Some(AbortReason::NoOutputGrowth(idle)) => assert!(idle > secs(30.0)),
        other => panic!("expected stall, got {other:?}"),
    }
}

#[test]
fn fatal_stderr_needs_minimum_frames() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    fx.stderr.push("Error while opening encoder");
    fx.write_frames(9, secs(0.1));
    assert_eq!(mon.check(secs(0.2), Some(0)), None);
    fx.write_frames(1, secs(0.3));
    assert_eq!(
        mon.check(secs(0.4), Some(0)),
        Some(AbortReason::FatalStderr("Error while opening encoder".into()))
    );
}

#[test]
fn cancel_and_hard_timeout_win() {
    let fx = Fixture::new();
    let mut mon = fx.stream();
    fx.write_frames(1, secs(599.0));
    assert_eq!(mon.check(secs(600.0), Some(1)), Some(AbortReason::HardTimeout(secs(600.0))));
    fx.cancel.cancel();
    assert_eq!(mon.check(secs(1.0), Some(1)), Some(AbortReason::Cancelled));
}

#[test]
fn file_jobs_skip_frame_rules() {
    let fx = Fixture::new();
    let mut mon = LivenessMonitor::for_files(&fx.limits, &fx.progress, &fx.stderr, &fx.cancel);
    fx.stderr.push("error: non-fatal decode glitch");
    assert_eq!(mon.check(secs(6.0), Some(10)), None);
    assert_eq!(mon.check(secs(11.0), Some(20)), None);
    assert!(matches!(
        mon.check(secs(45.0), Some(20)),
        Some(AbortReason::NoOutputGrowth(_))
    ));
}

#[test]
fn reasons_map_to_error_kinds() {
    assert_eq!(AbortReason::Cancelled.into_error().kind(), ErrorKind::Cancelled);
    assert_eq!(
        AbortReason::QueueFull(secs(5.0)).into_error().kind(),
        ErrorKind::Stalled
    );
    assert_eq!(
        AbortReason::MemoryExceeded { used: 2, ceiling: 1 }.into_error().kind(),
        ErrorKind::ResourceExhausted
    );
    assert_eq!(
        AbortReason::FatalStderr("x".into()).into_error().kind(),
        ErrorKind::EncodeFailed
    );
}

#[test]
fn abort_signal_keeps_first_reason() {
    let sig = AbortSignal::default();
    assert!(!sig.is_raised());
    assert!(sig.raise(AbortReason::Cancelled));
    assert!(!sig.raise(AbortReason::HardTimeout(secs(1.0))));
    assert!(sig.is_raised());
    assert_eq!(sig.reason(), Some(AbortReason::Cancelled));
}
