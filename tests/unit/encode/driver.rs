use super::*;
use crate::encode::job::InputSpec;
use crate::foundation::core::Fps;

fn job(dir: &Path) -> EncodeJob {
    EncodeJob::new(dir.join("out.mp4"), QualityPreset::Fastest, Fps::integer(30).unwrap()).input(
        InputSpec::RawFrames {
            resolution: Resolution::new(64, 64).unwrap(),
            fps: Fps::integer(30).unwrap(),
        },
    )
}

fn driver() -> EncoderPipeDriver {
    EncoderPipeDriver::new(
        MediaTools::new("/nonexistent/wavecast-ffmpeg", "/nonexistent/wavecast-ffprobe"),
        GpuCapability::none(),
    )
    .with_encoder_support(EncoderSupport::default())
}

#[test]
fn default_limits_match_supervision_contract() {
    let l = EncodeLimits::default();
    assert_eq!(l.queue_capacity, 100);
    assert_eq!(l.queue_wait, Duration::from_secs(5));
    assert_eq!(l.memory_ceiling_bytes, 15 << 30);
    assert_eq!(l.memory_poll_frames, 30);
    assert_eq!(l.stall_timeout, Duration::from_secs(30));
    assert_eq!(l.inter_frame_timeout, Duration::from_secs(10));
    assert_eq!(l.hard_timeout, Duration::from_secs(600));
    assert_eq!(l.finalize_timeout, Duration::from_secs(300));
    assert_eq!((l.terminate_grace, l.kill_grace), (Duration::from_secs(2), Duration::from_secs(1)));
    assert_eq!((l.stderr_lines, l.diagnostic_tail_bytes), (200, 1000));
    assert!(l.poll_interval <= Duration::from_millis(500));
}

#[test]
fn state_machine_allows_only_forward_edges() {
    use StreamState::*;
    let happy = [Init, Spawned, Streaming, Finalizing, Done];
    for pair in happy.windows(2) {
        assert!(pair[0].can_advance_to(pair[1]), "{pair:?}");
    }
    for s in [Init, Spawned, Streaming, Finalizing] {
        assert!(s.can_advance_to(Aborting));
    }
    assert!(Aborting.can_advance_to(Terminated));
    assert!(!Done.can_advance_to(Aborting));
    assert!(!Terminated.can_advance_to(Spawned));
    assert!(!Streaming.can_advance_to(Done));
    assert!(Done.is_terminal() && Terminated.is_terminal() && !Aborting.is_terminal());
}

#[test]
fn cancel_token_is_shared_between_clones() {
    let a = CancelToken::new();
    let b = a.clone();
    assert!(!b.is_cancelled());
    a.cancel();
    assert!(b.is_cancelled());
}

#[test]
fn software_encoder_is_selected_without_gpu() {
    let d = driver();
    assert!(!d.select_encoder(QualityPreset::High).is_hardware());
}

#[test]
fn stream_requires_raw_input_and_run_rejects_it() {
    let dir = tempfile::tempdir().unwrap();
    let d = driver();
    let file_only = EncodeJob::new(dir.path().join("o.mp4"), QualityPreset::Fastest, Fps::integer(30).unwrap())
        .input(InputSpec::Media { path: "a.mp4".into() });
    let err = d.stream(std::iter::empty(), &file_only).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert_eq!(d.run(&job(dir.path())).unwrap_err().kind(), ErrorKind::ConfigInvalid);
}

#[test]
fn cancelled_before_start_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let d = driver().with_cancel(cancel);
    let err = d.stream(std::iter::empty(), &job(dir.path())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn missing_encoder_binary_is_encode_failed() {
    let dir = tempfile::tempdir().unwrap();
    let frames = (0..3).map(|_| Ok(Frame::black(Resolution::new(64, 64).unwrap())));
    let err = driver().stream(frames, &job(dir.path())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EncodeFailed);
    assert!(!dir.path().join("out.mp4").exists());
}
