use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        WavecastError::input_missing("x")
            .to_string()
            .contains("input missing:")
    );
    assert!(
        WavecastError::audio_invalid("x")
            .to_string()
            .contains("audio invalid:")
    );
    assert!(
        WavecastError::config_invalid("x")
            .to_string()
            .contains("config invalid:")
    );
    assert!(WavecastError::stalled("x").to_string().contains("stalled:"));
    assert!(
        WavecastError::cancelled("x")
            .to_string()
            .contains("cancelled:")
    );
}

#[test]
fn kind_matches_variant() {
    assert_eq!(
        WavecastError::encode_failed("x").kind(),
        ErrorKind::EncodeFailed
    );
    assert_eq!(
        WavecastError::resource_exhausted("x").kind(),
        ErrorKind::ResourceExhausted
    );
    assert_eq!(
        WavecastError::Other(anyhow::anyhow!("x")).kind(),
        ErrorKind::Other
    );
}

#[test]
fn diagnostics_are_carried_into_display() {
    let err = WavecastError::stalled("no output growth").with_diagnostics(EncoderDiagnostics {
        stderr_tail: "Broken pipe".to_string(),
        frame_index: Some(42),
        output_bytes: 0,
    });
    let msg = err.to_string();
    assert!(msg.contains("frame 42"));
    assert!(msg.contains("Broken pipe"));
    assert_eq!(err.diagnostics().unwrap().frame_index, Some(42));
}

#[test]
fn diagnostics_are_ignored_for_plain_variants() {
    let err = WavecastError::config_invalid("bad").with_diagnostics(EncoderDiagnostics::default());
    assert!(err.diagnostics().is_none());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = WavecastError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
