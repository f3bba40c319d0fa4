use super::*;

#[test]
fn table_matches_fixed_values() {
    let f = QualityPreset::Fastest.spec();
    assert_eq!(f.resolution, Resolution::new(854, 480).unwrap());
    assert_eq!((f.hw_preset, f.sw_preset, f.quality), ("p7", "faster", 28));
    assert_eq!((f.video_bitrate, f.max_bitrate, f.buffer_size), ("2M", "3M", "6M"));
    assert_eq!(f.audio_bitrate, "128k");

    let h = QualityPreset::High.spec();
    assert_eq!(h.resolution, Resolution::new(1920, 1080).unwrap());
    assert_eq!((h.hw_preset, h.quality, h.audio_bitrate), ("p4", 23, "192k"));
    assert_eq!(QualityPreset::Fast.spec().hw_preset, "p6");
    assert_eq!(QualityPreset::Medium.spec().max_bitrate, "5M");
}

#[test]
fn every_preset_is_yuv420_compatible() {
    for p in QualityPreset::ALL {
        assert!(p.resolution().is_yuv420_compatible(), "{p}");
    }
}

#[test]
fn parses_names() {
    assert_eq!("HIGH".parse::<QualityPreset>().unwrap(), QualityPreset::High);
    assert!("ultra".parse::<QualityPreset>().is_err());
    let p: QualityPreset = serde_json::from_str("\"medium\"").unwrap();
    assert_eq!(p, QualityPreset::Medium);
}
