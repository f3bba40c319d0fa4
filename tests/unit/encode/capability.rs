use super::*;
use crate::encode::preset::QualityPreset;

#[test]
fn parses_nvidia_smi_csv() {
    let cap = parse_gpu_query("NVIDIA GeForce RTX 3080, 10240\n").unwrap();
    assert!(cap.available);
    assert_eq!(cap.name.as_deref(), Some("NVIDIA GeForce RTX 3080"));
    assert_eq!(cap.total_memory_mb, Some(10240));
    assert_eq!(parse_gpu_query("\n"), None);
}

#[test]
fn encoder_listing_detects_hardware_h264() {
    let listing = " V....D libx264              libx264 H.264 / AVC\n V....D h264_nvenc           NVIDIA NVENC H.264 encoder\n";
    assert!(EncoderSupport::from_listing(listing).hardware_h264);
    let sw_only = " V....D libx264              libx264 H.264 / AVC\n";
    assert!(!EncoderSupport::from_listing(sw_only).hardware_h264);
}

#[test]
fn hardware_needs_both_encoder_and_gpu() {
    let spec = QualityPreset::Fast.spec();
    let hw = EncoderSupport {
        hardware_h264: true,
    };
    let gpu = GpuCapability {
        available: true,
        name: Some("gpu".into()),
        total_memory_mb: None,
    };
    assert_eq!(
        VideoEncoder::select(&spec, hw, &gpu),
        VideoEncoder::Hardware { preset: "p6", cq: 26 }
    );
    assert_eq!(
        VideoEncoder::select(&spec, hw, &GpuCapability::none()),
        VideoEncoder::Software { preset: "faster", crf: 26 }
    );
    assert_eq!(
        VideoEncoder::select(&spec, EncoderSupport::default(), &gpu),
        VideoEncoder::Software { preset: "faster", crf: 26 }
    );
}

#[test]
fn software_args_carry_crf_and_rate_limits() {
    let spec = QualityPreset::Fastest.spec();
    let args = VideoEncoder::software(&spec).args(&spec);
    let joined = args.join(" ");
    assert!(joined.contains("-c:v libx264 -preset faster -crf 28"));
    assert!(joined.contains("-maxrate 3M -bufsize 6M"));
}

#[test]
fn no_gpu_means_no_utilization() {
    assert_eq!(GpuCapability::none().sample_utilization(), None);
}
