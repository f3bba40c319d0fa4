use super::*;
use crate::foundation::core::FrameIndex;

fn small_cfg() -> VisualizationConfig {
    VisualizationConfig {
        resolution: Resolution::new(160, 90).unwrap(),
        ..VisualizationConfig::default()
    }
    .resolve()
    .unwrap()
}

fn windows(n: u64) -> Vec<AudioWindow> {
    (0..n)
        .map(|i| AudioWindow {
            index: FrameIndex(i),
            samples: (0..3675)
                .map(|k| {
                    let amp = 0.05 * (i + 1) as f32;
                    amp * (k as f32 * 0.0627).sin()
                })
                .collect(),
        })
        .collect()
}

#[test]
fn frame_has_output_shape() {
    let mut r = Renderer::new(small_cfg()).unwrap();
    let f = r.render_frame(&windows(1)[0]).unwrap();
    assert_eq!(f.resolution(), Resolution::new(160, 90).unwrap());
    assert_eq!(f.as_bytes().len(), 160 * 90 * 3);
    assert!(f.count_lit() > 0);
}

#[test]
fn parallel_matches_sequential() {
    let ws = windows(7);
    let seq: Vec<Frame> = Renderer::new(small_cfg())
        .unwrap()
        .into_frames(ws.clone().into_iter(), RenderThreading::default())
        .unwrap()
        .collect::<WavecastResult<_>>()
        .unwrap();
    let par: Vec<Frame> = Renderer::new(small_cfg())
        .unwrap()
        .into_frames(
            ws.into_iter(),
            RenderThreading {
                parallel: true,
                chunk_size: 3,
                threads: Some(2),
            },
        )
        .unwrap()
        .collect::<WavecastResult<_>>()
        .unwrap();
    assert_eq!(seq.len(), 7);
    assert_eq!(seq, par);
}

#[test]
fn zero_threads_is_rejected() {
    let err = Renderer::new(small_cfg())
        .unwrap()
        .into_frames(
            windows(1).into_iter(),
            RenderThreading {
                parallel: true,
                chunk_size: 1,
                threads: Some(0),
            },
        )
        .err()
        .unwrap();
    assert_eq!(err.kind(), crate::foundation::error::ErrorKind::ConfigInvalid);
}

#[test]
fn every_style_keeps_black_background() {
    for style in [
        VisualizationStyle::Waveform,
        VisualizationStyle::Spectrum,
        VisualizationStyle::Circular,
        VisualizationStyle::Particles,
    ] {
        let cfg = VisualizationConfig {
            style,
            ..small_cfg()
        };
        let mut r = Renderer::new(cfg).unwrap();
        let f = r.render_frame(&windows(3)[2]).unwrap();
        assert!(f.count_lit() > 0, "{style:?} drew nothing");
        assert_eq!(f.pixel(0, 0), Some(crate::foundation::core::Rgb8::BLACK), "{style:?}");
    }
}
