use super::*;
use crate::foundation::core::Resolution;
use crate::viz::config::VisualizationStyle;

fn tone(len: usize, hz: f32, amp: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amp * (i as f32 * hz * std::f32::consts::TAU / 44_100.0).sin())
        .collect()
}

fn setup(style: VisualizationStyle) -> (VisualizationConfig, FrameLayout) {
    let cfg = VisualizationConfig {
        resolution: Resolution::new(320, 180).unwrap(),
        style,
        ..VisualizationConfig::default()
    }
    .resolve()
    .unwrap();
    let layout = FrameLayout::new(&cfg).unwrap();
    (cfg, layout)
}

#[test]
fn spectrum_peaks_near_tone_frequency() {
    let analyzer = SpectrumAnalyzer::default();
    let bars = analyzer.bars(&tone(FFT_SIZE, 440.0, 0.5), 64);
    assert_eq!(bars.len(), 64);
    let argmax = bars
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert!((25..=30).contains(&argmax), "peak bar {argmax}");
    assert!(analyzer.bars(&[], 8).iter().all(|&m| m == 0.0));
}

#[test]
fn spectrum_scene_draws_bars_per_line() {
    let (mut cfg, _) = setup(VisualizationStyle::Spectrum);
    cfg.num_lines = 2;
    let layout = FrameLayout::new(&cfg).unwrap();
    let scene = spectrum_scene(&cfg, &layout, &SpectrumAnalyzer::default(), &tone(3675, 440.0, 0.5));
    assert_eq!(scene.shapes.len(), 2);
    for s in &scene.shapes {
        match &s.primitive {
            Primitive::Segments(segs) => assert_eq!(segs.len(), MAX_BARS),
            other => panic!("{other:?}"),
        }
    }
}

#[test]
fn circular_scene_is_closed_ring_around_band_center() {
    let (cfg, layout) = setup(VisualizationStyle::Circular);
    let scene = circular_scene(&cfg, &layout, &tone(3675, 440.0, 0.5));
    assert_eq!(scene.shapes.len(), 1);
    let Primitive::Polyline { points, closed } = &scene.shapes[0].primitive else {
        panic!("expected polyline");
    };
    assert!(*closed);
    let c = layout.bands[0].center();
    let max_r = 0.5 * layout.bands[0].extent();
    for p in points {
        let d = (*p - c).hypot();
        assert!(d > 0.3 * max_r && d <= max_r + 1e-9, "{d}");
    }
}

#[test]
fn particles_are_seeded_and_drift() {
    let (cfg, layout) = setup(VisualizationStyle::Particles);
    let field = ParticleField::new(&cfg, layout.bands.len());
    assert_eq!(field, ParticleField::new(&cfg, layout.bands.len()));

    let samples = tone(3675, 440.0, 0.5);
    let a = field.scene(&cfg, &layout, 0, &samples);
    let b = field.scene(&cfg, &layout, 0, &samples);
    let later = field.scene(&cfg, &layout, 10, &samples);
    assert_eq!(a, b);
    assert_ne!(a.shapes[0].primitive, later.shapes[0].primitive);

    let Primitive::Dots { centers, radius } = &a.shapes[0].primitive else {
        panic!("expected dots");
    };
    assert_eq!(centers.len(), PARTICLES_PER_BAND);
    let quiet = field.scene(&cfg, &layout, 0, &[0.0; 100]);
    let Primitive::Dots { radius: r0, .. } = &quiet.shapes[0].primitive else {
        panic!("expected dots");
    };
    assert!(radius > r0);
}
