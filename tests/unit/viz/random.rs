use super::*;

#[test]
fn same_seed_gives_same_config() {
    let mut a = VisualizationConfig {
        seed: 7,
        ..VisualizationConfig::default()
    };
    let mut b = a.clone();
    randomize(&mut a);
    randomize(&mut b);
    assert_eq!(a, b);
}

#[test]
fn randomized_fields_stay_in_bounds() {
    for seed in 0..64 {
        let mut cfg = VisualizationConfig {
            seed,
            ..VisualizationConfig::default()
        };
        randomize(&mut cfg);
        assert!((1..=4).contains(&cfg.num_lines));
        assert!((15..=40).contains(&cfg.height_percent));
        assert!((0.7..=1.0).contains(&cfg.opacity));
        assert_eq!(
            cfg.line_colors.as_ref().map(Vec::len),
            Some(cfg.num_lines as usize)
        );
        let t = cfg.line_thickness.for_line(0);
        assert!((2..=8).contains(&t));
    }
}

#[test]
fn randomize_keeps_pinned_geometry() {
    let mut cfg = VisualizationConfig {
        position: "left".to_string(),
        rotation: 30.0,
        num_instances: 3,
        seed: 3,
        ..VisualizationConfig::default()
    };
    randomize(&mut cfg);
    assert_eq!(cfg.position, "left");
    assert_eq!(cfg.rotation, 30.0);
    assert_eq!(cfg.num_instances, 3);
}

#[test]
fn lerp_hits_endpoints() {
    let a = Rgb8::new(0, 0, 0);
    let b = Rgb8::new(200, 100, 50);
    assert_eq!(lerp_color(a, b, 0.0), a);
    assert_eq!(lerp_color(a, b, 1.0), b);
}
