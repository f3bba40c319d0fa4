use super::*;

fn cfg_480() -> VisualizationConfig {
    VisualizationConfig {
        resolution: Resolution::new(854, 480).unwrap(),
        ..VisualizationConfig::default()
    }
}

#[test]
fn bottom_band_occupies_lower_quarter() {
    let cfg = cfg_480().resolve().unwrap();
    let layout = FrameLayout::new(&cfg).unwrap();
    assert_eq!(layout.canvas, Resolution::new(1708, 960).unwrap());
    assert_eq!(layout.scale, 2.0);
    let band = &layout.bands[0];
    assert_eq!(band.anchor, Anchor::Bottom);
    assert_eq!(band.rect, Rect::new(0.0, 720.0, 1708.0, 960.0));
    assert_eq!(band.extent(), 240.0);

    let base = resolve_baseline(band, layout.canvas, 0.0, true);
    assert_eq!(base.origin, 959.0);
    assert_eq!(base.at(1.0), 720.0);
}

#[test]
fn offset_interpolates_between_bottom_and_top() {
    let mut cfg = cfg_480();
    cfg.position = "middle".into();
    cfg.orientation_offset = Some(0.0);
    let l = FrameLayout::new(&cfg.clone().resolve().unwrap()).unwrap();
    assert_eq!(l.bands[0].rect.y1, 960.0);
    assert_eq!(l.bands[0].anchor, Anchor::Bottom);

    cfg.orientation_offset = Some(100.0);
    let l = FrameLayout::new(&cfg.clone().resolve().unwrap()).unwrap();
    assert_eq!(l.bands[0].rect.y0, 0.0);
    assert_eq!(l.bands[0].anchor, Anchor::Top);

    cfg.orientation_offset = Some(50.5);
    let l = FrameLayout::new(&cfg.resolve().unwrap()).unwrap();
    assert!(l.centered);
    assert_eq!(l.bands[0].anchor, Anchor::Dynamic);
}

#[test]
fn dynamic_baseline_follows_midpoint() {
    let mut cfg = cfg_480();
    cfg.orientation_offset = Some(50.0);
    let l = FrameLayout::new(&cfg.resolve().unwrap()).unwrap();
    let band = &l.bands[0];

    let silent = resolve_baseline(band, l.canvas, 0.0, true);
    assert_eq!(silent.origin, band.center().y);

    let loud = resolve_baseline(band, l.canvas, 0.7, false);
    assert_eq!((loud.origin, loud.direction), (959.0, -1.0));

    let quiet = resolve_baseline(band, l.canvas, 0.2, false);
    assert_eq!((quiet.origin, quiet.direction), (0.0, 1.0));
    assert_eq!(quiet.reach, band.extent() - 1.0);
}

#[test]
fn vertical_bands_respect_spacing() {
    let mut cfg = cfg_480();
    cfg.position = "left,right".into();
    cfg.left_spacing = 10;
    cfg.right_spacing = 5;
    let l = FrameLayout::new(&cfg.resolve().unwrap()).unwrap();
    let (left, right) = (&l.bands[0], &l.bands[1]);
    assert_eq!(left.axis, Axis::Vertical);
    assert_eq!(left.rect.x0, 20.0);
    assert_eq!(left.anchor, Anchor::Left);
    let band_w = (1708.0f64 * 0.15).round();
    assert_eq!(right.rect.x1, 1708.0 - 10.0);
    assert_eq!(right.rect.width(), band_w);
    assert_eq!(right.anchor, Anchor::Right);
}

#[test]
fn instances_stack_inward_and_stay_in_frame() {
    let mut cfg = cfg_480();
    cfg.num_instances = 3;
    cfg.instances_offset = 20;
    let cfg = cfg.resolve().unwrap();
    let l = FrameLayout::new(&cfg).unwrap();
    let shifts = l.instance_shifts(&l.bands[0], &cfg);
    assert_eq!(
        shifts,
        vec![Vec2::ZERO, Vec2::new(0.0, -40.0), Vec2::new(0.0, -80.0)]
    );

    let mut tall = cfg.clone();
    tall.instances_offset = 1000;
    let shifts = l.instance_shifts(&l.bands[0], &tall);
    assert_eq!(shifts[2], Vec2::new(0.0, -720.0));

    tall.instances_intersect = true;
    let shifts = l.instance_shifts(&l.bands[0], &tall);
    assert_eq!(shifts[2], Vec2::new(0.0, -4000.0));
}

#[test]
fn clipping_is_disabled_for_rotation_and_centering() {
    let cfg = cfg_480().resolve().unwrap();
    let l = FrameLayout::new(&cfg).unwrap();
    assert_eq!(l.clip_rects(&cfg), Some(vec![Rect::new(0.0, 720.0, 1708.0, 960.0)]));

    let mut rotated = cfg.clone();
    rotated.rotation = 45.0;
    assert_eq!(l.clip_rects(&rotated), None);

    let mut centered = cfg_480();
    centered.orientation_offset = Some(50.0);
    let centered = centered.resolve().unwrap();
    let lc = FrameLayout::new(&centered).unwrap();
    assert_eq!(lc.clip_rects(&centered), None);
}

#[test]
fn line_offsets_spread_across_band() {
    let base = Baseline {
        origin: 959.0,
        direction: -1.0,
        reach: 239.0,
    };
    assert_eq!(line_offsets(1, 240.0, &base, true), vec![0.0]);

    let centered = line_offsets(2, 240.0, &base, false);
    assert_eq!(centered, vec![-54.0, 54.0]);

    let inward = line_offsets(2, 240.0, &base, true);
    assert_eq!(inward, vec![-108.0, 0.0]);

    let ten = line_offsets(10, 240.0, &base, false);
    assert_eq!(ten.len(), 10);
    assert!((ten[1] - ten[0] - 21.6).abs() < 1e-9);
}

#[test]
fn edge_anchored_lines_stay_on_the_band_side() {
    let bottom = Baseline {
        origin: 100.0,
        direction: -1.0,
        reach: 99.0,
    };
    assert_eq!(line_offsets(2, 100.0, &bottom, false), vec![-22.5, 22.5]);
    assert_eq!(line_offsets(2, 100.0, &bottom, true), vec![-45.0, 0.0]);

    let top = Baseline {
        origin: 0.0,
        direction: 1.0,
        reach: 99.0,
    };
    let down = line_offsets(3, 100.0, &top, true);
    assert_eq!(down[0], 0.0);
    assert!(down.iter().all(|&o| o >= 0.0));
}

#[test]
fn rotation_pivots_on_band_center() {
    let cfg = cfg_480().resolve().unwrap();
    let l = FrameLayout::new(&cfg).unwrap();
    let band = &l.bands[0];
    assert_eq!(rotation(band, 0.0), Affine::IDENTITY);
    let a = rotation(band, 90.0);
    let c = a * band.center();
    assert!((c - band.center()).hypot() < 1e-9);
}
