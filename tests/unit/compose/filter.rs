use super::*;

fn cfg_480() -> VisualizationConfig {
    VisualizationConfig {
        resolution: Resolution::new(854, 480).unwrap(),
        ..VisualizationConfig::default()
    }
}

#[test]
fn bottom_band_region_is_the_bottom_quarter() {
    let region = waveform_region(&cfg_480()).unwrap();
    assert_eq!(
        region,
        PixelRegion {
            x: 0,
            y: 360,
            width: 854,
            height: 120
        }
    );
}

#[test]
fn rotated_or_centered_layouts_use_the_full_frame() {
    let rotated = VisualizationConfig {
        rotation: 45.0,
        ..cfg_480()
    };
    assert_eq!(
        waveform_region(&rotated).unwrap(),
        PixelRegion::full(rotated.resolution)
    );
    let centered = VisualizationConfig {
        orientation_offset: Some(50.0),
        ..cfg_480()
    };
    assert_eq!(
        waveform_region(&centered).unwrap(),
        PixelRegion::full(centered.resolution)
    );
}

#[test]
fn top_and_bottom_bands_merge_into_one_region() {
    let cfg = VisualizationConfig {
        position: "top,bottom".into(),
        ..cfg_480()
    };
    let region = waveform_region(&cfg).unwrap();
    assert_eq!((region.y, region.height), (0, 480));
}

#[test]
fn region_is_even_aligned() {
    let cfg = VisualizationConfig {
        position: "right".into(),
        width_percent: 15,
        right_spacing: 7,
        ..cfg_480()
    };
    let r = waveform_region(&cfg).unwrap();
    assert_eq!(r.x % 2, 0);
    assert_eq!(r.width % 2, 0);
    assert!(r.x + r.width <= 854);
    assert_eq!((r.y, r.height), (0, 480));
}

#[test]
fn avatar_canvas_is_even_square() {
    let c = avatar_canvas(Resolution::new(854, 480).unwrap());
    assert_eq!((c.width, c.height), (360, 360));
    let c = avatar_canvas(Resolution::new(1920, 1080).unwrap());
    assert_eq!((c.width, c.height), (810, 810));
}

#[test]
fn full_stack_graph_keys_crops_and_boosts() {
    let res = Resolution::new(854, 480).unwrap();
    let region = waveform_region(&cfg_480()).unwrap();
    let g = full_stack(res, region, 0.05);
    assert!(g.contains("[1:v]scale=854:480:force_original_aspect_ratio=decrease,pad=854:480"));
    assert!(g.contains("[2:v]scale=854:480,setsar=1,crop=854:120:0:360"));
    assert!(g.contains("colorkey=0x000000:0.05:0.0[wf]"));
    assert!(g.contains("[0:v]scale=360:360:force_original_aspect_ratio=decrease"));
    assert!(g.contains("[base][wf]overlay=0:360"));
    assert!(g.contains("eq=saturation=1.3"));
    assert!(g.ends_with(OUT_LABEL));
}

#[test]
fn waveform_over_background_uses_screen_blend() {
    let g = waveform_over_background(Resolution::new(1280, 720).unwrap());
    assert!(g.contains("blend=all_mode=screen:all_opacity=0.7"));
    assert!(!g.contains("colorkey"));
    assert!(g.ends_with(OUT_LABEL));
}

#[test]
fn avatar_graphs_center_the_avatar() {
    let res = Resolution::new(1280, 720).unwrap();
    for g in [avatar_over_background(res), avatar_with_waveform(res)] {
        assert!(g.contains("overlay=(W-w)/2:(H-h)/2"));
        assert!(g.contains("color=black@0"));
    }
    assert!(still_image(res).ends_with(OUT_LABEL));
}
