use super::*;

const GREEN: Rgb8 = Rgb8::new(0, 255, 0);

fn line_scene(clip: Option<Vec<Rect>>, anti_alias: bool) -> Scene {
    Scene {
        canvas: Resolution::new(40, 20).unwrap(),
        output: Resolution::new(20, 10).unwrap(),
        anti_alias,
        clip,
        shapes: vec![Shape {
            primitive: Primitive::Polyline {
                points: vec![Point::new(2.0, 10.0), Point::new(38.0, 10.0)],
                closed: false,
            },
            color: GREEN,
            thickness: 4.0,
            line: 0,
            instance: 0,
        }],
    }
}

#[test]
fn empty_scene_is_black() {
    let res = Resolution::new(8, 8).unwrap();
    let frame = Rasterizer::new()
        .rasterize(&Scene::empty(res, res, true))
        .unwrap();
    assert!(frame.is_all_black());
}

#[test]
fn stroked_line_lands_on_expected_rows() {
    let frame = Rasterizer::new().rasterize(&line_scene(None, true)).unwrap();
    assert_eq!(frame.resolution(), Resolution::new(20, 10).unwrap());
    let px = frame.pixel(10, 5).unwrap();
    assert!(px.g > 100, "{px:?}");
    assert_eq!(px.r, 0);
    assert_eq!(frame.count_lit_in(0, 0, 20, 2), 0);
}

#[test]
fn clip_keeps_outside_pixels_black_after_downsampling() {
    let clip = vec![Rect::new(0.0, 0.0, 40.0, 9.0)];
    let frame = Rasterizer::new()
        .rasterize(&line_scene(Some(clip), true))
        .unwrap();
    assert_eq!(frame.count_lit_in(0, 5, 20, 10), 0);
}

#[test]
fn aliased_output_has_only_full_colors() {
    let frame = Rasterizer::new().rasterize(&line_scene(None, false)).unwrap();
    assert!(frame.count_lit() > 0);
    for px in frame.as_bytes().chunks_exact(3) {
        assert!(px == [0, 0, 0] || px == [0, 255, 0], "{px:?}");
    }
}

#[test]
fn same_scene_renders_identically() {
    let scene = line_scene(None, true);
    let mut r = Rasterizer::new();
    let a = r.rasterize(&scene).unwrap();
    let b = r.rasterize(&scene).unwrap();
    let c = Rasterizer::new().rasterize(&scene).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn dots_bars_and_polygons_draw() {
    let res = Resolution::new(32, 32).unwrap();
    let mk = |primitive| Scene {
        canvas: res,
        output: res,
        anti_alias: true,
        clip: None,
        shapes: vec![Shape {
            primitive,
            color: GREEN,
            thickness: 3.0,
            line: 0,
            instance: 0,
        }],
    };
    let mut r = Rasterizer::new();

    let dots = r
        .rasterize(&mk(Primitive::Dots {
            centers: vec![Point::new(8.0, 8.0), Point::new(24.0, 24.0)],
            radius: 3.0,
        }))
        .unwrap();
    assert!(dots.pixel(8, 8).unwrap().g > 200);
    assert!(dots.pixel(24, 24).unwrap().g > 200);
    assert_eq!(dots.pixel(16, 16), Some(Rgb8::BLACK));

    let bars = r
        .rasterize(&mk(Primitive::Segments(vec![(
            Point::new(16.5, 30.0),
            Point::new(16.5, 10.0),
        )])))
        .unwrap();
    assert!(bars.pixel(16, 20).unwrap().g > 200);
    assert_eq!(bars.pixel(16, 5), Some(Rgb8::BLACK));

    let poly = r
        .rasterize(&mk(Primitive::Polygon(vec![
            Point::new(4.0, 4.0),
            Point::new(28.0, 4.0),
            Point::new(28.0, 28.0),
            Point::new(4.0, 28.0),
        ])))
        .unwrap();
    assert_eq!(poly.pixel(16, 16), Some(GREEN));
    assert_eq!(poly.pixel(1, 1), Some(Rgb8::BLACK));
}

#[test]
fn pixel_boxes_round_outward() {
    let boxes = pixel_boxes(&[Rect::new(1.5, 2.5, 3.2, 4.0)], 1.0);
    assert_eq!(
        boxes,
        vec![PixelBox {
            x0: 1,
            y0: 2,
            x1: 4,
            y1: 4
        }]
    );
}
