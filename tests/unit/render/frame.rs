use super::*;

#[test]
fn black_frame_has_rgb24_shape() {
    let f = Frame::black(Resolution::new(4, 3).unwrap());
    assert_eq!(f.as_bytes().len(), 4 * 3 * 3);
    assert!(f.is_all_black());
    assert_eq!(f.count_lit(), 0);
    assert_eq!(f.pixel(3, 2), Some(Rgb8::BLACK));
    assert_eq!(f.pixel(4, 0), None);
}

#[test]
fn from_rgb24_checks_length() {
    let res = Resolution::new(2, 2).unwrap();
    assert!(Frame::from_rgb24(res, vec![0; 11]).is_err());
    let mut data = vec![0; 12];
    data[9] = 7;
    let f = Frame::from_rgb24(res, data).unwrap();
    assert_eq!(f.pixel(1, 1), Some(Rgb8::new(7, 0, 0)));
    assert_eq!(f.count_lit_in(0, 1, 2, 2), 1);
    assert_eq!(f.count_lit_in(0, 0, 2, 1), 0);
}

#[test]
fn png_round_trips_through_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/f.png");
    let res = Resolution::new(3, 2).unwrap();
    let mut f = Frame::black(res);
    f.as_bytes_mut()[0] = 255;
    f.save_png(&path).unwrap();
    let img = image::open(&path).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
}
