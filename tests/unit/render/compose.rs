use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, image::Rgba(px))
}

#[test]
fn matching_surface_is_untouched() {
    let fit = CanvasFit {
        width: 4,
        height: 2,
        content_scale: 1.0,
    };
    let src = solid(4, 2, [1, 2, 3, 4]);
    assert_eq!(fit.apply(src.clone()), src);
}

#[test]
fn smaller_surface_is_center_padded_with_transparency() {
    let fit = CanvasFit {
        width: 6,
        height: 4,
        content_scale: 1.0,
    };
    let out = fit.apply(solid(2, 2, [255, 0, 0, 255]));
    assert_eq!(out.dimensions(), (6, 4));
    assert_eq!(out.get_pixel(2, 1).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(3, 2).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(out.get_pixel(5, 3).0, [0, 0, 0, 0]);
    assert_eq!(out.get_pixel(1, 1).0[3], 0);
    assert_eq!(out.get_pixel(4, 1).0[3], 0);
}

#[test]
fn larger_surface_is_center_cropped() {
    let mut src = solid(4, 4, [0, 0, 255, 255]);
    src.put_pixel(0, 0, image::Rgba([9, 9, 9, 255]));
    let fit = CanvasFit {
        width: 2,
        height: 2,
        content_scale: 1.0,
    };
    let out = fit.apply(src);
    assert_eq!(out.dimensions(), (2, 2));
    for px in out.pixels() {
        assert_eq!(px.0, [0, 0, 255, 255]);
    }
}

#[test]
fn content_scale_resizes_before_centering() {
    let fit = CanvasFit {
        width: 8,
        height: 8,
        content_scale: 2.0,
    };
    let out = fit.apply(solid(2, 2, [0, 255, 0, 255]));
    assert_eq!(out.dimensions(), (8, 8));
    // 2x2 scaled to 4x4, centered at (2,2)..(6,6).
    assert_eq!(out.get_pixel(3, 3).0, [0, 255, 0, 255]);
    assert_eq!(out.get_pixel(1, 1).0[3], 0);
    assert_eq!(out.get_pixel(6, 6).0[3], 0);
}

#[test]
fn huge_content_scale_only_materializes_the_visible_window() {
    let fit = CanvasFit {
        width: 4,
        height: 4,
        content_scale: 1e9,
    };
    let out = fit.apply(solid(8, 6, [7, 8, 9, 255]));
    assert_eq!(out.dimensions(), (4, 4));
    for px in out.pixels() {
        assert_eq!(px.0, [7, 8, 9, 255]);
    }
}

#[test]
fn upscaled_content_is_center_cropped_to_the_canvas() {
    // Left half red, right half blue; scaled 4x it overflows a 4x4 canvas on both sides.
    let mut src = solid(4, 2, [255, 0, 0, 255]);
    for y in 0..2 {
        for x in 2..4 {
            src.put_pixel(x, y, image::Rgba([0, 0, 255, 255]));
        }
    }
    let fit = CanvasFit {
        width: 4,
        height: 4,
        content_scale: 4.0,
    };
    let out = fit.apply(src);
    assert_eq!(out.dimensions(), (4, 4));
    assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(3, 3).0, [0, 0, 255, 255]);
    for px in out.pixels() {
        assert_eq!(px.0[3], 255);
    }
}

#[test]
fn empty_surface_yields_transparent_canvas() {
    let fit = CanvasFit {
        width: 3,
        height: 2,
        content_scale: 2.0,
    };
    let out = fit.apply(RgbaImage::new(0, 0));
    assert_eq!(out.dimensions(), (3, 2));
    assert!(out.pixels().all(|px| px.0 == [0, 0, 0, 0]));
}

#[test]
fn png_encoding_is_lossless_with_alpha() {
    let mut img = solid(3, 2, [10, 20, 30, 40]);
    img.put_pixel(2, 1, image::Rgba([0, 0, 0, 0]));
    let png = encode_png(&img).unwrap();
    let back = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(back, img);
}
