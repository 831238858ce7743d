//! ヘッドレス描画テスト
//!
//! 実ファイルの読み込みからPNG保存までを検証

use image::{Rgba, RgbaImage};
use medview::render::{self, RenderOptions};
use medview_common::surface::LoadState;
use medview_common::{Annotation, Measurement, PixelSpacing, Point};
use tempfile::tempdir;

fn write_png(path: &std::path::Path, w: u32, h: u32, v: u8) {
    RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255])).save(path).unwrap();
}

/// 読み込み → 描画 → 保存
#[test]
fn test_render_to_png() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("scan.png");
    write_png(&input, 64, 48, 90);

    let primary = render::load_pane_image(&input);
    assert!(primary.ready().is_some());

    let annotations = vec![Annotation {
        label: "Nodule".into(),
        coordinates: [100.0, 200.0, 300.0, 400.0],
        confidence: 0.87,
        explanation: None,
    }];
    let img = render::render_surface(&primary, None, &annotations, &RenderOptions::default());

    let output = dir.path().join("out").join("scan.render.png");
    render::save_png(&img, &output).expect("PNG保存失敗");

    let reloaded = image::open(&output).unwrap().to_rgba8();
    assert_eq!(reloaded.dimensions(), (800, 600));
    assert_eq!(*reloaded.get_pixel(160, 120), Rgba([255, 0, 0, 255]));
}

/// 読めない画像（DICOMなど）はプレースホルダになる
#[test]
fn test_undecodable_image_is_placeholder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("scan.dcm");
    std::fs::write(&input, b"DICM not an image").unwrap();

    let primary = render::load_pane_image(&input);
    assert!(primary.shows_placeholder());

    let img = render::render_surface(&primary, None, &[], &RenderOptions::default());
    assert_eq!(img.dimensions(), (800, 600));
}

/// 分割表示では比較ペインにアノテーションを描かない
#[test]
fn test_split_view_annotations_only_on_primary() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_png(&a, 16, 12, 0);
    write_png(&b, 16, 12, 0);

    // 画像全体を覆う枠
    let annotations = vec![Annotation {
        label: "Whole".into(),
        coordinates: [100.0, 100.0, 900.0, 900.0],
        confidence: 0.5,
        explanation: None,
    }];
    let primary = render::load_pane_image(&a);
    let comparison = render::load_pane_image(&b);
    let img = render::render_surface(&primary, Some(&comparison), &annotations, &RenderOptions::default());

    // 一次ペイン: x=80 に縦線
    assert_eq!(*img.get_pixel(80, 300), Rgba([255, 0, 0, 255]));
    // 比較ペインの同じ位置には何もない
    assert_eq!(*img.get_pixel(480, 300), Rgba([0, 0, 0, 255]));
}

/// ズームすると枠の位置もずれる
#[test]
fn test_zoom_moves_overlay() {
    let primary = LoadState::Ready(image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        8,
        6,
        Rgba([0, 0, 0, 255]),
    )));
    let annotations = vec![Annotation {
        label: "N".into(),
        coordinates: [100.0, 100.0, 200.0, 200.0],
        confidence: 0.5,
        explanation: None,
    }];
    let options = RenderOptions {
        scale: 2.0,
        ..Default::default()
    };
    let img = render::render_surface(&primary, None, &annotations, &options);
    // x = 80 * 2
    assert_eq!(*img.get_pixel(160, 150), Rgba([255, 0, 0, 255]));
}

/// ルーラー計測線
#[test]
fn test_measurement_line() {
    let primary = LoadState::Ready(image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        8,
        6,
        Rgba([0, 0, 0, 255]),
    )));
    // 8x6 の画像はステージで100倍に引き伸ばされる
    let native = render::native_scale(&primary);
    let measurement = Measurement::from_native(Point::new(1.0, 3.0), Point::new(4.0, 3.0), native);
    let options = RenderOptions {
        measurement: Some(measurement),
        pixel_spacing: PixelSpacing::new(0.5),
        ..Default::default()
    };
    let img = render::render_surface(&primary, None, &[], &options);
    assert_eq!(*img.get_pixel(250, 300), Rgba([255, 255, 0, 255]));
    assert_eq!(measurement.label(options.pixel_spacing), "1.5 mm");
}

/// 800x600 以外の画像でも計測値は元画像の画素で出す
#[test]
fn test_measurement_in_native_pixels() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("wide.png");
    write_png(&input, 2048, 1536, 40);

    let primary = render::load_pane_image(&input);
    let native = render::native_scale(&primary);
    let measurement = Measurement::from_native(Point::new(0.0, 0.0), Point::new(2048.0, 0.0), native);

    // ステージの端から端まで
    assert_eq!(measurement.end, Point::new(800.0, 0.0));
    assert_eq!(measurement.length_px(), 2048.0);
    assert_eq!(measurement.label(PixelSpacing::new(0.1)), "204.8 mm");

    let options = RenderOptions {
        measurement: Some(measurement),
        ..Default::default()
    };
    let img = render::render_surface(&primary, None, &[], &options);
    assert_eq!(*img.get_pixel(400, 0), Rgba([255, 255, 0, 255]));
}
