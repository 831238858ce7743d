//! アノテーションと座標変換
//!
//! バックエンドのアノテーションは `[ymin, xmin, ymax, xmax]` を 0〜1000 に
//! 正規化した座標で届く。描画サイズに合わせてピクセル矩形へ変換する。

use serde::{Deserialize, Serialize};

/// 正規化座標の上限
pub const NORMALIZED_EXTENT: f64 = 1000.0;

/// 枠線の太さ（スクリーンピクセル）
pub const STROKE_WIDTH: f64 = 2.0;
/// ラベル文字サイズ（スクリーンピクセル）
pub const FONT_SIZE: f64 = 12.0;
/// ラベルチップの高さ（スクリーンピクセル）
pub const CHIP_HEIGHT: f64 = 20.0;

/// バウンディングボックス付きアノテーション
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub label: String,
    /// `[ymin, xmin, ymax, xmax]`（0〜1000）
    pub coordinates: [f64; 4],
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Annotation {
    /// 表示用ラベル `label (NN%)`
    pub fn display_text(&self) -> String {
        format!("{} ({}%)", self.label, confidence_percent(self.confidence))
    }

    pub fn to_pixel_rect(&self, img_width: f64, img_height: f64) -> PixelRect {
        map_to_pixels(&self.coordinates, img_width, img_height)
    }
}

/// 信頼度を四捨五入したパーセント値
pub fn confidence_percent(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

/// ピクセル空間の矩形
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// 幅か高さが0以下（逆転した座標を含む）
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        !self.is_empty()
            && px >= self.x
            && px <= self.x + self.width
            && py >= self.y
            && py <= self.y + self.height
    }
}

/// 正規化座標をピクセル矩形へ変換
///
/// 各値は [0, 1000] にクランプしてから変換する。順序は検証しないため、
/// `xmax < xmin` なら幅が負になる（描画側では空矩形扱い）。
pub fn map_to_pixels(coords: &[f64; 4], img_width: f64, img_height: f64) -> PixelRect {
    let [ymin, xmin, ymax, xmax] = coords.map(clamp_normalized);

    PixelRect {
        x: (xmin / NORMALIZED_EXTENT) * img_width,
        y: (ymin / NORMALIZED_EXTENT) * img_height,
        width: ((xmax - xmin) / NORMALIZED_EXTENT) * img_width,
        height: ((ymax - ymin) / NORMALIZED_EXTENT) * img_height,
    }
}

fn clamp_normalized(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, NORMALIZED_EXTENT)
}

/// 1件分のオーバーレイ描画情報（ステージ座標系）
///
/// 線幅・文字サイズは `scale` で割ってあり、ズームしても画面上の見た目が変わらない。
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayGeometry {
    pub rect: PixelRect,
    pub stroke_width: f64,
    pub chip: PixelRect,
    pub text: String,
    pub text_x: f64,
    pub text_y: f64,
    pub font_size: f64,
}

impl OverlayGeometry {
    pub fn new(annotation: &Annotation, img_width: f64, img_height: f64, scale: f64) -> Self {
        let rect = annotation.to_pixel_rect(img_width, img_height);
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let chip = PixelRect {
            x: rect.x,
            y: rect.y - CHIP_HEIGHT / scale,
            width: label_chip_width(&annotation.label),
            height: CHIP_HEIGHT / scale,
        };

        Self {
            rect,
            stroke_width: STROKE_WIDTH / scale,
            chip,
            text: annotation.display_text(),
            text_x: rect.x + 5.0 / scale,
            text_y: rect.y - 15.0 / scale,
            font_size: FONT_SIZE / scale,
        }
    }
}

/// ラベルチップ幅（文字数から概算、再描画で揺れないよう決定的）
pub fn label_chip_width(label: &str) -> f64 {
    (label.chars().count() * 8 + 30) as f64
}

/// 全アノテーションのオーバーレイを計算
pub fn overlays(
    annotations: &[Annotation],
    img_width: f64,
    img_height: f64,
    scale: f64,
) -> Vec<OverlayGeometry> {
    annotations
        .iter()
        .map(|a| OverlayGeometry::new(a, img_width, img_height, scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(coords: [f64; 4]) -> Annotation {
        Annotation {
            label: "Nodule".to_string(),
            coordinates: coords,
            confidence: 0.874,
            explanation: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_map_to_pixels_example() {
        let rect = map_to_pixels(&[100.0, 200.0, 300.0, 400.0], 800.0, 600.0);
        assert!(approx(rect.x, 160.0));
        assert!(approx(rect.y, 60.0));
        assert!(approx(rect.width, 160.0));
        assert!(approx(rect.height, 120.0));
    }

    #[test]
    fn test_map_to_pixels_is_deterministic() {
        let coords = [123.4, 56.7, 890.1, 432.1];
        let a = map_to_pixels(&coords, 1024.0, 768.0);
        let b = map_to_pixels(&coords, 1024.0, 768.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_to_pixels_stays_inside_image() {
        let dims = [(800.0, 600.0), (1.0, 1.0), (4096.0, 17.0)];
        let boxes = [
            [0.0, 0.0, 1000.0, 1000.0],
            [0.0, 0.0, 0.0, 0.0],
            [333.0, 10.0, 999.0, 777.0],
            [500.0, 500.0, 500.0, 500.0],
            [1.0, 999.0, 2.0, 1000.0],
        ];

        for (w, h) in dims {
            for coords in &boxes {
                let r = map_to_pixels(coords, w, h);
                let eps = 1e-9;
                assert!(r.x >= -eps && r.x + r.width <= w + eps, "{:?} {}x{}", r, w, h);
                assert!(r.y >= -eps && r.y + r.height <= h + eps, "{:?} {}x{}", r, w, h);
                assert!(r.width >= 0.0 && r.height >= 0.0);
            }
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let rect = map_to_pixels(&[-50.0, -10.0, 1200.0, 1500.0], 800.0, 600.0);
        assert_eq!(rect, PixelRect { x: 0.0, y: 0.0, width: 800.0, height: 600.0 });
    }

    #[test]
    fn test_inverted_box_is_empty_not_error() {
        let rect = map_to_pixels(&[300.0, 400.0, 100.0, 200.0], 800.0, 600.0);
        assert!(rect.width < 0.0);
        assert!(rect.height < 0.0);
        assert!(rect.is_empty());
        assert!(!rect.contains(100.0, 100.0));
    }

    #[test]
    fn test_display_text_rounds_confidence() {
        assert_eq!(annotation([0.0; 4]).display_text(), "Nodule (87%)");

        let mut a = annotation([0.0; 4]);
        a.confidence = 0.995;
        assert_eq!(a.display_text(), "Nodule (100%)");
    }

    #[test]
    fn test_overlay_geometry_scales_with_zoom() {
        let a = annotation([100.0, 200.0, 300.0, 400.0]);

        let at_1 = OverlayGeometry::new(&a, 800.0, 600.0, 1.0);
        assert!(approx(at_1.stroke_width, 2.0));
        assert!(approx(at_1.font_size, 12.0));
        assert!(approx(at_1.chip.y, 40.0));
        assert!(approx(at_1.chip.width, (6 * 8 + 30) as f64));
        assert!(approx(at_1.text_x, 165.0));
        assert!(approx(at_1.text_y, 45.0));

        let at_2 = OverlayGeometry::new(&a, 800.0, 600.0, 2.0);
        assert!(approx(at_2.stroke_width, 1.0));
        assert!(approx(at_2.font_size, 6.0));
        assert!(approx(at_2.chip.height, 10.0));
        // 矩形自体はズームに依存しない
        assert_eq!(at_1.rect, at_2.rect);
    }

    #[test]
    fn test_annotation_deserialize() {
        let json = r#"{"label": "Opacity", "coordinates": [10, 20, 30, 40], "confidence": 0.5}"#;
        let a: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(a.coordinates, [10.0, 20.0, 30.0, 40.0]);
        assert!(a.explanation.is_none());
    }
}
