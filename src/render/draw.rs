//! RGBAキャンバスへの低レベル描画

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};

/// グリフ1文字の幅（px）
pub const GLYPH_SIZE: i32 = 8;

pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = f64::from(src[3]) / 255.0;
    if a <= 0.0 {
        return dst;
    }
    let inv = 1.0 - a;
    let mix = |d: u8, s: u8| (f64::from(d) * inv + f64::from(s) * a).round().clamp(0.0, 255.0) as u8;
    let out_a = (f64::from(dst[3]) + f64::from(src[3]) * inv)
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), out_a])
}

fn put_blended(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let dst = *img.get_pixel(x as u32, y as u32);
    img.put_pixel(x as u32, y as u32, blend_pixel(dst, color));
}

/// 矩形の枠線。幅・高さが0以下なら何も描かない
pub fn draw_rect_outline(img: &mut RgbaImage, x: i32, y: i32, w: i32, h: i32, color: Rgba<u8>, thickness: i32) {
    if w <= 0 || h <= 0 {
        return;
    }
    let x1 = x + w - 1;
    let y1 = y + h - 1;
    for t in 0..thickness.max(1) {
        for xx in (x - t)..=(x1 + t) {
            put_blended(img, xx, y - t, color);
            put_blended(img, xx, y1 + t, color);
        }
        for yy in (y - t + 1)..(y1 + t) {
            put_blended(img, x - t, yy, color);
            put_blended(img, x1 + t, yy, color);
        }
    }
}

/// 半透明の塗りつぶし（画像外ははみ出し分を切り捨て）
pub fn fill_rect_alpha(img: &mut RgbaImage, x: i32, y: i32, w: i32, h: i32, color: Rgba<u8>) {
    if w <= 0 || h <= 0 {
        return;
    }
    for yy in y..y + h {
        for xx in x..x + w {
            put_blended(img, xx, yy, color);
        }
    }
}

/// 線分（ブレゼンハム）
pub fn draw_line(img: &mut RgbaImage, from: (i32, i32), to: (i32, i32), color: Rgba<u8>) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_blended(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// 8x8ビットマップフォントで文字列を描く（`scale` 倍に拡大）
pub fn draw_bitmap_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32) {
    let scale_i = scale.max(1) as i32;
    let mut cursor_x = x;
    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += GLYPH_SIZE * scale_i;
            continue;
        };
        for (row_idx, row) in glyph.iter().enumerate() {
            for col_idx in 0..GLYPH_SIZE {
                if (*row >> col_idx) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col_idx * scale_i;
                let py = y + row_idx as i32 * scale_i;
                for sy in 0..scale_i {
                    for sx in 0..scale_i {
                        put_blended(img, px + sx, py + sy, color);
                    }
                }
            }
        }
        cursor_x += GLYPH_SIZE * scale_i;
    }
}

/// 文字列の描画幅（px）
pub fn text_width(text: &str, scale: u32) -> i32 {
    text.chars().count() as i32 * GLYPH_SIZE * scale.max(1) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_blend_opaque_and_transparent() {
        let dst = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_pixel(dst, RED), RED);
        assert_eq!(blend_pixel(dst, Rgba([255, 255, 255, 0])), dst);
    }

    #[test]
    fn test_outline_leaves_interior() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        draw_rect_outline(&mut img, 2, 2, 5, 5, RED, 1);
        assert_eq!(*img.get_pixel(2, 2), RED);
        assert_eq!(*img.get_pixel(6, 6), RED);
        assert_eq!(*img.get_pixel(4, 4), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_degenerate_rect_draws_nothing() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        draw_rect_outline(&mut img, 1, 1, -3, 2, RED, 1);
        fill_rect_alpha(&mut img, 1, 1, 0, 2, RED);
        assert!(img.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_offscreen_drawing_is_clipped() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        fill_rect_alpha(&mut img, -10, -10, 12, 12, RED);
        draw_line(&mut img, (-5, -5), (10, 10), RED);
        draw_bitmap_text(&mut img, -20, 0, "AB", RED, 1);
        assert_eq!(*img.get_pixel(0, 0), RED);
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("Nodule", 1), 48);
        assert_eq!(text_width("ab", 2), 32);
    }
}
