//! ビューア表示面のヘッドレス描画
//!
//! ブラウザのビューアと同じレイアウト（800x600ステージ、分割時は左右2ペイン）で
//! 画像・フィルタ・アノテーション・ルーラーをPNGに描き出す。

pub mod draw;

use crate::error::{MedviewError, Result};
use chrono::Local;
use draw::{draw_bitmap_text, draw_line, draw_rect_outline, fill_rect_alpha, text_width};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use medview_common::annotation::OverlayGeometry;
use medview_common::filter::apply_table;
use medview_common::surface::{LoadState, PaneRole, PaneSpec, Stage, NO_PREVIEW_TEXT};
use medview_common::{
    Annotation, FilterParams, Measurement, NativeScale, PixelSpacing, SurfaceLayout, ViewState,
    ViewStateController,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const ANNOTATION_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const CHIP_COLOR: Rgba<u8> = Rgba([255, 0, 0, 204]);
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PANE_LABEL_BG: Rgba<u8> = Rgba([0, 0, 0, 128]);
const DIVIDER_COLOR: Rgba<u8> = Rgba([55, 65, 81, 255]);
const RULER_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([156, 163, 175, 255]);

/// 描画オプション
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub brightness: f64,
    pub contrast: f64,
    pub scale: f64,
    pub pan: (f64, f64),
    pub show_annotations: bool,
    pub measurement: Option<Measurement>,
    pub pixel_spacing: Option<PixelSpacing>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            scale: 1.0,
            pan: (0.0, 0.0),
            show_annotations: true,
            measurement: None,
            pixel_spacing: None,
        }
    }
}

impl RenderOptions {
    /// ユーザー操作と同じ経路で表示状態を組み立てる
    pub fn view_state(&self, has_comparison: bool) -> ViewState {
        let mut controller = ViewStateController::new(has_comparison);
        controller.zoom_to(self.scale);
        controller.pan_to(self.pan.0, self.pan.1);
        controller.set_brightness(self.brightness);
        controller.set_contrast(self.contrast);
        if !self.show_annotations {
            controller.toggle_annotations();
        }
        // 比較画像があれば分割表示
        controller.toggle_split_view();
        controller.state().clone()
    }
}

/// 画像ファイルを読み込む。失敗はプレースホルダ扱い
pub fn load_pane_image(path: &Path) -> LoadState<DynamicImage> {
    match image::open(path) {
        Ok(img) => LoadState::Ready(img),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "画像を読み込めません");
            LoadState::Failed(e.to_string())
        }
    }
}

/// 一次画像の元寸法とステージの比。読めていなければ等倍
pub fn native_scale(primary: &LoadState<DynamicImage>) -> NativeScale {
    match primary.ready() {
        Some(img) => {
            let (w, h) = img.dimensions();
            NativeScale::between(w as f64, h as f64, Stage::default())
        }
        None => NativeScale::default(),
    }
}

/// 表示面全体を描画
pub fn render_surface(
    primary: &LoadState<DynamicImage>,
    comparison: Option<&LoadState<DynamicImage>>,
    annotations: &[Annotation],
    options: &RenderOptions,
) -> RgbaImage {
    let stage = Stage::default();
    let state = options.view_state(comparison.is_some());
    let layout = SurfaceLayout::compute(&state, comparison.is_some(), stage);
    let table = FilterParams::from_view(&state).lookup_table();

    let mut canvas = RgbaImage::from_pixel(stage.width as u32, stage.height as u32, BACKGROUND);
    let mut offset_x = 0i64;

    for pane in &layout.panes {
        let source = match pane.role {
            PaneRole::Primary => Some(primary),
            PaneRole::Comparison => comparison,
        };
        let mut pane_img = render_pane(source, pane, &state, stage, &table);

        if pane.role == PaneRole::Primary {
            for overlay in layout.primary_overlays(annotations, &state) {
                draw_overlay(&mut pane_img, &overlay, &state);
            }
            if let Some(m) = &options.measurement {
                draw_measurement(&mut pane_img, m, &state, options.pixel_spacing);
            }
        }
        if let Some(label) = pane.label {
            draw_pane_label(&mut pane_img, label);
        }

        imageops::overlay(&mut canvas, &pane_img, offset_x, 0);
        offset_x += pane.width as i64;
    }

    if layout.is_split() {
        let x = layout.primary().width as i32 - 1;
        draw_line(&mut canvas, (x, 0), (x, stage.height as i32 - 1), DIVIDER_COLOR);
    }

    canvas
}

fn render_pane(
    source: Option<&LoadState<DynamicImage>>,
    pane: &PaneSpec,
    state: &ViewState,
    stage: Stage,
    table: &[u8; 256],
) -> RgbaImage {
    let mut pane_img = RgbaImage::from_pixel(pane.width as u32, pane.height as u32, BACKGROUND);

    let Some(img) = source.and_then(|s| s.ready()) else {
        let text_x = (pane.width as i32 - text_width(NO_PREVIEW_TEXT, 1)) / 2;
        draw_bitmap_text(&mut pane_img, text_x, pane.height as i32 / 2 - 4, NO_PREVIEW_TEXT, PLACEHOLDER_COLOR, 1);
        return pane_img;
    };

    // 画像はステージ寸法で描く
    let mut stage_img = img
        .resize_exact(stage.width as u32, stage.height as u32, FilterType::Triangle)
        .to_rgba8();
    let row_len = stage_img.width() as usize * 4;
    stage_img
        .par_chunks_mut(row_len)
        .for_each(|row| apply_table(row, table));

    let scaled_w = (stage.width * state.scale).round().max(1.0) as u32;
    let scaled_h = (stage.height * state.scale).round().max(1.0) as u32;
    let scaled = imageops::resize(&stage_img, scaled_w, scaled_h, FilterType::Triangle);
    imageops::overlay(
        &mut pane_img,
        &scaled,
        state.position.x.round() as i64,
        state.position.y.round() as i64,
    );
    pane_img
}

fn to_screen(state: &ViewState, x: f64, y: f64) -> (i32, i32) {
    let p = state.image_to_screen(medview_common::Point::new(x, y));
    (p.x.round() as i32, p.y.round() as i32)
}

fn draw_overlay(img: &mut RgbaImage, overlay: &OverlayGeometry, state: &ViewState) {
    let rect = overlay.rect;
    let (x, y) = to_screen(state, rect.x, rect.y);
    let w = (rect.width * state.scale).round() as i32;
    let h = (rect.height * state.scale).round() as i32;
    let stroke = (overlay.stroke_width * state.scale).round().max(1.0) as i32;
    draw_rect_outline(img, x, y, w, h, ANNOTATION_COLOR, stroke);

    // ビットマップフォントは幅が広いので、チップは文字幅より狭くしない
    let (cx, cy) = to_screen(state, overlay.chip.x, overlay.chip.y);
    let chip_w = ((overlay.chip.width * state.scale).round() as i32).max(text_width(&overlay.text, 1) + 10);
    let chip_h = (overlay.chip.height * state.scale).round() as i32;
    fill_rect_alpha(img, cx, cy, chip_w, chip_h, CHIP_COLOR);

    let (tx, ty) = to_screen(state, overlay.text_x, overlay.text_y);
    draw_bitmap_text(img, tx, ty, &overlay.text, TEXT_COLOR, 1);
}

fn draw_measurement(img: &mut RgbaImage, m: &Measurement, state: &ViewState, spacing: Option<PixelSpacing>) {
    let from = to_screen(state, m.start.x, m.start.y);
    let to = to_screen(state, m.end.x, m.end.y);
    draw_line(img, from, to, RULER_COLOR);
    draw_bitmap_text(img, to.0 + 6, to.1 - 4, &m.label(spacing), RULER_COLOR, 1);
}

fn draw_pane_label(img: &mut RgbaImage, label: &str) {
    fill_rect_alpha(img, 8, 8, text_width(label, 1) + 16, 20, PANE_LABEL_BG);
    draw_bitmap_text(img, 16, 14, label, TEXT_COLOR, 1);
}

/// 既定の出力パス（`<stem>.render-YYYYMMDD-HHMMSS.png`）
pub fn default_output_path(result_path: &Path) -> PathBuf {
    let stem = result_path
        .file_stem()
        .map(|s| s.to_string_lossy().trim_end_matches(".diagnosis").to_string())
        .unwrap_or_else(|| "render".to_string());
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    result_path.with_file_name(format!("{}.render-{}.png", stem, stamp))
}

pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    DynamicImage::ImageRgba8(img.clone())
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| MedviewError::Render(format!("{}: {}", path.display(), e)))
}
