//! 画像レイヤーのキャンバス描画
//!
//! ズーム・パンはCSS transformで行うので、ここが呼ばれるのは
//! 画像の読み込み完了時と明るさ・コントラスト変更時だけ。

use medview_common::surface::{LoadState, Stage, NO_PREVIEW_TEXT};
use medview_common::{apply_filters, FilterParams};
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData};

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
}

/// 読み込み状態に応じて画像レイヤーを描き直す
pub fn paint(canvas: &HtmlCanvasElement, state: &LoadState<HtmlImageElement>, stage: Stage, params: FilterParams) {
    let Some(ctx) = context_2d(canvas) else {
        return;
    };
    ctx.clear_rect(0.0, 0.0, stage.width, stage.height);

    match state {
        LoadState::Ready(img) => {
            if let Err(e) = draw_filtered(&ctx, img, stage, params) {
                web_sys::console::warn_2(&JsValue::from_str("medview: filter skipped"), &e);
            }
        }
        LoadState::Failed(_) => draw_placeholder(&ctx, stage),
        LoadState::Empty | LoadState::Loading => {}
    }
}

fn draw_filtered(
    ctx: &CanvasRenderingContext2d,
    img: &HtmlImageElement,
    stage: Stage,
    params: FilterParams,
) -> Result<(), JsValue> {
    ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, stage.width, stage.height)?;
    if params.is_identity() {
        return Ok(());
    }

    // CORSなしの画像だと getImageData は失敗する。その場合は未加工のまま
    let data = ctx.get_image_data(0.0, 0.0, stage.width, stage.height)?;
    let mut pixels = data.data().0;
    apply_filters(&mut pixels, params);
    let filtered = ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(&pixels[..]),
        stage.width as u32,
        stage.height as u32,
    )?;
    ctx.put_image_data(&filtered, 0.0, 0.0)
}

fn draw_placeholder(ctx: &CanvasRenderingContext2d, stage: Stage) {
    ctx.set_fill_style_str("#1f2937");
    ctx.fill_rect(0.0, 0.0, stage.width, stage.height);
    ctx.set_fill_style_str("#9ca3af");
    ctx.set_font("16px sans-serif");
    ctx.set_text_align("center");
    let _ = ctx.fill_text(NO_PREVIEW_TEXT, stage.width / 2.0, stage.height / 2.0);
}
