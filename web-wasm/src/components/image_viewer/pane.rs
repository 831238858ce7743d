//! 1ペイン分の画像レイヤー
//!
//! 画像の読み込みは `LoadSlot` で世代管理する。URLが差し替わったあとに
//! 古い画像の onload が来ても反映しない。

use crate::canvas;
use gloo::events::EventListener;
use leptos::html::Canvas;
use leptos::prelude::*;
use medview_common::surface::Stage;
use medview_common::{FilterParams, LoadSlot};
use web_sys::HtmlImageElement;

#[component]
pub fn ImageLayer(
    /// 空文字・未指定なら何も描かない
    #[prop(into)]
    url: Signal<Option<String>>,
    #[prop(into)] filter: Signal<FilterParams>,
    #[prop(optional)] stage: Option<Stage>,
    /// 現行の画像が読み込めたら元寸法 (naturalWidth, naturalHeight) を通知
    #[prop(default = None)]
    on_natural_size: Option<Callback<(f64, f64)>>,
) -> impl IntoView {
    let stage = stage.unwrap_or_default();
    let slot = RwSignal::new_local(LoadSlot::<HtmlImageElement>::new());
    let listeners = StoredValue::new_local(Vec::<EventListener>::new());
    let canvas_ref = NodeRef::<Canvas>::new();

    Effect::new(move |_| {
        let Some(url) = url.get().filter(|u| !u.trim().is_empty()) else {
            slot.update(|s| s.clear());
            listeners.set_value(Vec::new());
            return;
        };
        if slot.with_untracked(|s| s.url() == Some(url.as_str())) {
            return;
        }

        let Some(ticket) = slot.try_update(|s| s.begin(&url)) else {
            return;
        };
        let img = match HtmlImageElement::new() {
            Ok(img) => img,
            Err(e) => {
                web_sys::console::error_2(&"medview: cannot create image".into(), &e);
                slot.update(|s| {
                    s.complete(ticket, Err("image element unavailable".to_string()));
                });
                return;
            }
        };
        // フィルタ用に getImageData するので CORS を要求する
        img.set_cross_origin(Some("anonymous"));

        let on_load = EventListener::once(&img, "load", {
            let img = img.clone();
            move |_| {
                let size = (img.natural_width() as f64, img.natural_height() as f64);
                let applied = slot.try_update(|s| s.complete(ticket, Ok(img))).unwrap_or(false);
                if let (true, Some(cb)) = (applied, on_natural_size) {
                    cb.run(size);
                }
            }
        });
        let failed_url = url.clone();
        let on_error = EventListener::once(&img, "error", move |_| {
            web_sys::console::warn_1(&format!("medview: failed to load {failed_url}").into());
            slot.try_update(|s| s.complete(ticket, Err(format!("failed to load {failed_url}"))));
        });

        // 前回分のリスナーはここで外れる
        listeners.set_value(vec![on_load, on_error]);
        img.set_src(&url);
    });

    // 読み込み状態かフィルタが変わったときだけ描き直す（ズーム・パンでは呼ばれない）
    Effect::new(move |_| {
        let params = filter.get();
        let Some(el) = canvas_ref.get() else {
            return;
        };
        slot.with(|s| canvas::paint(&el, s.state(), stage, params));
    });

    on_cleanup(move || {
        slot.try_update(|s| s.clear());
    });

    view! {
        <canvas
            node_ref=canvas_ref
            class="image-layer"
            width=stage.width.to_string()
            height=stage.height.to_string()
        />
    }
}
