//! ビューアのツールバー

use leptos::prelude::*;
use medview_common::view_state::{MAX_BRIGHTNESS, MAX_CONTRAST, MIN_BRIGHTNESS, MIN_CONTRAST};
use medview_common::{Repaint, Tool, ViewStateController};

#[component]
pub fn Toolbar(controller: RwSignal<ViewStateController>) -> impl IntoView {
    // 各操作の Repaint は描画側が Memo で拾うので、ここでは捨てる
    let act = move |f: fn(&mut ViewStateController) -> Repaint| {
        controller.update(|c| {
            f(c);
        })
    };

    let tool = move || controller.with(|c| c.state().active_tool);
    let zoom_percent = move || controller.with(|c| c.state().zoom_percent());
    let brightness = move || controller.with(|c| c.state().brightness).to_string();
    let contrast = move || controller.with(|c| c.state().contrast).to_string();
    let annotations_visible = move || controller.with(|c| c.state().annotations_visible);
    let split = move || controller.with(|c| c.state().split_view_enabled);
    let has_comparison = move || controller.with(|c| c.has_comparison());

    let on_brightness = move |ev| {
        if let Ok(v) = event_target_value(&ev).parse::<f64>() {
            controller.update(|c| {
                c.set_brightness(v);
            });
        }
    };
    let on_contrast = move |ev| {
        if let Ok(v) = event_target_value(&ev).parse::<f64>() {
            controller.update(|c| {
                c.set_contrast(v);
            });
        }
    };

    view! {
        <div class="viewer-toolbar">
            <div class="zoom-controls">
                <button title="Zoom Out" on:click=move |_| act(ViewStateController::zoom_out)>"−"</button>
                <span class="zoom-readout">{move || format!("{}%", zoom_percent())}</span>
                <button title="Zoom In" on:click=move |_| act(ViewStateController::zoom_in)>"+"</button>
            </div>

            <button
                title="Pan Tool"
                class:active=move || tool() == Tool::Pan
                on:click=move |_| controller.update(|c| {
                    c.set_tool(Tool::Pan);
                })
            >
                "✥"
            </button>
            <button
                title="Ruler"
                class:active=move || tool() == Tool::Ruler
                on:click=move |_| act(ViewStateController::toggle_ruler)
            >
                "📏"
            </button>

            <div class="divider" />

            <label class="slider" title="Brightness">
                "☀"
                <input
                    type="range"
                    min=MIN_BRIGHTNESS.to_string()
                    max=MAX_BRIGHTNESS.to_string()
                    step="0.05"
                    prop:value=brightness
                    on:input=on_brightness
                />
            </label>
            <label class="slider" title="Contrast">
                "◐"
                <input
                    type="range"
                    min=MIN_CONTRAST.to_string()
                    max=MAX_CONTRAST.to_string()
                    step="5"
                    prop:value=contrast
                    on:input=on_contrast
                />
            </label>

            <div class="divider" />

            <button
                class:active=annotations_visible
                on:click=move |_| act(ViewStateController::toggle_annotations)
            >
                {move || if annotations_visible() { "👁 Annotations" } else { "◌ Annotations" }}
            </button>

            <Show when=has_comparison>
                <button
                    class:active=split
                    on:click=move |_| act(ViewStateController::toggle_split_view)
                >
                    "▥ Compare"
                </button>
            </Show>

            <button class="reset" title="Reset View" on:click=move |_| act(ViewStateController::reset)>
                "↺"
            </button>
        </div>
    }
}
