//! アノテーション付き画像ビューア
//!
//! 800×600 のステージに一次画像（と比較画像）を描き、アノテーションを
//! SVG で重ねる。ズーム・パンは CSS transform だけで反映し、
//! 画素の再フィルタは明るさ・コントラストが変わったときに限る。

mod pane;
mod toolbar;

use gloo::events::{EventListener, EventListenerOptions, EventListenerPhase};
use leptos::html::Div;
use leptos::prelude::*;
use medview_common::surface::{PaneRole, Stage};
use medview_common::{
    Annotation, FilterParams, NativeScale, OverlayGeometry, PixelSpacing, Point, Ruler, SurfaceLayout,
    Tool, ViewState, ViewStateController,
};
use pane::ImageLayer;
use toolbar::Toolbar;
use wasm_bindgen::JsCast;
use web_sys::{Event, MouseEvent, WheelEvent};

const RULER_HINT: &str = "Ruler Mode Active (Click & Drag)";
const RULER_COLOR: &str = "#facc15";

/// 行の同一性。描画やクリックに使う値がひとつでも変われば別の行として作り直す
type OverlayKey = (usize, String, String, Option<String>, Vec<u64>);

fn overlay_key(index: usize, annotation: &Annotation, g: &OverlayGeometry) -> OverlayKey {
    let c = annotation.coordinates;
    let numbers = [
        annotation.confidence,
        c[0],
        c[1],
        c[2],
        c[3],
        g.rect.x,
        g.rect.y,
        g.rect.width,
        g.rect.height,
        g.stroke_width,
        g.chip.x,
        g.chip.y,
        g.chip.width,
        g.chip.height,
        g.text_x,
        g.text_y,
        g.font_size,
    ];
    (
        index,
        annotation.label.clone(),
        g.text.clone(),
        annotation.explanation.clone(),
        numbers.iter().map(|n| n.to_bits()).collect(),
    )
}

/// パンのドラッグ開始点（クライアント座標）
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragOrigin {
    x: f64,
    y: f64,
}

#[component]
pub fn ImageViewer(
    #[prop(into)] image_url: Signal<String>,
    #[prop(into)] annotations: Signal<Vec<Annotation>>,
    #[prop(into, optional)] comparison_image_url: MaybeProp<String>,
    #[prop(optional)] on_annotation_click: Option<Callback<Annotation>>,
    #[prop(optional)] pixel_spacing: Option<PixelSpacing>,
) -> impl IntoView {
    let stage = Stage::default();
    let controller = RwSignal::new(ViewStateController::new(false));
    let ruler = RwSignal::new(Ruler::new());
    let drag = RwSignal::new(None::<DragOrigin>);
    let drag_offset = RwSignal::new(Point::default());
    let container_ref = NodeRef::<Div>::new();
    let wheel_listener = StoredValue::new_local(None::<EventListener>);

    let comparison_url = Signal::derive(move || {
        comparison_image_url
            .get()
            .filter(|u| !u.trim().is_empty())
    });

    Effect::new(move |_| {
        let has = comparison_url.with(Option::is_some);
        controller.update(|c| {
            c.set_has_comparison(has);
        });
    });

    // ドラッグ中の仮位置を含めた表示状態
    let view = Memo::new(move |_| {
        let mut state = controller.with(|c| c.state().clone());
        let offset = drag_offset.get();
        state.position.x += offset.x;
        state.position.y += offset.y;
        state
    });
    let layout = Memo::new(move |_| {
        controller.with(|c| SurfaceLayout::compute(c.state(), c.has_comparison(), stage))
    });
    let filter = Memo::new(move |_| controller.with(|c| FilterParams::from_view(c.state())));
    let overlays = Memo::new(move |_| {
        let geometry = view.with(|v| annotations.with(|a| layout.with(|l| l.primary_overlays(a, v))));
        annotations.with(|a| a.iter().cloned().zip(geometry).collect::<Vec<(Annotation, OverlayGeometry)>>())
    });
    let transform = move || view.with(ViewState::css_transform);
    // 画像はステージに引き伸ばして描くので、計測は元画像の画素に戻す
    let on_primary_size = Callback::new(move |(w, h): (f64, f64)| {
        ruler.update(|r| r.set_native_scale(NativeScale::between(w, h, stage)));
    });
    let tool = move || controller.with(|c| c.state().active_tool);

    // passive では preventDefault できないので gloo で直接登録する
    Effect::new(move |_| {
        let Some(el) = container_ref.get() else {
            return;
        };
        let listener = EventListener::new_with_options(
            &el,
            "wheel",
            EventListenerOptions {
                phase: EventListenerPhase::Bubble,
                passive: false,
            },
            move |event: &Event| {
                let Some(event) = event.dyn_ref::<WheelEvent>() else {
                    return;
                };
                event.prevent_default();
                controller.update(|c| {
                    c.zoom_by_wheel(event.delta_y());
                });
            },
        );
        wheel_listener.set_value(Some(listener));
    });

    // コンテナ左上を原点とするステージ座標
    let stage_point = move |ev: &MouseEvent| -> Option<Point> {
        let el = container_ref.get_untracked()?;
        let rect = el.get_bounding_client_rect();
        Some(Point::new(
            ev.client_x() as f64 - rect.left(),
            ev.client_y() as f64 - rect.top(),
        ))
    };

    let on_mousedown = move |ev: MouseEvent| {
        match controller.with_untracked(|c| c.state().active_tool) {
            Tool::Pan => {
                drag.set(Some(DragOrigin {
                    x: ev.client_x() as f64,
                    y: ev.client_y() as f64,
                }));
            }
            Tool::Ruler => {
                let Some(p) = stage_point(&ev) else {
                    return;
                };
                // 計測は一次ペインの中だけ
                if p.x > layout.with_untracked(|l| l.primary().width) {
                    return;
                }
                let state = view.get_untracked();
                ruler.update(|r| r.begin(p, &state));
            }
            Tool::None => {}
        }
    };

    let on_mousemove = move |ev: MouseEvent| {
        if let Some(origin) = drag.get_untracked() {
            drag_offset.set(Point::new(
                ev.client_x() as f64 - origin.x,
                ev.client_y() as f64 - origin.y,
            ));
        } else if ruler.with_untracked(Ruler::is_dragging) {
            if let Some(p) = stage_point(&ev) {
                let state = view.get_untracked();
                ruler.update(|r| r.update(p, &state));
            }
        }
    };

    let end_drag = move |ev: MouseEvent| {
        if drag.get_untracked().is_some() {
            // ドラッグ終了時の絶対位置で確定する
            let position = view.get_untracked().position;
            controller.update(|c| {
                c.pan_to(position.x, position.y);
            });
            drag_offset.set(Point::default());
            drag.set(None);
        } else if ruler.with_untracked(Ruler::is_dragging) {
            if let Some(p) = stage_point(&ev) {
                let state = view.get_untracked();
                ruler.update(|r| {
                    r.finish(p, &state);
                });
            }
        }
    };

    // ツールを切り替えたら計測線は消す
    Effect::new(move |_| {
        let idle = tool() != Tool::Ruler;
        if idle && ruler.with_untracked(|r| r.is_dragging() || r.measurement().is_some()) {
            ruler.update(Ruler::clear);
        }
    });

    let pane_style = move |width: f64| {
        format!(
            "position: relative; overflow: hidden; width: {}px; height: {}px;",
            width, stage.height
        )
    };
    let layer_style = move || {
        format!(
            "position: absolute; left: 0; top: 0; transform-origin: 0 0; transform: {};",
            transform()
        )
    };
    let cursor = move || match tool() {
        Tool::Pan if drag.get().is_some() => "grabbing",
        Tool::Pan => "grab",
        Tool::Ruler => "crosshair",
        Tool::None => "default",
    };

    view! {
        <div class="image-viewer">
            <Toolbar controller=controller />

            <div
                node_ref=container_ref
                class="viewer-stage"
                style:width=format!("{}px", stage.width)
                style:height=format!("{}px", stage.height)
                style:cursor=cursor
                on:mousedown=on_mousedown
                on:mousemove=on_mousemove
                on:mouseup=end_drag
                on:mouseleave=end_drag
            >
                <div class="viewer-panes">
                    <For
                        each=move || layout.get().panes
                        key=|pane| pane.role == PaneRole::Primary
                        let:pane
                    >
                        {
                            // 分割の切り替えでペインを作り直さない（画像を読み直さない）
                            let role = pane.role;
                            let current = move || layout.with(|l| l.panes.iter().find(|p| p.role == role).cloned());
                            let width = move || current().map_or(stage.width, |p| p.width);
                            let label = move || current().and_then(|p| p.label);
                            let url = Signal::derive(move || match role {
                                PaneRole::Primary => Some(image_url.get()),
                                PaneRole::Comparison => comparison_url.get(),
                            });
                            view! {
                                <div class="viewer-pane" style=move || pane_style(width())>
                                    <div class="viewer-layer" style=layer_style>
                                        <ImageLayer
                                            url=url
                                            filter=filter
                                            stage=stage
                                            on_natural_size=(role == PaneRole::Primary).then_some(on_primary_size)
                                        />
                                        <Show when=move || role == PaneRole::Primary>
                                            <AnnotationOverlay
                                                overlays=overlays
                                                ruler=ruler
                                                scale=Signal::derive(move || view.with(|v| v.scale))
                                                pixel_spacing=pixel_spacing
                                                on_annotation_click=on_annotation_click
                                                stage=stage
                                            />
                                        </Show>
                                    </div>
                                    {move || label().map(|label| view! { <span class="pane-label">{label}</span> })}
                                </div>
                            }
                        }
                    </For>
                </div>

                <Show when=move || tool() == Tool::Ruler>
                    <div class="ruler-hint" style:color=RULER_COLOR>{RULER_HINT}</div>
                </Show>
            </div>

            <p class="viewer-footer">"Mouse Wheel to Zoom • Drag to Pan"</p>
        </div>
    }
}

/// アノテーションと計測線の SVG レイヤー（画像と同じ変換の内側に置く）
#[component]
fn AnnotationOverlay(
    overlays: Memo<Vec<(Annotation, OverlayGeometry)>>,
    ruler: RwSignal<Ruler>,
    scale: Signal<f64>,
    pixel_spacing: Option<PixelSpacing>,
    on_annotation_click: Option<Callback<Annotation>>,
    stage: Stage,
) -> impl IntoView {
    view! {
        <svg
            class="annotation-layer"
            width=stage.width.to_string()
            height=stage.height.to_string()
            style="position: absolute; left: 0; top: 0; overflow: visible;"
        >
            <For
                each=move || overlays.get().into_iter().enumerate()
                key=|(i, (a, g))| overlay_key(*i, a, g)
                let:item
            >
                {
                    let (_, (annotation, g)) = item;
                    let on_click = move |ev: MouseEvent| {
                        ev.stop_propagation();
                        if let Some(cb) = on_annotation_click {
                            cb.run(annotation.clone());
                        }
                    };
                    view! {
                        <g
                            class="annotation"
                            style:cursor="pointer"
                            on:click=on_click
                        >
                            <rect
                                x=g.rect.x.to_string()
                                y=g.rect.y.to_string()
                                width=g.rect.width.max(0.0).to_string()
                                height=g.rect.height.max(0.0).to_string()
                                fill="none"
                                stroke="red"
                                stroke-width=g.stroke_width.to_string()
                            />
                            <rect
                                x=g.chip.x.to_string()
                                y=g.chip.y.to_string()
                                width=g.chip.width.to_string()
                                height=g.chip.height.to_string()
                                fill="red"
                                opacity="0.8"
                            />
                            <text
                                x=g.text_x.to_string()
                                y=g.text_y.to_string()
                                fill="white"
                                font-size=g.font_size.to_string()
                                dominant-baseline="hanging"
                            >
                                {g.text.clone()}
                            </text>
                        </g>
                    }
                }
            </For>

            {move || {
                let m = ruler.with(Ruler::measurement)?;
                let s = scale.get();
                let label = m.label(pixel_spacing);
                Some(view! {
                    <g class="ruler">
                        <line
                            x1=m.start.x.to_string()
                            y1=m.start.y.to_string()
                            x2=m.end.x.to_string()
                            y2=m.end.y.to_string()
                            stroke=RULER_COLOR
                            stroke-width=(2.0 / s).to_string()
                        />
                        <text
                            x=(m.end.x + 6.0 / s).to_string()
                            y=(m.end.y - 6.0 / s).to_string()
                            fill=RULER_COLOR
                            font-size=(12.0 / s).to_string()
                        >
                            {label}
                        </text>
                    </g>
                })
            }}
        </svg>
    }
}
