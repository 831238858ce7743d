//! ヘッダーコンポーネント

use leptos::prelude::*;

#[component]
pub fn Header(
    /// 解析結果表示中のみ「New scan」を出す
    #[prop(into)]
    show_new_scan: Signal<bool>,
    on_new_scan: Callback<()>,
) -> impl IntoView {
    view! {
        <header class="header">
            <h1>"medview - Medical Image Review"</h1>
            <Show when=move || show_new_scan.get()>
                <button class="btn-secondary" on:click=move |_| on_new_scan.run(())>
                    "New scan"
                </button>
            </Show>
        </header>
    }
}
