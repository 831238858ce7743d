//! バックエンドAPI連携

mod client;

pub use client::*;

use medview_common::api::DEFAULT_API_BASE;
use medview_common::ApiEndpoints;
use wasm_bindgen::JsCast;

/// `<meta name="medview-api-url" content="...">` があればそれを、なければ既定値を使う
pub fn endpoints_from_document() -> ApiEndpoints {
    let base = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.query_selector("meta[name=medview-api-url]").ok().flatten())
        .and_then(|el| el.dyn_into::<web_sys::HtmlMetaElement>().ok())
        .map(|meta| meta.content())
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    ApiEndpoints::new(&base)
}
