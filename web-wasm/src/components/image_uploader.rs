//! 画像アップロード（ドラッグ&ドロップ / ファイル選択）
//!
//! 形式・サイズの検証はネットワークに出す前に済ませる。
//! アップロードが成功したら `image_id` を親へ渡し、診断の取得は親が行う。

use crate::api;
use leptos::html::Input;
use leptos::prelude::*;
use leptos::task::spawn_local;
use medview_common::upload::{format_file_size, mime_has_preview, validate_selection};
use medview_common::{ApiEndpoints, Error, MAX_UPLOAD_BYTES};
use web_sys::{DragEvent, File, FileList, Url};

const UPLOAD_FAILED: &str = "Upload failed. Please try again.";

/// アップロード完了通知
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub image_id: String,
    /// ブラウザで表示できる形式なら object URL
    pub preview_url: Option<String>,
}

/// 選択中のファイル
#[derive(Clone)]
struct Selected {
    file: File,
    name: String,
    size: u64,
    preview_url: Option<String>,
}

fn files_of(list: &FileList) -> Vec<File> {
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

/// アップロード失敗時の表示文言
fn upload_error_message(err: &Error) -> String {
    match err {
        Error::Upload(rejection) => rejection.to_string(),
        Error::Http { detail, .. } if !detail.is_empty() => detail.clone(),
        Error::Parse(msg) if msg.contains("No image ID") => msg.clone(),
        _ => UPLOAD_FAILED.to_string(),
    }
}

fn revoke(preview_url: Option<&str>) {
    if let Some(url) = preview_url {
        let _ = Url::revoke_object_url(url);
    }
}

#[component]
pub fn ImageUploader(on_upload_complete: Callback<UploadedImage>) -> impl IntoView {
    let endpoints = StoredValue::new(use_context::<ApiEndpoints>().unwrap_or_default());
    let selected = RwSignal::new_local(None::<Selected>);
    let is_dragover = RwSignal::new(false);
    let is_uploading = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);
    let input_ref = NodeRef::<Input>::new();

    let select = move |files: Vec<File>| {
        error.set(None);
        let meta: Vec<(String, u64)> = files.iter().map(|f| (f.name(), f.size() as u64)).collect();
        let validated = match validate_selection(&meta, MAX_UPLOAD_BYTES) {
            Ok(v) => v,
            Err(rejection) => {
                error.set(Some(rejection.to_string()));
                return;
            }
        };
        let Some(file) = files.into_iter().next() else {
            return;
        };
        let preview_url = if mime_has_preview(&file.type_()) {
            Url::create_object_url_with_blob(&file).ok()
        } else {
            None
        };
        selected.update(|s| {
            if let Some(prev) = s.take() {
                revoke(prev.preview_url.as_deref());
            }
            *s = Some(Selected {
                file,
                name: validated.file_name,
                size: validated.size,
                preview_url,
            });
        });
    };

    let clear = move || {
        selected.update(|s| {
            if let Some(prev) = s.take() {
                revoke(prev.preview_url.as_deref());
            }
        });
        is_uploading.set(false);
        error.set(None);
    };

    let on_drop = move |ev: DragEvent| {
        ev.prevent_default();
        is_dragover.set(false);
        if let Some(files) = ev.data_transfer().and_then(|dt| dt.files()) {
            select(files_of(&files));
        }
    };
    let on_dragover = move |ev: DragEvent| {
        ev.prevent_default();
        is_dragover.set(true);
    };
    let on_dragleave = move |_: DragEvent| is_dragover.set(false);
    let on_pick = move |_| {
        if let Some(input) = input_ref.get() {
            input.click();
        }
    };
    let on_change = move |_| {
        let Some(input) = input_ref.get() else {
            return;
        };
        if let Some(files) = input.files() {
            select(files_of(&files));
        }
        // 同じファイルを選び直しても change が発火するように
        input.set_value("");
    };

    let on_upload = move |_| {
        let Some(current) = selected.get_untracked() else {
            return;
        };
        is_uploading.set(true);
        error.set(None);
        let endpoints = endpoints.get_value();
        spawn_local(async move {
            match api::upload_image(&endpoints, &current.file).await {
                Ok(resp) => {
                    // プレビューURLは親へ引き渡すので revoke しない
                    selected.set(None);
                    is_uploading.set(false);
                    on_upload_complete.run(UploadedImage {
                        image_id: resp.image_id,
                        preview_url: current.preview_url,
                    });
                }
                Err(e) => {
                    web_sys::console::error_1(&format!("Upload error: {e}").into());
                    error.set(Some(upload_error_message(&e)));
                    is_uploading.set(false);
                }
            }
        });
    };

    let has_selection = move || selected.with(Option::is_some);

    view! {
        <div class="uploader">
            <input
                node_ref=input_ref
                type="file"
                accept=".dcm,.jpg,.jpeg,.png,image/jpeg,image/png"
                style="display: none"
                on:change=on_change
            />
            <Show
                when=has_selection
                fallback=move || view! {
                    <div
                        class="upload-area"
                        class:dragover=move || is_dragover.get()
                        on:drop=on_drop
                        on:dragover=on_dragover
                        on:dragleave=on_dragleave
                        on:click=on_pick
                    >
                        <div class="upload-icon">"⬆"</div>
                        <p>
                            {move || if is_dragover.get() { "Drop image here" } else { "Drag & drop medical image" }}
                        </p>
                        <p class="text-muted">"DICOM, JPG, PNG (Max 25MB)"</p>
                    </div>
                }
            >
                <div class="upload-preview">
                    <div class="upload-file">
                        <span class="file-name">{move || selected.with(|s| s.as_ref().map(|s| s.name.clone()))}</span>
                        <span class="file-size">
                            {move || selected.with(|s| s.as_ref().map(|s| format_file_size(s.size)))}
                        </span>
                    </div>
                    <div class="preview-area">
                        {move || match selected.with(|s| s.as_ref().and_then(|s| s.preview_url.clone())) {
                            Some(url) => view! { <img src=url alt="Preview" /> }.into_any(),
                            None => view! { <p>"No preview available for this format"</p> }.into_any(),
                        }}
                        <Show when=move || is_uploading.get()>
                            <div class="upload-overlay">"Uploading..."</div>
                        </Show>
                    </div>
                    <div class="upload-actions">
                        <button disabled=move || is_uploading.get() on:click=move |_| clear()>
                            "Cancel"
                        </button>
                        <button class="btn-primary" disabled=move || is_uploading.get() on:click=on_upload>
                            {move || if is_uploading.get() { "Processing..." } else { "Upload & Analyze" }}
                        </button>
                    </div>
                </div>
            </Show>

            {move || error.get().map(|msg| view! { <div class="error-message">{msg}</div> })}
        </div>
    }
}
