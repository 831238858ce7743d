//! メインアプリケーションコンポーネント
//!
//! `ReviewSession` はここで1つだけ作り、コンテキストで配る。

use crate::api;
use crate::components::{
    diagnosis_panel::DiagnosisPanel,
    header::Header,
    image_uploader::{ImageUploader, UploadedImage},
    image_viewer::ImageViewer,
    report_generator::ReportGenerator,
};
use leptos::prelude::*;
use leptos::task::spawn_local;
use medview_common::{Annotation, ReviewSession};
use web_sys::Url;

const ANALYSIS_FAILED: &str = "Analysis failed. Please try again.";

fn revoke(url: Option<String>) {
    if let Some(url) = url.filter(|u| u.starts_with("blob:")) {
        let _ = Url::revoke_object_url(&url);
    }
}

/// メインアプリケーションコンポーネント
#[component]
pub fn App() -> impl IntoView {
    let session = RwSignal::new(ReviewSession::new());
    let endpoints = api::endpoints_from_document();
    provide_context(session);
    provide_context(endpoints.clone());
    let endpoints = StoredValue::new(endpoints);

    let image_id = RwSignal::new(None::<String>);
    let preview_url = RwSignal::new(None::<String>);
    let reference_url = RwSignal::new(None::<String>);
    let report_open = RwSignal::new(false);
    let note = RwSignal::new(None::<String>);
    // New scan 後に古い解析結果が戻ってきても捨てる
    let scan_generation = StoredValue::new(0u64);

    let on_upload_complete = Callback::new(move |uploaded: UploadedImage| {
        scan_generation.update_value(|g| *g += 1);
        let generation = scan_generation.get_value();
        let id = uploaded.image_id.clone();
        image_id.set(Some(id.clone()));
        preview_url.set(uploaded.preview_url);
        session.update(ReviewSession::begin_analysis);

        let endpoints = endpoints.get_value();
        spawn_local(async move {
            let outcome = api::diagnose(&endpoints, &id).await;
            if scan_generation.get_value() != generation {
                return;
            }
            match outcome {
                Ok(result) => session.update(|s| {
                    s.finish_analysis(result);
                    if s.current_image().is_none() {
                        s.set_current_image(preview_url.get_untracked());
                    }
                }),
                Err(e) => {
                    web_sys::console::error_1(&format!("Analysis error: {e}").into());
                    session.update(|s| s.fail_analysis(ANALYSIS_FAILED));
                }
            }
        });
    });

    let on_new_scan = Callback::new(move |_: ()| {
        scan_generation.update_value(|g| *g += 1);
        session.update(ReviewSession::reset);
        image_id.set(None);
        revoke(preview_url.get_untracked());
        preview_url.set(None);
        revoke(reference_url.get_untracked());
        reference_url.set(None);
        report_open.set(false);
        note.set(None);
    });

    let on_annotation_click = Callback::new(move |a: Annotation| {
        let text = match a.explanation.as_deref() {
            Some(exp) if !exp.trim().is_empty() => format!("{}: {}", a.label, exp),
            _ => a.label.clone(),
        };
        note.set(Some(text));
    });
    let on_finding_click = Callback::new(move |finding: String| note.set(Some(finding)));

    let on_reference_change = move |ev: leptos::ev::Event| {
        let input: web_sys::HtmlInputElement = event_target(&ev);
        let url = input
            .files()
            .and_then(|files| files.get(0))
            .and_then(|file| Url::create_object_url_with_blob(&file).ok());
        revoke(reference_url.get_untracked());
        reference_url.set(url);
    };

    let current_image = Signal::derive(move || session.with(|s| s.current_image().map(str::to_string)));
    let analysis = Signal::derive(move || session.with(|s| s.analysis().cloned()));
    let is_analyzing = Signal::derive(move || session.with(ReviewSession::is_analyzing));
    let annotations = Signal::derive(move || {
        session.with(|s| s.analysis().map(|a| a.details.annotations.clone()).unwrap_or_default())
    });

    view! {
        <div class="container">
            <Header
                show_new_scan=Signal::derive(move || analysis.with(Option::is_some))
                on_new_scan=on_new_scan
            />

            <main class="dashboard">
                <section class="viewer-column">
                    <Show
                        when=move || current_image.with(Option::is_some)
                        fallback=move || view! {
                            <ImageUploader on_upload_complete=on_upload_complete />
                            <Show when=move || is_analyzing.get()>
                                <div class="analyzing">
                                    <p>"Analyzing Medical Image..."</p>
                                    <p class="text-muted">"Running differential diagnosis algorithms"</p>
                                </div>
                            </Show>
                            {move || session.with(|s| s.error().map(str::to_string)).map(|msg| {
                                view! { <div class="error-message">{msg}</div> }
                            })}
                        }
                    >
                        <ImageViewer
                            image_url=Signal::derive(move || current_image.get().unwrap_or_default())
                            annotations=annotations
                            comparison_image_url=Signal::derive(move || reference_url.get())
                            on_annotation_click=on_annotation_click
                        />
                        <label class="reference-picker">
                            "Reference image "
                            <input type="file" accept="image/*" on:change=on_reference_change />
                        </label>
                        {move || note.get().map(|text| view! { <p class="annotation-note">{text}</p> })}
                    </Show>
                </section>

                <DiagnosisPanel
                    diagnosis=analysis
                    loading=is_analyzing
                    on_generate_report=Callback::new(move |_: ()| report_open.set(true))
                    on_finding_click=on_finding_click
                />
            </main>

            <ReportGenerator
                is_open=report_open
                on_close=Callback::new(move |_: ()| report_open.set(false))
                diagnosis=analysis
                image_id=Signal::derive(move || image_id.get().unwrap_or_default())
            />
        </div>
    }
}
