//! レポート生成モーダル

use crate::api;
use leptos::prelude::*;
use leptos::task::spawn_local;
use medview_common::{ApiEndpoints, DiagnosisResult, ReportForm, ReportRequest};

const REPORT_FAILED: &str = "Failed to generate report. Please try again.";

#[component]
pub fn ReportGenerator(
    #[prop(into)] is_open: Signal<bool>,
    on_close: Callback<()>,
    #[prop(into)] diagnosis: Signal<Option<DiagnosisResult>>,
    #[prop(into)] image_id: Signal<String>,
) -> impl IntoView {
    let endpoints = StoredValue::new(use_context::<ApiEndpoints>().unwrap_or_default());
    let patient_name = RwSignal::new(String::new());
    let doctor_name = RwSignal::new(String::new());
    let indication = RwSignal::new(String::new());
    let loading = RwSignal::new(false);
    let report_url = RwSignal::new(None::<String>);
    let error = RwSignal::new(None::<String>);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let Some(result) = diagnosis.get_untracked() else {
            return;
        };
        let form = ReportForm {
            patient_name: patient_name.get_untracked(),
            doctor_name: doctor_name.get_untracked(),
            clinical_indication: indication.get_untracked(),
        };
        let request = ReportRequest::from_diagnosis(&image_id.get_untracked(), &result, &form);

        loading.set(true);
        error.set(None);
        report_url.set(None);
        let endpoints = endpoints.get_value();
        spawn_local(async move {
            match api::generate_report(&endpoints, &request).await {
                Ok(url) => report_url.set(Some(url)),
                Err(e) => {
                    web_sys::console::error_1(&format!("Report error: {e}").into());
                    error.set(Some(REPORT_FAILED.to_string()));
                }
            }
            loading.set(false);
        });
    };

    let close = move |_| {
        report_url.set(None);
        error.set(None);
        on_close.run(());
    };

    view! {
        <Show when=move || is_open.get()>
            <div class="modal-backdrop">
                <div class="modal">
                    <div class="modal-header">
                        <h2>"Generate Medical Report"</h2>
                        <button class="modal-close" on:click=close>"×"</button>
                    </div>
                    <div class="modal-body">
                        {move || match report_url.get() {
                            None => view! {
                                <form on:submit=on_submit>
                                    <label>
                                        "Patient Name / ID"
                                        <input
                                            type="text"
                                            placeholder="e.g. John Doe / P-12345"
                                            prop:value=move || patient_name.get()
                                            on:input=move |ev| patient_name.set(event_target_value(&ev))
                                        />
                                    </label>
                                    <label>
                                        "Referring Physician"
                                        <input
                                            type="text"
                                            placeholder="e.g. Dr. Sarah Smith"
                                            prop:value=move || doctor_name.get()
                                            on:input=move |ev| doctor_name.set(event_target_value(&ev))
                                        />
                                    </label>
                                    <label>
                                        "Clinical Indication"
                                        <textarea
                                            placeholder="Reason for examination..."
                                            prop:value=move || indication.get()
                                            on:input=move |ev| indication.set(event_target_value(&ev))
                                        />
                                    </label>
                                    {move || error.get().map(|msg| view! { <div class="error-message">{msg}</div> })}
                                    <button type="submit" class="btn-primary" disabled=move || loading.get()>
                                        {move || if loading.get() { "Generating..." } else { "Generate PDF" }}
                                    </button>
                                </form>
                            }
                            .into_any(),
                            Some(url) => view! {
                                <div class="report-ready">
                                    <h3>"Report Ready!"</h3>
                                    <p>"The medical report has been successfully generated."</p>
                                    <a class="btn-primary" href=url target="_blank" rel="noreferrer">
                                        "Download Report"
                                    </a>
                                </div>
                            }
                            .into_any(),
                        }}
                    </div>
                </div>
            </div>
        </Show>
    }
}
