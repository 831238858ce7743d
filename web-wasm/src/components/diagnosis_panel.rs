//! 診断結果パネル
//!
//! 結果は不変のスナップショットとして受け取り、表示モード（医療用語 / 平易な言葉）と
//! 開いているセクションだけをローカルに持つ。

use crate::components::findings_list::FindingsList;
use leptos::prelude::*;
use medview_common::diagnosis::{ExplanationMode, RecommendationKind};
use medview_common::DiagnosisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Differential,
    Recommendations,
}

/// 確率バーの幅（CSS）
fn bar_width(fraction: f64) -> String {
    format!("{}%", (fraction.clamp(0.0, 1.0) * 100.0).round())
}

#[component]
pub fn DiagnosisPanel(
    #[prop(into)] diagnosis: Signal<Option<DiagnosisResult>>,
    #[prop(into)] loading: Signal<bool>,
    on_generate_report: Callback<()>,
    #[prop(optional)] on_finding_click: Option<Callback<String>>,
) -> impl IntoView {
    let mode = RwSignal::new(ExplanationMode::Medical);
    let expanded = RwSignal::new(Some(Section::Differential));

    let toggle = move |section: Section| {
        expanded.update(|e| {
            *e = if *e == Some(section) { None } else { Some(section) };
        });
    };

    let details = move || diagnosis.with(|d| d.as_ref().map(|d| d.details.clone()));
    let findings = Signal::derive(move || details().map(|d| d.findings).unwrap_or_default());
    let severity = Signal::derive(move || details().map(|d| d.severity).unwrap_or_default());
    let is_emergency = move || severity.get().is_emergency();
    let high_confidence = move || diagnosis.with(|d| d.as_ref().is_some_and(DiagnosisResult::is_high_confidence));

    view! {
        <Show
            when=move || !loading.get()
            fallback=|| view! {
                <aside class="diagnosis-panel loading">
                    <div class="skeleton title" />
                    <div class="skeleton block" />
                    <div class="skeleton block" />
                </aside>
            }
        >
            <Show when=move || diagnosis.with(Option::is_some)>
                <aside class="diagnosis-panel">
                    <div class="mode-toggle">
                        <button
                            class:active=move || mode.get() == ExplanationMode::Medical
                            on:click=move |_| mode.set(ExplanationMode::Medical)
                        >
                            "Medical Terms"
                        </button>
                        <button
                            class:active=move || mode.get() == ExplanationMode::Patient
                            on:click=move |_| mode.set(ExplanationMode::Patient)
                        >
                            "Plain Language"
                        </button>
                    </div>

                    <div class="panel-body">
                        <Show when=is_emergency>
                            <div class="emergency-banner">
                                <h3>"Medical Emergency"</h3>
                                <p>"Condition requires immediate attention. Protocol initiated."</p>
                            </div>
                        </Show>

                        <div class="diagnosis-summary" class:high-confidence=high_confidence>
                            <h2>
                                {move || diagnosis.with(|d| d.as_ref().map(|d| d.diagnosis.clone()))}
                            </h2>
                            <span class="confidence">
                                {move || diagnosis.with(|d| {
                                    d.as_ref().map(|d| format!("Confidence {}%", (d.confidence * 100.0).round()))
                                })}
                            </span>
                        </div>

                        <FindingsList
                            findings=findings
                            severity=severity
                            on_finding_click=on_finding_click
                        />

                        <section class="collapsible">
                            <button class="section-header" on:click=move |_| toggle(Section::Differential)>
                                "Differential Diagnosis"
                            </button>
                            <Show when=move || expanded.get() == Some(Section::Differential)>
                                <div class="section-body">
                                    <For
                                        each=move || details().map(|d| d.differential_diagnosis).unwrap_or_default()
                                        key=|item| item.condition.clone()
                                        let:item
                                    >
                                        <div class="differential">
                                            <div class="differential-row">
                                                <span class="condition">{item.condition.clone()}</span>
                                                <span class="probability">{item.probability.text.clone()}</span>
                                            </div>
                                            <div class="prob-track">
                                                <div
                                                    class=format!("prob-bar {}", item.probability.band().css_class())
                                                    style:width=bar_width(item.probability.fraction)
                                                />
                                            </div>
                                            {item.reasoning.clone().map(|r| view! { <p class="reasoning">{r}</p> })}
                                        </div>
                                    </For>
                                </div>
                            </Show>
                        </section>

                        <section class="collapsible">
                            <button class="section-header" on:click=move |_| toggle(Section::Recommendations)>
                                "Recommendations"
                            </button>
                            <Show when=move || expanded.get() == Some(Section::Recommendations)>
                                <ul class="section-body recommendations">
                                    <For
                                        each=move || details().map(|d| d.recommendations).unwrap_or_default()
                                        key=|rec| rec.clone()
                                        let:rec
                                    >
                                        <li>
                                            <span class="rec-icon">{RecommendationKind::classify(&rec).icon()}</span>
                                            <span>{rec.clone()}</span>
                                        </li>
                                    </For>
                                </ul>
                            </Show>
                        </section>

                        <div class="explanation">
                            <h3>"Patient Explanation"</h3>
                            <p>
                                {move || diagnosis.with(|d| {
                                    d.as_ref().map(|d| d.explanation(mode.get()).to_string())
                                })}
                            </p>
                        </div>
                    </div>

                    <div class="panel-footer">
                        <button class="btn-primary" on:click=move |_| on_generate_report.run(())>
                            "Generate Full Report"
                        </button>
                    </div>
                </aside>
            </Show>
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_width() {
        assert_eq!(bar_width(0.85), "85%");
        assert_eq!(bar_width(1.4), "100%");
        assert_eq!(bar_width(-0.2), "0%");
    }
}
