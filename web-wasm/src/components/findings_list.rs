//! 所見リスト（重症度で色分け）

use leptos::prelude::*;
use medview_common::{Finding, Severity};

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Urgent | Severity::Critical => "findings severity-urgent",
        Severity::Moderate => "findings severity-moderate",
        Severity::Routine => "findings severity-routine",
        Severity::Unknown => "findings severity-unknown",
    }
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Urgent | Severity::Critical => "⛔",
        Severity::Moderate => "⚠",
        Severity::Routine => "✔",
        Severity::Unknown => "ℹ",
    }
}

fn heading(severity: Severity) -> String {
    match severity {
        Severity::Unknown => "Analysis Findings".to_string(),
        s => format!("{} Findings", s.as_str()),
    }
}

#[component]
pub fn FindingsList(
    #[prop(into)] findings: Signal<Vec<Finding>>,
    #[prop(into)] severity: Signal<Severity>,
    /// 所見クリック（説明文を渡す）
    on_finding_click: Option<Callback<String>>,
) -> impl IntoView {
    view! {
        <div class=move || severity_class(severity.get())>
            <h3>
                <span class="severity-icon">{move || severity_icon(severity.get())}</span>
                {move || heading(severity.get())}
            </h3>
            <ul>
                <For
                    each=move || findings.get().into_iter().enumerate()
                    key=|(i, f)| (*i, f.description.clone())
                    let:item
                >
                    {
                        let (_, finding) = item;
                        let text = finding.display_text();
                        let description = finding.description.clone();
                        view! {
                            <li on:click=move |_| {
                                if let Some(cb) = on_finding_click {
                                    cb.run(description.clone());
                                }
                            }>
                                {text}
                            </li>
                        }
                    }
                </For>
            </ul>
        </div>
    }
}
