//! 診断結果ファイルの入出力とターミナル表示

use crate::error::{MedviewError, Result};
use medview_common::diagnosis::RecommendationKind;
use medview_common::{parse_diagnosis, DiagnosisResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 一括処理の保存先を画像ごとに決める
///
/// 既定は `<stem>.diagnosis.json`。走査ルートからの相対フォルダを `output_dir` の下に再現する。
/// 同じフォルダで語幹が重なる画像は `<stem>.<ext>.diagnosis.json` にする。
pub fn batch_result_paths(output_dir: &Path, scan_root: &Path, images: &[&Path]) -> Vec<PathBuf> {
    let placed: Vec<(PathBuf, String)> = images
        .iter()
        .map(|image| {
            let rel_dir = image
                .parent()
                .and_then(|p| p.strip_prefix(scan_root).ok())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let stem = image
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "result".to_string());
            (rel_dir, stem)
        })
        .collect();

    let mut counts: HashMap<(&Path, &str), usize> = HashMap::new();
    for (dir, stem) in &placed {
        *counts.entry((dir.as_path(), stem.as_str())).or_default() += 1;
    }

    images
        .iter()
        .zip(&placed)
        .map(|(image, (dir, stem))| {
            let name = match image.extension() {
                Some(ext) if counts[&(dir.as_path(), stem.as_str())] > 1 => {
                    format!("{}.{}.diagnosis.json", stem, ext.to_string_lossy())
                }
                _ => format!("{}.diagnosis.json", stem),
            };
            output_dir.join(dir).join(name)
        })
        .collect()
}

pub fn save_result(result: &DiagnosisResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// 結果JSONを読み込む
///
/// このツールが保存した正規形と、バックエンド応答そのままの形の両方を受け付ける。
pub fn load_result(path: &Path) -> Result<DiagnosisResult> {
    if !path.exists() {
        return Err(MedviewError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    if let Ok(result) = serde_json::from_str::<DiagnosisResult>(&content) {
        return Ok(result);
    }
    tracing::debug!(path = %path.display(), "not in saved form, parsing as backend payload");
    Ok(parse_diagnosis(&content)?)
}

/// 1件分の要約
pub fn format_summary(result: &DiagnosisResult) -> String {
    let details = &result.details;
    let mut lines = vec![
        format!("診断: {} (信頼度 {:.0}%)", result.diagnosis, result.confidence * 100.0),
        format!("重症度: {}{}", details.severity, if details.severity.is_emergency() { " ⚠" } else { "" }),
    ];

    if !details.findings.is_empty() {
        lines.push("所見:".to_string());
        lines.extend(details.findings.iter().map(|f| format!("  - {}", f.display_text())));
    }
    if !details.differential_diagnosis.is_empty() {
        lines.push("鑑別診断:".to_string());
        lines.extend(
            details
                .differential_diagnosis
                .iter()
                .map(|d| format!("  - {} ({})", d.condition, d.probability.text)),
        );
    }
    if !details.recommendations.is_empty() {
        lines.push("推奨:".to_string());
        lines.extend(
            details
                .recommendations
                .iter()
                .map(|r| format!("  {} {}", RecommendationKind::classify(r).icon(), r)),
        );
    }
    if !details.annotations.is_empty() {
        lines.push(format!("アノテーション: {}件", details.annotations.len()));
    }
    lines.join("\n")
}
