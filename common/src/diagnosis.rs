//! 診断結果の型定義
//!
//! バックエンドの応答は [`crate::parser`] でこの正規形に変換してから使う。
//! 取得後は不変のスナップショットとして扱い、書き換えずに丸ごと差し替える。

use crate::annotation::Annotation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 所見
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Finding {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Finding {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            location: None,
        }
    }

    /// 一覧表示用（部位があれば括弧で付ける）
    pub fn display_text(&self) -> String {
        match &self.location {
            Some(loc) if !loc.trim().is_empty() => format!("{} ({})", self.description, loc),
            _ => self.description.clone(),
        }
    }
}

/// 重症度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Urgent,
    Critical,
    Moderate,
    Routine,
    #[default]
    Unknown,
}

impl Severity {
    /// 大文字小文字を区別せずに解釈。該当しなければ `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "URGENT" => Some(Severity::Urgent),
            "CRITICAL" => Some(Severity::Critical),
            "MODERATE" => Some(Severity::Moderate),
            "ROUTINE" => Some(Severity::Routine),
            "UNKNOWN" | "" => Some(Severity::Unknown),
            _ => None,
        }
    }

    /// 緊急対応バナーを出すか
    pub fn is_emergency(self) -> bool {
        matches!(self, Severity::Urgent | Severity::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Urgent => "URGENT",
            Severity::Critical => "CRITICAL",
            Severity::Moderate => "MODERATE",
            Severity::Routine => "ROUTINE",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 確率（バックエンドの表記と 0〜1 の値を両方保持）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Probability {
    pub text: String,
    pub fraction: f64,
}

impl Probability {
    /// `"90%"`・`"0.9"`・`"90"` を解釈
    ///
    /// `%` 付きは常に百分率。数値だけなら 1 より大きければ百分率、1 以下なら比率。
    /// 解釈できなければ 0。
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let (body, percent) = match trimmed.strip_suffix('%') {
            Some(body) => (body.trim(), true),
            None => (trimmed, false),
        };
        let fraction = match body.parse::<f64>().ok() {
            Some(n) if !n.is_finite() || n < 0.0 => 0.0,
            Some(n) if percent || n > 1.0 => n / 100.0,
            Some(n) => n,
            None => 0.0,
        };
        Self {
            text: trimmed.to_string(),
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    pub fn from_number(n: f64) -> Self {
        let fraction = if n > 1.0 { n / 100.0 } else { n.max(0.0) };
        let fraction = fraction.clamp(0.0, 1.0);
        Self {
            text: format!("{}%", (fraction * 100.0).round() as i64),
            fraction,
        }
    }

    pub fn band(&self) -> ProbabilityBand {
        ProbabilityBand::of(self.fraction)
    }
}

/// 確率バーの色分け
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbabilityBand {
    High,
    Medium,
    Low,
}

impl ProbabilityBand {
    pub fn of(score: f64) -> Self {
        if score > 0.7 {
            ProbabilityBand::High
        } else if score > 0.4 {
            ProbabilityBand::Medium
        } else {
            ProbabilityBand::Low
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ProbabilityBand::High => "prob-high",
            ProbabilityBand::Medium => "prob-medium",
            ProbabilityBand::Low => "prob-low",
        }
    }
}

/// 鑑別診断の1候補
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DifferentialDiagnosis {
    pub condition: String,
    pub probability: Probability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// 推奨事項の種類（アイコン選択用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    Emergency,
    Referral,
    Treatment,
    Test,
}

impl RecommendationKind {
    pub fn classify(text: &str) -> Self {
        let t = text.to_lowercase();
        if t.contains("urgent") || t.contains("emergency") {
            RecommendationKind::Emergency
        } else if t.contains("consult") || t.contains("referral") {
            RecommendationKind::Referral
        } else if t.contains("treatment") || t.contains("medication") {
            RecommendationKind::Treatment
        } else {
            RecommendationKind::Test
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            RecommendationKind::Emergency => "🚑",
            RecommendationKind::Referral => "👩‍⚕️",
            RecommendationKind::Treatment => "💊",
            RecommendationKind::Test => "🧪",
        }
    }
}

/// 診断詳細
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiagnosisDetails {
    pub findings: Vec<Finding>,
    pub differential_diagnosis: Vec<DifferentialDiagnosis>,
    pub recommendations: Vec<String>,
    pub medical_explanation: String,
    pub patient_explanation: String,
    pub image_url: Option<String>,
    pub annotations: Vec<Annotation>,
    pub severity: Severity,
}

/// 診断結果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub image_id: String,
    pub diagnosis: String,
    pub confidence: f64,
    pub details: DiagnosisDetails,
}

impl DiagnosisResult {
    /// 最上位の鑑別候補
    pub fn top_condition(&self) -> Option<&DifferentialDiagnosis> {
        self.details.differential_diagnosis.first()
    }

    /// 所見の説明文だけを抜き出す（レポート送信用）
    pub fn finding_descriptions(&self) -> Vec<String> {
        self.details
            .findings
            .iter()
            .map(|f| f.description.clone())
            .collect()
    }

    /// 信頼度が高い（要注意表示）
    pub fn is_high_confidence(&self) -> bool {
        self.confidence > 0.7
    }

    /// 表示モードに応じた説明文
    pub fn explanation(&self, mode: ExplanationMode) -> &str {
        match mode {
            ExplanationMode::Medical => &self.details.medical_explanation,
            ExplanationMode::Patient => &self.details.patient_explanation,
        }
    }
}

/// 医療用語 / 平易な言葉
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplanationMode {
    #[default]
    Medical,
    Patient,
}
