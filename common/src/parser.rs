//! APIレスポンスパーサー
//!
//! バックエンドの応答は形が揺れる（所見が文字列だったりオブジェクトだったり、
//! 確率が "90%" だったり数値だったり）。ここで正規形へ変換し、
//! 以降のコードが応答の形を気にしなくて済むようにする。

use crate::annotation::Annotation;
use crate::api::{ReportResponse, UploadResponse};
use crate::diagnosis::{
    DiagnosisDetails, DiagnosisResult, DifferentialDiagnosis, Finding, Probability, Severity,
};
use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct WireDiagnosis {
    image_id: String,
    #[serde(default)]
    diagnosis: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    details: Option<WireDetails>,
}

#[derive(Deserialize, Default)]
struct WireDetails {
    #[serde(default)]
    findings: Option<Vec<WireFinding>>,
    #[serde(default)]
    differential_diagnosis: Option<Vec<WireDifferential>>,
    #[serde(default)]
    recommendations: Option<Vec<String>>,
    #[serde(default)]
    medical_explanation: Option<String>,
    #[serde(default)]
    patient_explanation: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    annotations: Option<Vec<WireAnnotation>>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFinding {
    Text(String),
    Object {
        description: String,
        #[serde(default)]
        location: Option<String>,
    },
}

#[derive(Deserialize)]
struct WireDifferential {
    #[serde(default)]
    condition: String,
    #[serde(default)]
    probability: Option<WireProbability>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireProbability {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
struct WireAnnotation {
    #[serde(default)]
    label: String,
    coordinates: Vec<f64>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    explanation: Option<String>,
}

impl From<WireFinding> for Finding {
    fn from(f: WireFinding) -> Self {
        match f {
            WireFinding::Text(description) => Finding {
                description,
                location: None,
            },
            WireFinding::Object {
                description,
                location,
            } => Finding {
                description,
                location: location.filter(|l| !l.trim().is_empty()),
            },
        }
    }
}

impl From<WireDifferential> for DifferentialDiagnosis {
    fn from(d: WireDifferential) -> Self {
        let probability = match d.probability {
            Some(WireProbability::Number(n)) => Probability::from_number(n),
            Some(WireProbability::Text(t)) => Probability::parse(&t),
            None => Probability::default(),
        };
        DifferentialDiagnosis {
            condition: d.condition,
            probability,
            reasoning: d.reasoning,
        }
    }
}

impl TryFrom<WireAnnotation> for Annotation {
    type Error = Error;

    fn try_from(a: WireAnnotation) -> Result<Self> {
        let coordinates: [f64; 4] = a.coordinates.as_slice().try_into().map_err(|_| {
            Error::Parse(format!(
                "annotation '{}' has {} coordinates, expected 4",
                a.label,
                a.coordinates.len()
            ))
        })?;
        Ok(Annotation {
            label: a.label,
            coordinates,
            confidence: a.confidence,
            explanation: a.explanation,
        })
    }
}

impl WireDetails {
    fn into_details(self) -> Result<DiagnosisDetails> {
        if let Some(err) = &self.error {
            tracing::warn!(error = %err, "backend reported an analysis error in details");
        }

        let severity = match self.severity.as_deref() {
            None => Severity::Unknown,
            Some(s) => Severity::parse(s)
                .ok_or_else(|| Error::Parse(format!("unknown severity: {}", s)))?,
        };

        let annotations = self
            .annotations
            .unwrap_or_default()
            .into_iter()
            .map(Annotation::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(DiagnosisDetails {
            findings: self
                .findings
                .unwrap_or_default()
                .into_iter()
                .map(Finding::from)
                .collect(),
            differential_diagnosis: self
                .differential_diagnosis
                .unwrap_or_default()
                .into_iter()
                .map(DifferentialDiagnosis::from)
                .collect(),
            recommendations: self.recommendations.unwrap_or_default(),
            medical_explanation: self.medical_explanation.unwrap_or_default(),
            patient_explanation: self.patient_explanation.unwrap_or_default(),
            image_url: self.image_url.filter(|u| !u.is_empty()),
            annotations,
            severity,
        })
    }
}

/// 診断結果をパース
///
/// `details` がない応答（解析待ち）は空の詳細として扱う。
/// 信頼度が欠けていれば最上位候補の確率で補う。
pub fn parse_diagnosis(json: &str) -> Result<DiagnosisResult> {
    let wire: WireDiagnosis = serde_json::from_str(json)
        .map_err(|e| Error::Parse(format!("diagnosis JSONパースエラー: {}", e)))?;

    let details = wire.details.unwrap_or_default().into_details()?;

    let confidence = wire
        .confidence
        .or_else(|| details.differential_diagnosis.first().map(|d| d.probability.fraction))
        .unwrap_or(0.0);

    let diagnosis = wire
        .diagnosis
        .filter(|d| !d.trim().is_empty())
        .or_else(|| details.differential_diagnosis.first().map(|d| d.condition.clone()))
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(DiagnosisResult {
        image_id: wire.image_id,
        diagnosis,
        confidence,
        details,
    })
}

/// アップロード応答をパース
pub fn parse_upload_response(json: &str) -> Result<UploadResponse> {
    let resp: UploadResponse = serde_json::from_str(json)
        .map_err(|e| Error::Parse(format!("upload JSONパースエラー: {}", e)))?;
    if resp.image_id.trim().is_empty() {
        return Err(Error::Parse("Upload failed: No image ID received.".into()));
    }
    Ok(resp)
}

/// レポート生成応答をパース
pub fn parse_report_response(json: &str) -> Result<ReportResponse> {
    serde_json::from_str(json).map_err(|e| Error::Parse(format!("report JSONパースエラー: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "image_id": "img-1",
        "diagnosis": "Pneumonia",
        "confidence": 0.85,
        "details": {
            "findings": [
                "Right lower lobe consolidation",
                {"description": "Small effusion", "location": "left base"}
            ],
            "severity": "urgent",
            "differential_diagnosis": [
                {"condition": "Pneumonia", "probability": "85%", "reasoning": "focal opacity"},
                {"condition": "Atelectasis", "probability": 10}
            ],
            "patient_explanation": "There is an infection.",
            "medical_explanation": "Lobar consolidation.",
            "recommendations": ["Start antibiotics treatment"],
            "image_url": "/uploads/img-1.png",
            "annotations": [
                {"label": "Consolidation", "coordinates": [100, 200, 300, 400], "confidence": 0.9}
            ]
        }
    }"#;

    #[test]
    fn test_parse_full_payload() {
        let r = parse_diagnosis(FULL).unwrap();
        assert_eq!(r.image_id, "img-1");
        assert_eq!(r.diagnosis, "Pneumonia");
        assert_eq!(r.confidence, 0.85);
        assert_eq!(r.details.severity, Severity::Urgent);
        assert_eq!(r.details.findings.len(), 2);
        assert_eq!(r.details.differential_diagnosis[0].probability.fraction, 0.85);
        assert_eq!(r.details.differential_diagnosis[1].probability.fraction, 0.1);
        assert_eq!(r.details.annotations[0].coordinates, [100.0, 200.0, 300.0, 400.0]);
        assert_eq!(r.details.image_url.as_deref(), Some("/uploads/img-1.png"));
    }

    #[test]
    fn test_string_and_object_findings_normalize_identically() {
        let a = r#"{"image_id": "x", "details": {"findings": ["Nodule"]}}"#;
        let b = r#"{"image_id": "x", "details": {"findings": [{"description": "Nodule"}]}}"#;
        let fa = parse_diagnosis(a).unwrap().details.findings;
        let fb = parse_diagnosis(b).unwrap().details.findings;
        assert_eq!(fa, fb);
        assert_eq!(fa[0], Finding::new("Nodule"));
    }

    #[test]
    fn test_pending_diagnosis_without_details() {
        let r = parse_diagnosis(r#"{"image_id": "abc", "diagnosis": "Pending..."}"#).unwrap();
        assert_eq!(r.diagnosis, "Pending...");
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.details, DiagnosisDetails::default());
    }

    #[test]
    fn test_null_lists_are_empty() {
        let json = r#"{"image_id": "x", "details": {"findings": null, "annotations": null, "severity": null}}"#;
        let r = parse_diagnosis(json).unwrap();
        assert!(r.details.findings.is_empty());
        assert!(r.details.annotations.is_empty());
        assert_eq!(r.details.severity, Severity::Unknown);
    }

    #[test]
    fn test_unknown_severity_is_rejected() {
        let json = r#"{"image_id": "x", "details": {"severity": "SEVERE-ISH"}}"#;
        let err = parse_diagnosis(json).unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.contains("SEVERE-ISH")));
    }

    #[test]
    fn test_malformed_coordinates_rejected() {
        let json = r#"{"image_id": "x", "details": {"annotations": [{"label": "a", "coordinates": [1, 2, 3]}]}}"#;
        assert!(matches!(parse_diagnosis(json), Err(Error::Parse(_))));
    }

    #[test]
    fn test_inverted_coordinates_accepted() {
        let json = r#"{"image_id": "x", "details": {"annotations": [{"label": "a", "coordinates": [900, 900, 100, 1200], "confidence": 0.2}]}}"#;
        let r = parse_diagnosis(json).unwrap();
        assert_eq!(r.details.annotations[0].coordinates, [900.0, 900.0, 100.0, 1200.0]);
    }

    #[test]
    fn test_missing_confidence_uses_top_differential() {
        let json = r#"{"image_id": "x", "details": {"differential_diagnosis": [{"condition": "Fracture", "probability": "64%"}]}}"#;
        let r = parse_diagnosis(json).unwrap();
        assert_eq!(r.confidence, 0.64);
        assert_eq!(r.diagnosis, "Fracture");
    }

    #[test]
    fn test_parse_upload_response() {
        let r = parse_upload_response(r#"{"image_id": "u1", "filename": "a.png", "status": "uploaded"}"#).unwrap();
        assert_eq!(r.image_id, "u1");

        let err = parse_upload_response(r#"{"image_id": ""}"#).unwrap_err();
        assert!(err.to_string().contains("No image ID"));
        assert!(parse_upload_response(r#"{"filename": "a.png"}"#).is_err());
    }

    #[test]
    fn test_parse_report_response() {
        let r = parse_report_response(r#"{"report_url": "/reports/report_x.pdf"}"#).unwrap();
        assert_eq!(r.report_url, "/reports/report_x.pdf");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_diagnosis("not json"), Err(Error::Parse(_))));
    }
}
