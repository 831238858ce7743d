//! レポート生成リクエストの組み立て

use crate::diagnosis::DiagnosisResult;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PATIENT_NAME: &str = "Anonymous";
pub const DEFAULT_DOCTOR_NAME: &str = "Dr. AI";

/// レポートフォームの入力
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportForm {
    pub patient_name: String,
    pub doctor_name: String,
    pub clinical_indication: String,
}

/// `POST /api/generate-report` の本文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub image_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub clinical_indication: String,
    pub diagnosis: String,
    pub confidence: f64,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub medical_explanation: String,
}

impl ReportRequest {
    /// 診断結果とフォーム入力から組み立てる
    ///
    /// 氏名が空なら既定値を入れる。所見は説明文だけに平坦化する。
    pub fn from_diagnosis(image_id: &str, result: &DiagnosisResult, form: &ReportForm) -> Self {
        Self {
            image_id: image_id.to_string(),
            patient_name: non_blank_or(&form.patient_name, DEFAULT_PATIENT_NAME),
            doctor_name: non_blank_or(&form.doctor_name, DEFAULT_DOCTOR_NAME),
            clinical_indication: form.clinical_indication.trim().to_string(),
            diagnosis: result.diagnosis.clone(),
            confidence: result.confidence,
            findings: result.finding_descriptions(),
            recommendations: result.details.recommendations.clone(),
            medical_explanation: result.details.medical_explanation.clone(),
        }
    }
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::{DiagnosisDetails, Finding};

    fn result() -> DiagnosisResult {
        DiagnosisResult {
            image_id: "img-9".into(),
            diagnosis: "Fracture".into(),
            confidence: 0.66,
            details: DiagnosisDetails {
                findings: vec![Finding {
                    description: "Distal radius fracture".into(),
                    location: Some("left wrist".into()),
                }],
                recommendations: vec!["Orthopedic consult".into()],
                medical_explanation: "Transverse fracture.".into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_defaults_for_blank_names() {
        let req = ReportRequest::from_diagnosis("img-9", &result(), &ReportForm::default());
        assert_eq!(req.patient_name, "Anonymous");
        assert_eq!(req.doctor_name, "Dr. AI");
        assert_eq!(req.clinical_indication, "");
    }

    #[test]
    fn test_fields_from_diagnosis() {
        let form = ReportForm {
            patient_name: " Jane Roe ".into(),
            doctor_name: "Dr. Smith".into(),
            clinical_indication: "Fall on outstretched hand".into(),
        };
        let req = ReportRequest::from_diagnosis("img-9", &result(), &form);
        assert_eq!(req.patient_name, "Jane Roe");
        assert_eq!(req.diagnosis, "Fracture");
        assert_eq!(req.confidence, 0.66);
        assert_eq!(req.findings, vec!["Distal radius fracture"]);
        assert_eq!(req.recommendations, vec!["Orthopedic consult"]);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["image_id"], "img-9");
        assert_eq!(json["medical_explanation"], "Transverse fracture.");
    }
}
