//! 対話式レポート項目入力
//!
//! フラグで渡されなかった項目だけを尋ねる。空欄のままなら既定値が入る。

use crate::error::Result;
use dialoguer::Input;
use medview_common::report::{DEFAULT_DOCTOR_NAME, DEFAULT_PATIENT_NAME};
use medview_common::ReportForm;

/// フラグで指定された値
#[derive(Debug, Clone, Default)]
pub struct ReportArgs {
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub clinical_indication: Option<String>,
}

/// 入力が必要な項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    PatientName,
    DoctorName,
    ClinicalIndication,
}

impl ReportField {
    fn prompt(self) -> &'static str {
        match self {
            ReportField::PatientName => "患者名",
            ReportField::DoctorName => "医師名",
            ReportField::ClinicalIndication => "臨床的適応",
        }
    }

    fn default_value(self) -> &'static str {
        match self {
            ReportField::PatientName => DEFAULT_PATIENT_NAME,
            ReportField::DoctorName => DEFAULT_DOCTOR_NAME,
            ReportField::ClinicalIndication => "",
        }
    }
}

impl ReportArgs {
    /// 未指定の項目
    pub fn missing_fields(&self) -> Vec<ReportField> {
        let mut missing = Vec::new();
        if self.patient_name.is_none() {
            missing.push(ReportField::PatientName);
        }
        if self.doctor_name.is_none() {
            missing.push(ReportField::DoctorName);
        }
        if self.clinical_indication.is_none() {
            missing.push(ReportField::ClinicalIndication);
        }
        missing
    }

    /// 未指定の項目を空欄としてフォームにする（既定値は送信時に入る）
    pub fn into_form(self) -> ReportForm {
        ReportForm {
            patient_name: self.patient_name.unwrap_or_default(),
            doctor_name: self.doctor_name.unwrap_or_default(),
            clinical_indication: self.clinical_indication.unwrap_or_default(),
        }
    }
}

/// 不足項目を対話で埋める。`interactive` が偽なら尋ねない
pub fn complete_report_form(mut args: ReportArgs, interactive: bool) -> Result<ReportForm> {
    if interactive {
        for field in args.missing_fields() {
            let value = prompt_field(field)?;
            match field {
                ReportField::PatientName => args.patient_name = Some(value),
                ReportField::DoctorName => args.doctor_name = Some(value),
                ReportField::ClinicalIndication => args.clinical_indication = Some(value),
            }
        }
    }
    Ok(args.into_form())
}

fn prompt_field(field: ReportField) -> Result<String> {
    let mut input = Input::<String>::new()
        .with_prompt(field.prompt())
        .allow_empty(true);
    if !field.default_value().is_empty() {
        input = input.default(field.default_value().to_string());
    }
    let value = input.interact_text()?;
    Ok(value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let args = ReportArgs {
            patient_name: Some("Jane".into()),
            ..Default::default()
        };
        assert_eq!(
            args.missing_fields(),
            vec![ReportField::DoctorName, ReportField::ClinicalIndication]
        );
    }

    #[test]
    fn test_non_interactive_leaves_blanks() {
        let form = complete_report_form(ReportArgs::default(), false).unwrap();
        assert_eq!(form, ReportForm::default());
    }

    #[test]
    fn test_all_given_never_prompts() {
        let args = ReportArgs {
            patient_name: Some("Jane".into()),
            doctor_name: Some("Dr. Smith".into()),
            clinical_indication: Some("Cough".into()),
        };
        assert!(args.missing_fields().is_empty());
        let form = complete_report_form(args, true).unwrap();
        assert_eq!(form.doctor_name, "Dr. Smith");
    }
}
