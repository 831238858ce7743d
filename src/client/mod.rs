//! バックエンドAPIクライアント
//!
//! 送信前にファイルを検証し、応答は `medview_common::parser` で正規形にしてから返す。
//! 自動リトライはしない。

pub mod cache;

pub use cache::{compute_file_hash, CacheEntry, CacheFile};

use crate::config::Config;
use crate::error::{MedviewError, Result};
use medview_common::upload::{validate_upload, ValidatedUpload};
use medview_common::{
    parse_diagnosis, parse_report_response, parse_upload_response, AnalysisRequest, ApiEndpoints,
    DiagnosisResult, ReportRequest, UploadResponse,
};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

pub struct ApiClient {
    http: reqwest::Client,
    endpoints: ApiEndpoints,
    max_upload_bytes: u64,
}

/// 診断結果の取得元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisSource {
    /// 既存の診断結果
    Existing,
    /// 今回解析を依頼した
    Analyzed,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, max_upload_bytes: u64) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoints: ApiEndpoints::new(base_url),
            max_upload_bytes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_base_url(),
            Duration::from_secs(config.timeout_seconds),
            config.max_upload_bytes,
        )
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// ネットワークに出す前の検証
    pub fn validate(&self, path: &Path) -> Result<ValidatedUpload> {
        if !path.is_file() {
            return Err(MedviewError::FileNotFound(path.display().to_string()));
        }
        let size = std::fs::metadata(path)?.len();
        let file_name = file_name_of(path);
        let validated = validate_upload(&file_name, size, self.max_upload_bytes)
            .map_err(medview_common::Error::from)?;
        Ok(validated)
    }

    /// `POST /api/upload-image`
    pub async fn upload_image(&self, path: &Path) -> Result<UploadResponse> {
        let validated = self.validate(path)?;
        let bytes = tokio::fs::read(path).await?;

        let part = Part::bytes(bytes)
            .file_name(validated.file_name.clone())
            .mime_str(validated.kind.mime_type())?;
        let form = Form::new().part("file", part);

        tracing::debug!(file = %validated.file_name, size = validated.size, "uploading");
        let response = self
            .http
            .post(self.endpoints.upload_image())
            .multipart(form)
            .send()
            .await?;
        let body = read_body(response).await?;
        Ok(parse_upload_response(&body)?)
    }

    /// `GET /api/diagnosis/{id}`。未解析なら `MedviewError::NotFound`
    pub async fn get_diagnosis(&self, image_id: &str) -> Result<DiagnosisResult> {
        let response = self.http.get(self.endpoints.diagnosis(image_id)).send().await?;
        let body = read_body(response).await?;
        Ok(parse_diagnosis(&body)?)
    }

    /// `POST /api/analyze-image`
    pub async fn analyze_image(&self, image_id: &str) -> Result<DiagnosisResult> {
        let request = AnalysisRequest {
            image_id: image_id.to_string(),
        };
        let response = self
            .http
            .post(self.endpoints.analyze_image())
            .json(&request)
            .send()
            .await?;
        let body = read_body(response).await?;
        Ok(parse_diagnosis(&body)?)
    }

    /// 既存の診断結果を取得し、なければ解析を依頼する
    pub async fn diagnose(&self, image_id: &str) -> Result<(DiagnosisResult, DiagnosisSource)> {
        match self.get_diagnosis(image_id).await {
            Ok(result) => Ok((result, DiagnosisSource::Existing)),
            Err(MedviewError::NotFound(_)) => {
                tracing::debug!(image_id, "no diagnosis yet, requesting analysis");
                let result = self.analyze_image(image_id).await?;
                Ok((result, DiagnosisSource::Analyzed))
            }
            Err(e) => Err(e),
        }
    }

    /// `POST /api/generate-report`。返すURLは絶対URLに解決済み
    pub async fn generate_report(&self, request: &ReportRequest) -> Result<String> {
        let response = self
            .http
            .post(self.endpoints.generate_report())
            .json(request)
            .send()
            .await?;
        let body = read_body(response).await?;
        let report = parse_report_response(&body)?;
        Ok(self.endpoints.resolve(&report.report_url))
    }
}

/// 2xx以外はバックエンドの `detail` を含むエラーにする
async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        tracing::debug!(status = status.as_u16(), body = %body, "API error response");
        Err(medview_common::Error::from_response(status.as_u16(), &body).into())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
