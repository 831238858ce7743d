//! エラー型定義

use crate::upload::UploadRejection;
use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadRejection),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// バックエンドのエラーレスポンスから生成
    ///
    /// FastAPI形式の `{"detail": "..."}` があればそれを、なければ本文をそのまま使う。
    /// 404は `NotFound` に寄せる。
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());

        if status == 404 {
            Error::NotFound(detail)
        } else {
            Error::Http { status, detail }
        }
    }

    /// 画面にそのまま出せるメッセージ
    pub fn user_message(&self) -> String {
        match self {
            Error::Upload(rejection) => rejection.to_string(),
            Error::Http { detail, .. } if !detail.is_empty() => detail.clone(),
            Error::NotFound(_) => "Diagnosis not found.".to_string(),
            _ => "Request failed. Please try again.".to_string(),
        }
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_http() {
        let error = Error::Http { status: 500, detail: "boom".into() };
        assert_eq!(error.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn test_from_response_extracts_detail() {
        let error = Error::from_response(400, r#"{"detail": "Unsupported file"}"#);
        match error {
            Error::Http { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Unsupported file");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_from_response_404_is_not_found() {
        let error = Error::from_response(404, r#"{"detail": "Diagnosis not found"}"#);
        assert!(matches!(error, Error::NotFound(ref d) if d == "Diagnosis not found"));
    }

    #[test]
    fn test_from_response_plain_body() {
        let error = Error::from_response(502, "  Bad Gateway \n");
        assert!(matches!(error, Error::Http { status: 502, ref detail } if detail == "Bad Gateway"));
    }

    #[test]
    fn test_user_message_prefers_backend_detail() {
        let error = Error::Http { status: 500, detail: "GOOGLE_API_KEY not set".into() };
        assert_eq!(error.user_message(), "GOOGLE_API_KEY not set");

        let error = Error::Http { status: 500, detail: String::new() };
        assert_eq!(error.user_message(), "Request failed. Please try again.");
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
