//! バックエンドAPIのエンドポイントと入出力の型
//!
//! 通信自体は CLI（reqwest）と Web（fetch）でそれぞれ実装する。

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// `POST /api/upload-image` の応答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// `POST /api/analyze-image` の本文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub image_id: String,
}

/// `POST /api/generate-report` の応答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report_url: String,
}

/// エンドポイント一覧
#[derive(Debug, Clone, PartialEq)]
pub struct ApiEndpoints {
    base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl ApiEndpoints {
    /// `base` はオリジン（例: `http://localhost:8000`）。末尾の `/` や `/api` は取り除く
    pub fn new(base: &str) -> Self {
        let trimmed = base.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
        Self {
            base: trimmed.to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn upload_image(&self) -> String {
        format!("{}/api/upload-image", self.base)
    }

    pub fn diagnosis(&self, image_id: &str) -> String {
        format!("{}/api/diagnosis/{}", self.base, encode_path_segment(image_id))
    }

    pub fn analyze_image(&self) -> String {
        format!("{}/api/analyze-image", self.base)
    }

    pub fn generate_report(&self) -> String {
        format!("{}/api/generate-report", self.base)
    }

    /// バックエンドが返す相対パス（`/reports/...`）を絶対URLにする
    pub fn resolve(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else if path_or_url.starts_with('/') {
            format!("{}{}", self.base, path_or_url)
        } else {
            format!("{}/{}", self.base, path_or_url)
        }
    }
}

/// パス1要素分のパーセントエンコード
///
/// RFC 3986 の非予約文字（英数字と `-` `_` `.` `~`）だけをそのまま残し、
/// それ以外は UTF-8 のバイト単位で `%XX` にする。`/` もエンコードされる。
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
