//! fetch によるAPI呼び出し
//!
//! 応答本文は文字列のまま受け取り、`medview_common::parser` で正規形にする。

use medview_common::{
    parse_diagnosis, parse_report_response, parse_upload_response, AnalysisRequest, ApiEndpoints,
    DiagnosisResult, Error, ReportRequest, Result, UploadResponse,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, FormData, Request, RequestInit, RequestMode, Response};

const NETWORK_ERROR: &str = "Network error. Please check your connection and try again.";

/// JS側の失敗を共通エラーへ
fn js_error(e: JsValue) -> Error {
    web_sys::console::error_2(&JsValue::from_str("medview fetch failed:"), &e);
    Error::Http {
        status: 0,
        detail: NETWORK_ERROR.to_string(),
    }
}

/// fetch 共通処理。2xx以外は `detail` を含むエラーにする
async fn send(url: &str, opts: &RequestInit) -> Result<String> {
    let request = Request::new_with_str_and_init(url, opts).map_err(js_error)?;
    let window = web_sys::window().ok_or_else(|| Error::Config("window is not available".into()))?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_error)?;
    let resp: Response = resp_value.dyn_into().map_err(js_error)?;

    let text_promise = resp.text().map_err(js_error)?;
    let body = JsFuture::from(text_promise)
        .await
        .map_err(js_error)?
        .as_string()
        .unwrap_or_default();

    if resp.ok() {
        Ok(body)
    } else {
        Err(Error::from_response(resp.status(), &body))
    }
}

async fn post_json(url: &str, body: String) -> Result<String> {
    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(&JsValue::from_str(&body));

    let headers = web_sys::Headers::new().map_err(js_error)?;
    headers.set("Content-Type", "application/json").map_err(js_error)?;
    opts.set_headers(&headers);

    send(url, &opts).await
}

/// `POST /api/upload-image`（multipart の `file`）
pub async fn upload_image(endpoints: &ApiEndpoints, file: &File) -> Result<UploadResponse> {
    let form = FormData::new().map_err(js_error)?;
    form.append_with_blob_and_filename("file", file, &file.name())
        .map_err(js_error)?;

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(&form);

    let body = send(&endpoints.upload_image(), &opts).await?;
    parse_upload_response(&body)
}

/// `GET /api/diagnosis/{id}`
pub async fn get_diagnosis(endpoints: &ApiEndpoints, image_id: &str) -> Result<DiagnosisResult> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let body = send(&endpoints.diagnosis(image_id), &opts).await?;
    parse_diagnosis(&body)
}

/// `POST /api/analyze-image`
pub async fn analyze_image(endpoints: &ApiEndpoints, image_id: &str) -> Result<DiagnosisResult> {
    let request = AnalysisRequest {
        image_id: image_id.to_string(),
    };
    let body = post_json(&endpoints.analyze_image(), serde_json::to_string(&request)?).await?;
    parse_diagnosis(&body)
}

/// 既存の診断結果を取得し、なければ解析を依頼する
pub async fn diagnose(endpoints: &ApiEndpoints, image_id: &str) -> Result<DiagnosisResult> {
    match get_diagnosis(endpoints, image_id).await {
        Err(Error::NotFound(_)) => analyze_image(endpoints, image_id).await,
        other => other,
    }
}

/// `POST /api/generate-report`。返すURLは絶対URLに解決済み
pub async fn generate_report(endpoints: &ApiEndpoints, request: &ReportRequest) -> Result<String> {
    let body = post_json(&endpoints.generate_report(), serde_json::to_string(request)?).await?;
    let report = parse_report_response(&body)?;
    Ok(endpoints.resolve(&report.report_url))
}
