//! medview Common Library
//!
//! CLIとWeb(WASM)で共有される型とロジック:
//! - アノテーション座標変換・表示状態・画素フィルタ・ルーラー
//! - 診断結果の型とAPI境界でのパース
//! - アップロード検証・レポートリクエスト・レビューセッション

pub mod annotation;
pub mod api;
pub mod diagnosis;
pub mod error;
pub mod filter;
pub mod measure;
pub mod parser;
pub mod report;
pub mod session;
pub mod surface;
pub mod upload;
pub mod view_state;

pub use annotation::{map_to_pixels, Annotation, OverlayGeometry, PixelRect};
pub use api::{AnalysisRequest, ApiEndpoints, ReportResponse, UploadResponse};
pub use diagnosis::{DiagnosisDetails, DiagnosisResult, DifferentialDiagnosis, Finding, Severity};
pub use error::{Error, Result};
pub use filter::{apply_filters, FilterParams};
pub use measure::{Measurement, NativeScale, PixelSpacing, Ruler};
pub use parser::{parse_diagnosis, parse_report_response, parse_upload_response};
pub use report::{ReportForm, ReportRequest};
pub use session::ReviewSession;
pub use surface::{LoadSlot, LoadState, SurfaceLayout};
pub use upload::{validate_upload, UploadRejection, MAX_UPLOAD_BYTES};
pub use view_state::{Point, Repaint, Tool, ViewState, ViewStateController};
