use thiserror::Error;

#[derive(Error, Debug)]
pub enum MedviewError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("診断結果が見つかりません: {0}")]
    NotFound(String),

    #[error("アップロードできないファイル: {0}")]
    UploadRejected(String),

    #[error("描画エラー: {0}")]
    Render(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl From<medview_common::Error> for MedviewError {
    fn from(e: medview_common::Error) -> Self {
        use medview_common::Error as E;
        match e {
            E::Io(e) => MedviewError::Io(e),
            E::Json(e) => MedviewError::JsonParse(e),
            E::Parse(m) => MedviewError::ApiParse(m),
            E::Upload(r) => MedviewError::UploadRejected(r.to_string()),
            E::NotFound(m) => MedviewError::NotFound(m),
            E::Http { status, detail } => MedviewError::ApiCall(format!("HTTP {}: {}", status, detail)),
            E::Config(m) => MedviewError::Config(m),
        }
    }
}

pub type Result<T> = std::result::Result<T, MedviewError>;
