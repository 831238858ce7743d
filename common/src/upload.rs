//! アップロード前のファイル検証
//!
//! 形式・サイズの不正はネットワークに出す前にここで弾く。

use thiserror::Error;

/// 上限 25 MiB
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// 受け付ける拡張子
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "dcm"];

/// ファイル種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Jpeg,
    Png,
    Dicom,
}

impl UploadKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(UploadKind::Jpeg),
            "png" => Some(UploadKind::Png),
            "dcm" => Some(UploadKind::Dicom),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            UploadKind::Jpeg => "image/jpeg",
            UploadKind::Png => "image/png",
            UploadKind::Dicom => "application/dicom",
        }
    }

    /// ブラウザでプレビューできるか（DICOMは不可）
    pub fn has_preview(self) -> bool {
        !matches!(self, UploadKind::Dicom)
    }
}

/// 拒否理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("Invalid file type. Please upload .dcm, .jpg, .jpeg, or .png images.")]
    UnsupportedType(String),

    #[error("File is too large ({}). Maximum size is {}.", size_text(.size), size_text(.limit))]
    TooLarge { size: u64, limit: u64 },

    #[error("File is empty.")]
    Empty,

    #[error("Please upload a single image.")]
    TooManyFiles(usize),
}

/// 検証済みファイル
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpload {
    pub file_name: String,
    pub kind: UploadKind,
    pub size: u64,
}

/// 1ファイルを検証
pub fn validate_upload(
    file_name: &str,
    size: u64,
    limit: u64,
) -> std::result::Result<ValidatedUpload, UploadRejection> {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    let kind = UploadKind::from_extension(ext)
        .ok_or_else(|| UploadRejection::UnsupportedType(file_name.to_string()))?;

    if size == 0 {
        return Err(UploadRejection::Empty);
    }
    if size > limit {
        return Err(UploadRejection::TooLarge { size, limit });
    }

    Ok(ValidatedUpload {
        file_name: file_name.to_string(),
        kind,
        size,
    })
}

/// ドロップされたファイル群を検証（1枚のみ受け付ける）
pub fn validate_selection(
    files: &[(String, u64)],
    limit: u64,
) -> std::result::Result<ValidatedUpload, UploadRejection> {
    match files {
        [] => Err(UploadRejection::TooManyFiles(0)),
        [(name, size)] => validate_upload(name, *size, limit),
        _ => Err(UploadRejection::TooManyFiles(files.len())),
    }
}

/// MIMEタイプからプレビュー可否を判定
pub fn mime_has_preview(mime: &str) -> bool {
    mime.starts_with("image/")
}

fn size_text(bytes: &u64) -> String {
    format_file_size(*bytes)
}

/// 人が読めるファイルサイズ
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
