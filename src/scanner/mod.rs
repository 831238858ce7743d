use crate::error::{MedviewError, Result};
use medview_common::upload::ACCEPTED_EXTENSIONS;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

/// ファイル1つ、またはフォルダ直下（`recursive` で配下すべて）の画像を列挙
pub fn scan_path(path: &Path, recursive: bool) -> Result<Vec<ScanTarget>> {
    if path.is_file() {
        return Ok(vec![target_of(path)?]);
    }
    if !path.exists() {
        return Err(MedviewError::FolderNotFound(path.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut targets = Vec::new();

    for entry in WalkDir::new(path)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let entry_path = entry.path();
        if !entry_path.is_file() || !is_accepted(entry_path) {
            continue;
        }
        // キャッシュや結果JSONは拡張子で除外される
        targets.push(target_of(entry_path)?);
    }

    targets.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(targets)
}

fn target_of(path: &Path) -> Result<ScanTarget> {
    let size = std::fs::metadata(path)?.len();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(ScanTarget {
        path: path.to_path_buf(),
        file_name,
        size,
    })
}

fn is_accepted(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
