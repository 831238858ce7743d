//! アップロードから診断結果保存までの一括処理
//!
//! 1ファイルの失敗は全体を止めない。失敗は集計して最後に報告する。

use crate::client::{compute_file_hash, ApiClient, CacheFile, DiagnosisSource};
use crate::error::{MedviewError, Result};
use crate::render::{self, RenderOptions};
use crate::scanner::{self, ScanTarget};
use crate::summary;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output_dir: Option<PathBuf>,
    pub render: bool,
    pub use_cache: bool,
    pub recursive: bool,
}

/// 診断結果の入手経路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    Cache,
    Existing,
    Analyzed,
}

impl From<DiagnosisSource> for ResultOrigin {
    fn from(s: DiagnosisSource) -> Self {
        match s {
            DiagnosisSource::Existing => ResultOrigin::Existing,
            DiagnosisSource::Analyzed => ResultOrigin::Analyzed,
        }
    }
}

#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub image_id: String,
    pub origin: ResultOrigin,
    pub result_path: PathBuf,
    pub render_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<FileOutcome>,
    pub failed: Vec<(String, MedviewError)>,
}

/// キャッシュの置き場所（ファイルならその親、フォルダならそのもの）
pub fn cache_folder(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        path.to_path_buf()
    }
}

/// キャッシュを使ってアップロード。戻り値の真偽はキャッシュヒット
pub async fn upload_with_cache(
    client: &ApiClient,
    target: &ScanTarget,
    cache: Option<(&mut CacheFile, &str)>,
) -> Result<(String, bool)> {
    if let Some((cache, hash)) = &cache {
        if let Some(entry) = cache.get(hash) {
            tracing::debug!(file = %target.file_name, image_id = %entry.image_id, "upload cache hit");
            return Ok((entry.image_id.clone(), true));
        }
    }

    let response = client.upload_image(&target.path).await?;
    if let Some((cache, hash)) = cache {
        cache.insert_upload(hash.to_string(), target.file_name.clone(), target.size, response.image_id.clone());
    }
    Ok((response.image_id, false))
}

/// ファイルまたはフォルダを一括処理
pub async fn run_batch(client: &ApiClient, path: &Path, options: &RunOptions) -> Result<RunReport> {
    let targets = scanner::scan_path(path, options.recursive)?;
    if targets.is_empty() {
        return Err(MedviewError::NoImagesFound(path.display().to_string()));
    }

    let cache_dir = cache_folder(path);
    let mut cache = if options.use_cache {
        Some(CacheFile::load(&cache_dir))
    } else {
        None
    };
    let output_dir = options.output_dir.clone().unwrap_or_else(|| cache_dir.clone());

    let pb = ProgressBar::new(targets.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40}] {pos}/{len}")
            .map_err(|e| MedviewError::Config(e.to_string()))?
            .progress_chars("=> "),
    );

    let result_paths = plan_result_paths(&output_dir, path, &targets);
    let mut report = RunReport::default();

    for (target, result_path) in targets.iter().zip(result_paths) {
        pb.set_message(target.file_name.clone());

        match process_file(client, target, cache.as_mut(), result_path, options.render).await {
            Ok(outcome) => report.succeeded.push(outcome),
            Err(e) => {
                tracing::warn!(file = %target.file_name, error = %e, "processing failed");
                report.failed.push((target.file_name.clone(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("完了");

    if let Some(cache) = &cache {
        cache.save(&cache_dir)?;
    }
    Ok(report)
}

/// 各画像の結果JSONの保存先（走査ルートからの相対位置を保ち、名前の衝突を避ける）
pub fn plan_result_paths(output_dir: &Path, scan_root: &Path, targets: &[ScanTarget]) -> Vec<PathBuf> {
    let images: Vec<&Path> = targets.iter().map(|t| t.path.as_path()).collect();
    summary::batch_result_paths(output_dir, scan_root, &images)
}

async fn process_file(
    client: &ApiClient,
    target: &ScanTarget,
    mut cache: Option<&mut CacheFile>,
    result_path: PathBuf,
    render_png: bool,
) -> Result<FileOutcome> {
    // ネットワークに出す前に弾く
    client.validate(&target.path)?;

    let hash = match cache {
        Some(_) => Some(compute_file_hash(&target.path)?),
        None => None,
    };

    let cached = match (cache.as_deref(), hash.as_deref()) {
        (Some(c), Some(h)) => c.get(h).and_then(|e| e.diagnosis.clone()),
        _ => None,
    };

    let (image_id, result, origin) = match cached {
        Some(result) => (result.image_id.clone(), result, ResultOrigin::Cache),
        None => {
            let cache_arg = match (cache.as_deref_mut(), hash.as_deref()) {
                (Some(c), Some(h)) => Some((c, h)),
                _ => None,
            };
            let (image_id, _) = upload_with_cache(client, target, cache_arg).await?;
            let (result, source) = client.diagnose(&image_id).await?;
            if let (Some(c), Some(h)) = (cache.as_deref_mut(), hash.as_deref()) {
                c.set_diagnosis(h, result.clone());
            }
            (image_id, result, source.into())
        }
    };

    summary::save_result(&result, &result_path)?;

    let render_path = if render_png {
        let primary = render::load_pane_image(&target.path);
        let img = render::render_surface(&primary, None, &result.details.annotations, &RenderOptions::default());
        let png = render::default_output_path(&result_path);
        render::save_png(&img, &png)?;
        Some(png)
    } else {
        None
    };

    Ok(FileOutcome {
        file_name: target.file_name.clone(),
        image_id,
        origin,
        result_path,
        render_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cache_folder() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("a.png");
        std::fs::write(&f, b"x").unwrap();
        assert_eq!(cache_folder(&f), dir.path());
        assert_eq!(cache_folder(dir.path()), dir.path());
    }

    #[test]
    fn test_recursive_results_keep_distinct_paths() {
        let scans = tempdir().unwrap();
        let out = tempdir().unwrap();
        for rel in ["a/chest.png", "b/chest.png", "chest.jpg", "chest.png"] {
            let p = scans.path().join(rel);
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(&p, b"x").unwrap();
        }

        let targets = scanner::scan_path(scans.path(), true).unwrap();
        let paths = plan_result_paths(out.path(), scans.path(), &targets);

        assert_eq!(paths.len(), 4);
        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(paths.contains(&out.path().join("a").join("chest.diagnosis.json")));
        assert!(paths.contains(&out.path().join("b").join("chest.diagnosis.json")));
        assert!(paths.contains(&out.path().join("chest.jpg.diagnosis.json")));
        assert!(paths.contains(&out.path().join("chest.png.diagnosis.json")));
    }

    #[test]
    fn test_origin_from_source() {
        assert_eq!(ResultOrigin::from(DiagnosisSource::Analyzed), ResultOrigin::Analyzed);
        assert_eq!(ResultOrigin::from(DiagnosisSource::Existing), ResultOrigin::Existing);
    }
}
