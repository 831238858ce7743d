//! アップロード結果キャッシュモジュール
//!
//! 画像のSHA-256ハッシュをキーにして image_id と診断結果を保存し、
//! 同じ画像の再アップロード・再解析をスキップする。

use crate::error::Result;
use chrono::{DateTime, Utc};
use medview_common::DiagnosisResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".medview-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// ファイルハッシュ → エントリ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub image_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub stored_at: DateTime<Utc>,
    /// 診断結果（取得済みの場合のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisResult>,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（壊れていれば空で始める）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %cache_path.display(), error = %e, "キャッシュを開けません");
                return Self::default();
            }
        };

        match serde_json::from_reader::<_, CacheFile>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                tracing::info!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "キャッシュの解析に失敗、再生成します");
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// キャッシュファイルを削除。存在しなければ `false`
    pub fn clear(folder: &Path) -> Result<bool> {
        let path = Self::cache_path(folder);
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, hash: &str) -> Option<&CacheEntry> {
        self.entries.get(hash)
    }

    /// アップロード結果を登録（既存の診断結果は image_id が同じなら残す）
    pub fn insert_upload(&mut self, hash: String, file_name: String, file_size: u64, image_id: String) {
        let diagnosis = self
            .entries
            .get(&hash)
            .filter(|e| e.image_id == image_id)
            .and_then(|e| e.diagnosis.clone());
        self.entries.insert(
            hash,
            CacheEntry {
                image_id,
                file_name,
                file_size,
                stored_at: Utc::now(),
                diagnosis,
            },
        );
    }

    /// 診断結果を登録。アップロード未登録のハッシュなら何もしない
    pub fn set_diagnosis(&mut self, hash: &str, diagnosis: DiagnosisResult) -> bool {
        match self.entries.get_mut(hash) {
            Some(entry) => {
                entry.diagnosis = Some(diagnosis);
                entry.stored_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 診断結果まで揃っているエントリ数
    pub fn diagnosed_count(&self) -> usize {
        self.entries.values().filter(|e| e.diagnosis.is_some()).count()
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// ファイル内容のSHA-256（16進）
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_hash_is_content_based() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let ha = compute_file_hash(&a).unwrap();
        assert_eq!(ha, compute_file_hash(&b).unwrap());
        assert_eq!(ha.len(), 64);

        std::fs::write(&b, b"other bytes").unwrap();
        assert_ne!(ha, compute_file_hash(&b).unwrap());
    }

    #[test]
    fn test_reupload_with_new_id_drops_diagnosis() {
        let mut cache = CacheFile::default();
        cache.insert_upload("h".into(), "a.png".into(), 1, "id-1".into());
        assert!(cache.set_diagnosis("h", DiagnosisResult::default()));
        assert_eq!(cache.diagnosed_count(), 1);

        cache.insert_upload("h".into(), "a.png".into(), 1, "id-1".into());
        assert_eq!(cache.diagnosed_count(), 1);

        cache.insert_upload("h".into(), "a.png".into(), 1, "id-2".into());
        assert_eq!(cache.diagnosed_count(), 0);
    }

    #[test]
    fn test_set_diagnosis_unknown_hash() {
        let mut cache = CacheFile::default();
        assert!(!cache.set_diagnosis("missing", DiagnosisResult::default()));
        assert!(cache.is_empty());
    }
}
