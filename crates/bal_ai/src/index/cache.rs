use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bal_core::error::AppError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Metadata written next to the cached vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStatus {
    pub model: String,
    #[serde(default)]
    pub endpoint: String,
    pub dims: Option<u32>,
    pub entry_count: u32,
}

/// On-disk embedding cache keyed by chunk text SHA-256.
///
/// Only vectors are cached; the index itself is rebuilt in memory on every
/// start. Entries written under a different model or endpoint are ignored.
#[derive(Debug, Clone)]
pub struct IndexCache {
    root: PathBuf,
}

impl IndexCache {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn status_path(&self) -> PathBuf {
        self.root.join("cache_status.json")
    }

    fn vectors_path(&self) -> PathBuf {
        self.root.join("cache_vectors.json")
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::new("INDEX_CACHE_FAILED", "Failed to create cache directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    pub fn status(&self) -> Result<Option<CacheStatus>, AppError> {
        let path = self.status_path();
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Vectors previously cached for `model` served by `endpoint`; empty
    /// when absent or stale.
    pub fn load(&self, model: &str, endpoint: &str) -> Result<BTreeMap<String, Vec<f32>>, AppError> {
        match self.status()? {
            Some(st) if st.model == model && st.endpoint == endpoint => {}
            _ => return Ok(BTreeMap::new()),
        }
        let path = self.vectors_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        read_json(&path)
    }

    pub fn save(
        &self,
        model: &str,
        endpoint: &str,
        vectors: &BTreeMap<String, Vec<f32>>,
    ) -> Result<CacheStatus, AppError> {
        self.ensure_dirs()?;
        write_json_atomic(&self.vectors_path(), vectors)?;
        let st = CacheStatus {
            model: model.to_string(),
            endpoint: endpoint.to_string(),
            dims: vectors.values().next().map(|v| v.len() as u32),
            entry_count: vectors.len() as u32,
        };
        write_json_atomic(&self.status_path(), &st)?;
        Ok(st)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new("INDEX_CACHE_FAILED", "Failed to read cache file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new("INDEX_CACHE_FAILED", "Failed to decode cache file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_vec(value).map_err(|e| {
        AppError::new("INDEX_CACHE_FAILED", "Failed to encode cache file").with_details(e.to_string())
    })?;
    fs::write(&tmp, json).map_err(|e| {
        AppError::new("INDEX_CACHE_FAILED", "Failed to write cache file")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("INDEX_CACHE_FAILED", "Failed to finalize cache write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}
