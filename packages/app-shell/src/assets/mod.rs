//! Asset prewarming: download or cache icons before first render
//!
//! Prefetching is best-effort. Every asset in a batch is attempted
//! concurrently, and the batch settles once each attempt has either
//! succeeded or failed. One broken icon never holds up the app.

mod icons;

pub use icons::*;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use url::Url;

/// Reference to one image resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// Image served over HTTP(S).
    Remote(Url),
    /// Image shipped with the app.
    Bundled(PathBuf),
}

impl AssetRef {
    pub fn remote(url: &str) -> Result<Self, url::ParseError> {
        Ok(AssetRef::Remote(Url::parse(url)?))
    }

    pub fn bundled(path: impl Into<PathBuf>) -> Self {
        AssetRef::Bundled(path.into())
    }

    /// Stable file name for this asset inside the cache directory.
    pub fn cache_file_name(&self) -> String {
        let (source, extension) = match self {
            AssetRef::Remote(url) => (
                url.as_str().to_string(),
                Path::new(url.path())
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned()),
            ),
            AssetRef::Bundled(path) => (
                path.to_string_lossy().into_owned(),
                path.extension().map(|ext| ext.to_string_lossy().into_owned()),
            ),
        };

        let digest = hex::encode(Sha256::digest(source.as_bytes()));
        match extension {
            Some(ext) => format!("{}.{}", &digest[..16], ext),
            None => digest[..16].to_string(),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Remote(url) => write!(f, "{url}"),
            AssetRef::Bundled(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Error type for a single asset prefetch
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to download {url}: {source}")]
    Download {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a prefetch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub loaded: Vec<AssetRef>,
    pub failed: Vec<(AssetRef, String)>,
}

impl PrefetchReport {
    pub fn total(&self) -> usize {
        self.loaded.len() + self.failed.len()
    }

    pub fn all_loaded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Downloads and caches image resources ahead of render.
#[async_trait]
pub trait AssetPrewarmer: Send + Sync {
    async fn prefetch(&self, asset: &AssetRef) -> Result<(), AssetError>;

    /// Attempt every asset concurrently and wait for all of them to settle.
    async fn prefetch_all(&self, assets: &[AssetRef]) -> PrefetchReport {
        let results = join_all(assets.iter().map(|asset| self.prefetch(asset))).await;

        let mut report = PrefetchReport::default();
        for (asset, result) in assets.iter().zip(results) {
            match result {
                Ok(()) => report.loaded.push(asset.clone()),
                Err(err) => {
                    tracing::warn!(%asset, error = %err, "asset prefetch failed");
                    report.failed.push((asset.clone(), err.to_string()));
                }
            }
        }
        report
    }
}

/// Prewarmer that downloads remote images and copies bundled ones into a
/// local cache directory.
#[derive(Clone)]
pub struct HttpAssetPrewarmer {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl HttpAssetPrewarmer {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where `asset` lands once prefetched.
    pub fn cached_path(&self, asset: &AssetRef) -> PathBuf {
        self.cache_dir.join(asset.cache_file_name())
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, AssetError> {
        let download = |source| AssetError::Download {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(download)?;
        let bytes = response.bytes().await.map_err(download)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AssetPrewarmer for HttpAssetPrewarmer {
    async fn prefetch(&self, asset: &AssetRef) -> Result<(), AssetError> {
        let target = self.cached_path(asset);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            tracing::debug!(%asset, "asset already cached");
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|source| AssetError::Io {
                path: self.cache_dir.clone(),
                source,
            })?;

        match asset {
            AssetRef::Remote(url) => {
                let bytes = self.download(url).await?;
                tokio::fs::write(&target, bytes)
                    .await
                    .map_err(|source| AssetError::Io {
                        path: target.clone(),
                        source,
                    })?;
            }
            AssetRef::Bundled(path) => {
                tokio::fs::copy(path, &target)
                    .await
                    .map_err(|source| AssetError::Io {
                        path: path.clone(),
                        source,
                    })?;
            }
        }

        tracing::debug!(%asset, target = %target.display(), "asset cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("app-shell-{label}-{}", std::process::id()))
    }

    #[test]
    fn cache_file_name_keeps_extension() {
        let asset = AssetRef::remote("https://cdn.example.com/icons/menu.png").unwrap();
        let name = asset.cache_file_name();
        assert!(name.ends_with(".png"));
        assert_eq!(name, asset.cache_file_name());
        assert_ne!(name, AssetRef::bundled("icons/menu.png").cache_file_name());
    }

    #[tokio::test]
    async fn bundled_assets_are_copied_and_missing_ones_reported() {
        let source_dir = temp_dir("bundled-src");
        std::fs::create_dir_all(&source_dir).unwrap();
        let present = source_dir.join("logo.png");
        std::fs::write(&present, b"png").unwrap();

        let prewarmer = HttpAssetPrewarmer::new(temp_dir("bundled-cache"));
        let assets = vec![
            AssetRef::bundled(&present),
            AssetRef::bundled(source_dir.join("missing.png")),
        ];

        let report = prewarmer.prefetch_all(&assets).await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.loaded, vec![assets[0].clone()]);
        assert_eq!(report.failed.len(), 1);
        assert!(prewarmer.cached_path(&assets[0]).exists());

        let _ = std::fs::remove_dir_all(&source_dir);
        let _ = std::fs::remove_dir_all(prewarmer.cache_dir());
    }
}
