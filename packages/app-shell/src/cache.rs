//! Record store persistence between sessions

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use suspense::{RecordStore, StoreSnapshot};

/// Load the record store saved by a previous session.
///
/// A missing file yields an empty store. So does an unreadable snapshot:
/// a corrupt cache must not block startup.
pub async fn load_record_store(path: &Path) -> Result<RecordStore> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no record cache yet");
            return Ok(RecordStore::new());
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to read record cache {}", path.display()))
        }
    };

    match serde_json::from_slice::<StoreSnapshot>(&bytes) {
        Ok(snapshot) => {
            let store = RecordStore::restore(snapshot);
            tracing::info!(path = %path.display(), entries = store.len(), "record cache restored");
            Ok(store)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "discarding unreadable record cache");
            Ok(RecordStore::new())
        }
    }
}

/// Persist the record store for the next session.
pub async fn save_record_store(store: &RecordStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(&store.snapshot()).context("Failed to encode record cache")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write record cache {}", path.display()))?;

    tracing::info!(path = %path.display(), entries = store.len(), "record cache saved");
    Ok(())
}
