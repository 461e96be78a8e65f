//! Image source
//!
//! Supplies the item ids for a dataset: the file names of the images in a
//! folder. Also remembers the most recently used folder so it can be reopened
//! without naming it again.

use crate::error::Result;
use crate::types::ItemId;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File under the data directory holding the last used folder
const LAST_FOLDER_FILE: &str = "last_folder.json";

/// Record of the most recently used folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastFolder {
    pub path: PathBuf,
    pub used_at: DateTime<Utc>,
}

/// File extensions treated as images (JPEG, PNG, GIF, BMP)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Whether `path` has one of the supported image extensions
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// File names of the images directly inside `dir`, sorted
pub async fn list_image_ids(dir: &Path) -> Result<Vec<ItemId>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to open folder {}", dir.display()))?;

    let mut ids = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !is_image(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            ids.push(name.to_string());
        }
    }
    ids.sort();

    debug!("Found {} images in {}", ids.len(), dir.display());
    Ok(ids)
}

/// Dataset namespace for a folder: its final path component
pub fn namespace_for(dir: &Path) -> Option<String> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
}

/// Record `folder` as the most recently used one
pub async fn remember_folder(data_dir: &Path, folder: &Path) -> Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let record = LastFolder {
        path: folder.to_path_buf(),
        used_at: Utc::now(),
    };
    let path = data_dir.join(LAST_FOLDER_FILE);
    tokio::fs::write(&path, serde_json::to_vec_pretty(&record)?)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!("Remembered folder {}", folder.display());
    Ok(())
}

/// The most recently used folder, if one was recorded and still exists
pub async fn last_folder(data_dir: &Path) -> Result<Option<PathBuf>> {
    let path = data_dir.join(LAST_FOLDER_FILE);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let record: LastFolder = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            return Ok(None);
        }
    };

    if !tokio::fs::metadata(&record.path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
    {
        warn!(
            "Last used folder {} is no longer available",
            record.path.display()
        );
        return Ok(None);
    }

    Ok(Some(record.path))
}

/// Folder to work on: `given` when present (and remembered), else the last used one
pub async fn resolve_folder(data_dir: &Path, given: Option<&Path>) -> Result<PathBuf> {
    match given {
        Some(folder) => {
            let folder = tokio::fs::canonicalize(folder)
                .await
                .unwrap_or_else(|_| folder.to_path_buf());
            remember_folder(data_dir, &folder).await?;
            Ok(folder)
        }
        None => {
            let folder = last_folder(data_dir)
                .await?
                .ok_or_else(|| anyhow!("No folder given and no previously used folder"))?;
            info!("Reopening last used folder {}", folder.display());
            Ok(folder)
        }
    }
}
