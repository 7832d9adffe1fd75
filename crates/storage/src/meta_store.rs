//! Per-folder metadata file (`<folder>/.highlight_meta.json`).

use crate::error::StorageError;
use crate::models::FolderMetadataFile;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const META_FILENAME: &str = ".highlight_meta.json";

pub fn meta_path(folder: &Path) -> PathBuf {
    folder.join(META_FILENAME)
}

/// Whole-document metadata store keyed by folder.
///
/// `load` never fails: an absent or unreadable document is an empty one.
/// `save` rewrites the full document and reports failure as a value.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    async fn load(&self, folder: &Path) -> FolderMetadataFile;
    async fn save(&self, folder: &Path, data: &FolderMetadataFile) -> Result<(), StorageError>;
}

/// File-backed store writing pretty-printed JSON next to the videos.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataStore;

impl JsonMetadataStore {
    pub fn new() -> Self {
        Self
    }

    /// Strict variant of `load` that surfaces read and parse errors.
    /// `Ok(None)` means the folder has no metadata file yet.
    pub async fn try_load(&self, folder: &Path) -> Result<Option<FolderMetadataFile>, StorageError> {
        let path = meta_path(folder);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Parse { path, source })
    }
}

#[async_trait::async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn load(&self, folder: &Path) -> FolderMetadataFile {
        match self.try_load(folder).await {
            Ok(Some(doc)) => doc,
            Ok(None) => FolderMetadataFile::default(),
            Err(e) => {
                warn!(error = %e, "metadata unreadable, treating folder as untagged");
                FolderMetadataFile::default()
            }
        }
    }

    async fn save(&self, folder: &Path, data: &FolderMetadataFile) -> Result<(), StorageError> {
        let path = meta_path(folder);
        let body = serde_json::to_string_pretty(data).map_err(|source| StorageError::Encode {
            path: path.clone(),
            source,
        })?;

        // A hidden file cannot be truncated on Windows; unhide, write, hide again.
        set_hidden(&path, false).await;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;
        set_hidden(&path, true).await;

        debug!(path = %path.display(), entries = data.videos.len(), "metadata saved");
        Ok(())
    }
}

#[cfg(windows)]
async fn set_hidden(path: &Path, hidden: bool) {
    let flag = if hidden { "+h" } else { "-h" };
    match tokio::process::Command::new("attrib")
        .arg(flag)
        .arg(path)
        .output()
        .await
    {
        Ok(out) if out.status.success() => {}
        Ok(out) => {
            warn!(path = %path.display(), status = %out.status, "attrib {} failed (ignored)", flag)
        }
        Err(e) => warn!(path = %path.display(), error = %e, "attrib {} failed (ignored)", flag),
    }
}

// Dot-files are already hidden by convention here.
#[cfg(not(windows))]
async fn set_hidden(_path: &Path, _hidden: bool) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoMetadata;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let temp = tempfile::tempdir().unwrap();
        let doc = JsonMetadataStore.load(temp.path()).await;
        assert!(doc.videos.is_empty());
        assert!(JsonMetadataStore.try_load(temp.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(meta_path(temp.path()), "{ not json").unwrap();
        let doc = JsonMetadataStore.load(temp.path()).await;
        assert!(doc.videos.is_empty());
        let err = JsonMetadataStore.try_load(temp.path()).await.unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let temp = tempfile::tempdir().unwrap();
        let mut doc = FolderMetadataFile::default();
        doc.videos.insert(
            "a.mp4".into(),
            VideoMetadata {
                is_new: false,
                tags: vec!["三杀".into(), "钛狐".into()],
                agent: Some("钛狐".into()),
                weapon: None,
                start_time: 1.0,
                end_time: 5.0,
            },
        );
        JsonMetadataStore.save(temp.path(), &doc).await.unwrap();

        let raw = std::fs::read_to_string(meta_path(temp.path())).unwrap();
        assert!(raw.starts_with("{\n  \"videos\""));

        let loaded = JsonMetadataStore.load(temp.path()).await;
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn save_into_missing_folder_reports_error() {
        let temp = tempfile::tempdir().unwrap();
        let folder = temp.path().join("gone");
        let err = JsonMetadataStore
            .save(&folder, &FolderMetadataFile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert_eq!(err.path(), meta_path(&folder));
    }
}
