#![allow(dead_code)]

use highlight_core::config::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use storage::{FolderMetadataFile, JsonMetadataStore, MetadataStore, StorageError};

pub fn settings_in(root: &Path) -> Settings {
    let mut settings = Settings {
        app_config: root.join("app_config.json").to_string_lossy().into_owned(),
        ..Settings::default()
    };
    settings.probe.enabled = false;
    settings
}

/// Creates `folder` with an empty file per name.
pub fn make_folder(root: &Path, name: &str, files: &[&str]) -> PathBuf {
    let folder = root.join(name);
    fs::create_dir_all(&folder).unwrap();
    for f in files {
        fs::write(folder.join(f), b"not really a video").unwrap();
    }
    folder
}

pub async fn on_disk(folder: &Path) -> FolderMetadataFile {
    JsonMetadataStore::new()
        .try_load(folder)
        .await
        .unwrap()
        .expect("metadata file exists")
}

/// JSON store that records every save and can be told to fail one folder.
#[derive(Default)]
pub struct RecordingStore {
    inner: JsonMetadataStore,
    saves: Mutex<Vec<PathBuf>>,
    fail_folder: Mutex<Option<PathBuf>>,
    failing: AtomicBool,
}

impl RecordingStore {
    pub fn saves(&self) -> Vec<PathBuf> {
        self.saves.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.saves.lock().unwrap().clear();
    }

    pub fn fail_on(&self, folder: &Path) {
        *self.fail_folder.lock().unwrap() = Some(folder.to_path_buf());
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MetadataStore for RecordingStore {
    async fn load(&self, folder: &Path) -> FolderMetadataFile {
        self.inner.load(folder).await
    }

    async fn save(&self, folder: &Path, data: &FolderMetadataFile) -> Result<(), StorageError> {
        self.saves.lock().unwrap().push(folder.to_path_buf());
        let broken = self.failing.load(Ordering::SeqCst)
            && self.fail_folder.lock().unwrap().as_deref() == Some(folder);
        if broken {
            return Err(StorageError::Write {
                path: storage::meta_path(folder),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.inner.save(folder, data).await
    }
}
