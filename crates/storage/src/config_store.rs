//! `app_config.json`: preset tags and the imported folder list.

use crate::error::StorageError;
use crate::models::GlobalConfig;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

pub const CONFIG_FILENAME: &str = "app_config.json";

/// Loads the global config, falling back to defaults when the file is
/// missing or malformed.
pub async fn load_config(path: &Path) -> GlobalConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return GlobalConfig::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            return GlobalConfig::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config malformed, using defaults");
            GlobalConfig::default()
        }
    }
}

pub async fn save_config(path: &Path, config: &GlobalConfig) -> Result<(), StorageError> {
    let body = serde_json::to_string_pretty(config).map_err(|source| StorageError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StorageError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}
