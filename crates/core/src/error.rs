use std::path::PathBuf;
use storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown video: {}", .0.display())]
    UnknownVideo(PathBuf),
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("unknown weapon: {0}")]
    UnknownWeapon(String),
    #[error("folder already imported: {}", .0.display())]
    FolderAlreadyImported(PathBuf),
    #[error("folder not imported: {}", .0.display())]
    FolderNotImported(PathBuf),
    #[error("preset tag already exists: {0}")]
    DuplicatePresetTag(String),
    #[error("no such preset tag: {0}")]
    UnknownPresetTag(String),
    #[error("tag must not be empty")]
    EmptyTag,
    #[error("no video is open")]
    NoSession,
    #[error("failed to scan {}: {source}", .folder.display())]
    Scan {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid video extension pattern: {0}")]
    Pattern(#[from] globset::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
