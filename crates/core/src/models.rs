use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

pub use storage::{FolderMetadataFile, VideoMetadata};

/// Trim times closer than this are considered equal when checking for edits.
pub const TIME_TOLERANCE: f64 = 0.01;

/// A clip in the catalog: scan attributes plus its persisted metadata.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub filename: String,
    /// Canonical identity of the clip.
    pub path: PathBuf,
    pub folder: PathBuf,
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    pub mtime: i64,
    /// Probed lazily; never persisted.
    pub duration: Option<f64>,
    pub thumbnail: Option<PathBuf>,
    pub meta: VideoMetadata,
}

/// Editable working copy of the user-facing metadata fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditDraft {
    pub tags: Vec<String>,
    pub agent: Option<String>,
    pub weapon: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
}

impl From<&VideoMetadata> for EditDraft {
    fn from(meta: &VideoMetadata) -> Self {
        Self {
            tags: meta.tags.clone(),
            agent: meta.agent.clone(),
            weapon: meta.weapon.clone(),
            start_time: meta.start_time,
            end_time: meta.end_time,
        }
    }
}

impl EditDraft {
    /// Copies the draft into `meta`, leaving `is_new` untouched.
    pub fn apply_to(&self, meta: &mut VideoMetadata) {
        meta.tags = self.tags.clone();
        meta.agent = self.agent.clone();
        meta.weapon = self.weapon.clone();
        meta.start_time = self.start_time;
        meta.end_time = self.end_time;
    }

    /// Equality as the editor sees it: tags as a set, times within tolerance.
    pub fn same_as(&self, other: &EditDraft) -> bool {
        let mine: HashSet<&str> = self.tags.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.tags.iter().map(String::as_str).collect();
        mine == theirs
            && self.agent == other.agent
            && self.weapon == other.weapon
            && (self.start_time - other.start_time).abs() <= TIME_TOLERANCE
            && (self.end_time - other.end_time).abs() <= TIME_TOLERANCE
    }
}
