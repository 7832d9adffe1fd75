use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_PRESET_TAGS: [&str; 5] = ["三杀", "四杀", "五杀", "残局", "一血"];

/// Tagging metadata for one clip, as persisted in `.highlight_meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// True until the clip has been finalized by a flush at least once.
    #[serde(default = "default_is_new")]
    pub is_new: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
}

fn default_is_new() -> bool {
    true
}

impl Default for VideoMetadata {
    fn default() -> Self {
        Self {
            is_new: true,
            tags: Vec::new(),
            agent: None,
            weapon: None,
            start_time: 0.0,
            end_time: 0.0,
        }
    }
}

/// One document per imported folder: filename -> metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderMetadataFile {
    #[serde(default)]
    pub videos: BTreeMap<String, VideoMetadata>,
}

impl FolderMetadataFile {
    /// Inserts a default entry for every filename not present yet.
    /// Returns how many entries were added.
    pub fn ensure_entries<'a, I>(&mut self, filenames: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for name in filenames {
            if !self.videos.contains_key(name) {
                self.videos
                    .insert(name.to_string(), VideoMetadata::default());
                added += 1;
            }
        }
        added
    }
}

/// Process-wide settings persisted in `app_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default = "default_preset_tags")]
    pub preset_tags: Vec<String>,
    #[serde(default)]
    pub imported_folders: Vec<PathBuf>,
}

fn default_preset_tags() -> Vec<String> {
    DEFAULT_PRESET_TAGS.iter().map(|t| t.to_string()).collect()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            preset_tags: default_preset_tags(),
            imported_folders: Vec::new(),
        }
    }
}
