//! Writes the pending overlay back to the per-folder metadata files.
//!
//! Entries are grouped by folder and each folder is loaded fresh, patched and
//! saved exactly once. Folders are independent: a failed save does not roll
//! back the others, and the overlay is only cleared when every save succeeded.

use crate::library::VideoLibrary;
use crate::models::EditDraft;
use crate::pending::PendingChangeSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use storage::MetadataStore;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlushReport {
    /// Folders written successfully.
    pub saved: Vec<PathBuf>,
    pub failed: Vec<FolderFailure>,
    /// Overlay entries considered by this flush.
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderFailure {
    pub folder: PathBuf,
    pub error: String,
}

impl FlushReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_success() {
            format!(
                "saved {} clip(s) in {} folder(s)",
                self.entries,
                self.saved.len()
            )
        } else {
            let failed: Vec<String> = self
                .failed
                .iter()
                .map(|f| format!("{} ({})", f.folder.display(), f.error))
                .collect();
            format!(
                "{} of {} folder(s) failed to save: {}",
                self.failed.len(),
                self.failed.len() + self.saved.len(),
                failed.join("; ")
            )
        }
    }
}

#[derive(Debug, Clone)]
struct FolderEntry {
    path: PathBuf,
    filename: String,
    draft: EditDraft,
}

/// Groups overlay entries by owning folder. Clips no longer in the catalog
/// (their folder was removed mid-session) fall back to the path's parent.
/// Paths that yield no folder or no UTF-8 filename are returned separately.
fn group_by_folder(
    pending: &PendingChangeSet,
    library: &VideoLibrary,
) -> (BTreeMap<PathBuf, Vec<FolderEntry>>, Vec<PathBuf>) {
    let mut groups: BTreeMap<PathBuf, Vec<FolderEntry>> = BTreeMap::new();
    let mut unplaced = Vec::new();
    for (path, draft) in pending.iter() {
        let located = match library.get(path) {
            Some(record) => Some((record.folder.clone(), record.filename.clone())),
            None => split_path(path),
        };
        let Some((folder, filename)) = located else {
            unplaced.push(path.clone());
            continue;
        };
        groups.entry(folder).or_default().push(FolderEntry {
            path: path.clone(),
            filename,
            draft: draft.clone(),
        });
    }
    (groups, unplaced)
}

fn split_path(path: &Path) -> Option<(PathBuf, String)> {
    let folder = path.parent()?.to_path_buf();
    let filename = path.file_name()?.to_str()?.to_string();
    Some((folder, filename))
}

/// Flushes every overlay entry, finalizing each clip (`is_new = false`).
pub async fn flush_all(
    store: &dyn MetadataStore,
    library: &mut VideoLibrary,
    pending: &mut PendingChangeSet,
) -> FlushReport {
    let (groups, unplaced) = group_by_folder(pending, library);
    let mut report = FlushReport {
        entries: pending.len(),
        ..FlushReport::default()
    };
    for path in unplaced {
        warn!(path = %path.display(), "pending entry has no folder or file name");
        report.failed.push(FolderFailure {
            folder: path,
            error: "cannot determine folder or file name".to_string(),
        });
    }

    for (folder, entries) in groups {
        let mut doc = store.load(&folder).await;
        for entry in &entries {
            let meta = doc.videos.entry(entry.filename.clone()).or_default();
            entry.draft.apply_to(meta);
            meta.is_new = false;
        }

        match store.save(&folder, &doc).await {
            Ok(()) => {
                for entry in &entries {
                    if let (Some(record), Some(meta)) =
                        (library.get_mut(&entry.path), doc.videos.get(&entry.filename))
                    {
                        record.meta = meta.clone();
                    }
                }
                report.saved.push(folder);
            }
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "flush failed for folder");
                report.failed.push(FolderFailure {
                    folder,
                    error: e.to_string(),
                });
            }
        }
    }

    if report.is_success() {
        pending.clear();
        info!(entries = report.entries, folders = report.saved.len(), "pending changes flushed");
    } else {
        warn!(failed = report.failed.len(), "flush incomplete, keeping pending changes");
    }
    report
}
