//! Overlay of drafts committed on navigation but not yet written to disk.

use crate::models::EditDraft;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct PendingChangeSet {
    entries: BTreeMap<PathBuf, EditDraft>,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the draft for `path`.
    pub fn commit(&mut self, path: PathBuf, draft: EditDraft) {
        self.entries.insert(path, draft);
    }

    pub fn get(&self, path: &Path) -> Option<&EditDraft> {
        self.entries.get(path)
    }

    pub fn remove(&mut self, path: &Path) -> Option<EditDraft> {
        self.entries.remove(path)
    }

    pub fn has_unsaved(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &EditDraft)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(tag: &str) -> EditDraft {
        EditDraft {
            tags: vec![tag.to_string()],
            agent: None,
            weapon: None,
            start_time: 0.0,
            end_time: 1.0,
        }
    }

    #[test]
    fn commit_upserts_and_tracks_unsaved() {
        let mut pending = PendingChangeSet::new();
        assert!(!pending.has_unsaved());
        pending.commit(PathBuf::from("/a/x.mp4"), draft("三杀"));
        pending.commit(PathBuf::from("/a/x.mp4"), draft("四杀"));
        assert_eq!(pending.len(), 1);
        assert!(pending.has_unsaved());
        assert_eq!(pending.get(Path::new("/a/x.mp4")).unwrap().tags, vec!["四杀"]);
        pending.clear();
        assert!(!pending.has_unsaved());
    }
}
