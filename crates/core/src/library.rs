//! In-memory catalog of every clip across the imported folders.

use crate::error::CoreError;
use crate::models::VideoRecord;
use crate::scanner::{self, VideoFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use storage::MetadataStore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    TimeAsc,
    #[default]
    TimeDesc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::TimeAsc => "time-asc",
            SortOrder::TimeDesc => "time-desc",
            SortOrder::NameAsc => "name-asc",
            SortOrder::NameDesc => "name-desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "time-asc" => Ok(SortOrder::TimeAsc),
            "time-desc" => Ok(SortOrder::TimeDesc),
            "name-asc" => Ok(SortOrder::NameAsc),
            "name-desc" => Ok(SortOrder::NameDesc),
            other => Err(format!(
                "unknown sort order '{}' (expected time-asc|time-desc|name-asc|name-desc)",
                other
            )),
        }
    }
}

/// View restriction over the catalog. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryFilter {
    /// Case-insensitive substring over filename, tags, agent and weapon.
    pub query: String,
    /// Every listed tag must be present on the clip.
    pub tags: Vec<String>,
    /// Exact owning folder.
    pub folder: Option<PathBuf>,
}

impl LibraryFilter {
    pub fn matches(&self, record: &VideoRecord) -> bool {
        if let Some(folder) = &self.folder {
            if &record.folder != folder {
                return false;
            }
        }

        let query = self.query.trim().to_lowercase();
        if !query.is_empty() {
            let hit = |s: &str| s.to_lowercase().contains(&query);
            let meta = &record.meta;
            let found = hit(&record.filename)
                || meta.tags.iter().any(|t| hit(t))
                || meta.agent.as_deref().map(hit).unwrap_or(false)
                || meta.weapon.as_deref().map(hit).unwrap_or(false);
            if !found {
                return false;
            }
        }

        self.tags
            .iter()
            .all(|wanted| record.meta.tags.iter().any(|t| t == wanted))
    }

    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.tags.is_empty() && self.folder.is_none()
    }
}

#[derive(Debug, Default)]
pub struct VideoLibrary {
    records: Vec<VideoRecord>,
    order: SortOrder,
}

impl VideoLibrary {
    pub fn new(order: SortOrder) -> Self {
        Self {
            records: Vec::new(),
            order,
        }
    }

    /// Builds a catalog from records already in memory, sorted by `order`.
    pub fn from_records(records: Vec<VideoRecord>, order: SortOrder) -> Self {
        let mut lib = Self { records, order };
        lib.sort(order);
        lib
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn get(&self, path: &Path) -> Option<&VideoRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut VideoRecord> {
        self.records.iter_mut().find(|r| r.path == path)
    }

    /// Scans `folder`, registers default metadata for newly seen files and
    /// merges the result into the catalog. Discovering a file is itself a
    /// write: the folder's metadata file is saved when entries were added.
    ///
    /// Does not re-sort; callers sort once after loading.
    pub async fn load_folder(
        &mut self,
        store: &dyn MetadataStore,
        filter: &VideoFilter,
        folder: &Path,
    ) -> Result<usize, CoreError> {
        let scanned = scanner::scan_folder(folder, filter)
            .await
            .map_err(|source| CoreError::Scan {
                folder: folder.to_path_buf(),
                source,
            })?;
        let mut doc = store.load(folder).await;

        let added = doc.ensure_entries(scanned.iter().map(|v| v.filename.as_str()));
        if added > 0 {
            if let Err(e) = store.save(folder, &doc).await {
                warn!(folder = %folder.display(), error = %e, "could not register new videos");
            } else {
                debug!(folder = %folder.display(), added, "registered new videos");
            }
        }

        self.records.retain(|r| r.folder != folder);
        let count = scanned.len();
        for video in scanned {
            let meta = doc.videos.get(&video.filename).cloned().unwrap_or_default();
            self.records.push(VideoRecord {
                filename: video.filename,
                path: video.path,
                folder: video.folder,
                size: video.size,
                mtime: video.mtime,
                duration: None,
                thumbnail: None,
                meta,
            });
        }
        Ok(count)
    }

    /// Rebuilds the catalog from scratch. Folders that cannot be scanned are
    /// logged and skipped.
    pub async fn rebuild(
        &mut self,
        store: &dyn MetadataStore,
        filter: &VideoFilter,
        folders: &[PathBuf],
    ) -> usize {
        self.records.clear();
        for folder in folders {
            if let Err(e) = self.load_folder(store, filter, folder).await {
                warn!(error = %e, "skipping folder");
            }
        }
        self.sort(self.order);
        info!(folders = folders.len(), videos = self.records.len(), "catalog rebuilt");
        self.records.len()
    }

    /// Drops a folder's clips from the catalog. Metadata on disk is kept.
    pub fn remove_folder(&mut self, folder: &Path) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.folder != folder);
        before - self.records.len()
    }

    /// Stable reorder of the whole catalog.
    pub fn sort(&mut self, order: SortOrder) {
        self.order = order;
        match order {
            SortOrder::TimeAsc => self.records.sort_by(|a, b| a.mtime.cmp(&b.mtime)),
            SortOrder::TimeDesc => self.records.sort_by(|a, b| b.mtime.cmp(&a.mtime)),
            SortOrder::NameAsc => self.records.sort_by(|a, b| a.filename.cmp(&b.filename)),
            SortOrder::NameDesc => self.records.sort_by(|a, b| b.filename.cmp(&a.filename)),
        }
    }

    pub fn filter(&self, filter: &LibraryFilter) -> Vec<&VideoRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Every tag, agent and weapon used anywhere in the catalog, in
    /// first-seen order.
    pub fn unique_tags(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for record in &self.records {
            let meta = &record.meta;
            let values = meta
                .tags
                .iter()
                .chain(meta.agent.iter())
                .chain(meta.weapon.iter());
            for value in values {
                if seen.insert(value.as_str()) {
                    out.push(value.clone());
                }
            }
        }
        out
    }

    pub fn new_count(&self, folder: Option<&Path>) -> usize {
        self.records
            .iter()
            .filter(|r| r.meta.is_new && folder.map(|f| r.folder == f).unwrap_or(true))
            .count()
    }

    /// Clips never finalized, across all folders, in catalog order.
    pub fn new_videos(&self) -> Vec<&VideoRecord> {
        self.records.iter().filter(|r| r.meta.is_new).collect()
    }

    pub fn folder_videos(&self, folder: &Path) -> Vec<&VideoRecord> {
        self.records.iter().filter(|r| r.folder == folder).collect()
    }

    pub fn next_in_folder(&self, path: &Path) -> Option<&VideoRecord> {
        let current = self.get(path)?;
        let siblings = self.folder_videos(&current.folder);
        let idx = siblings.iter().position(|r| r.path == path)?;
        siblings.get(idx + 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoMetadata;

    fn record(folder: &str, name: &str, mtime: i64, tags: &[&str]) -> VideoRecord {
        VideoRecord {
            filename: name.to_string(),
            path: Path::new(folder).join(name),
            folder: PathBuf::from(folder),
            size: 1024,
            mtime,
            duration: None,
            thumbnail: None,
            meta: VideoMetadata {
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..VideoMetadata::default()
            },
        }
    }

    fn sample() -> VideoLibrary {
        VideoLibrary::from_records(
            vec![
                record("/a", "one.mp4", 10, &["三杀"]),
                record("/a", "two.mp4", 30, &["四杀"]),
                record("/b", "three.mp4", 20, &["三杀", "四杀"]),
            ],
            SortOrder::NameAsc,
        )
    }

    fn names(records: &[&VideoRecord]) -> Vec<String> {
        records.iter().map(|r| r.filename.clone()).collect()
    }

    #[test]
    fn tag_filter_is_and_combined() {
        let lib = sample();
        let filter = LibraryFilter {
            tags: vec!["三杀".into(), "四杀".into()],
            ..LibraryFilter::default()
        };
        assert_eq!(names(&lib.filter(&filter)), vec!["three.mp4"]);
    }

    #[test]
    fn query_matches_filename_tags_agent_weapon() {
        let mut lib = sample();
        lib.get_mut(Path::new("/a/one.mp4")).unwrap().meta.agent = Some("K/O".into());
        lib.get_mut(Path::new("/a/two.mp4")).unwrap().meta.weapon = Some("Vandal".into());

        let by = |q: &str| {
            names(&lib.filter(&LibraryFilter {
                query: q.into(),
                ..LibraryFilter::default()
            }))
        };
        assert_eq!(by("THREE"), vec!["three.mp4"]);
        assert_eq!(by("k/o"), vec!["one.mp4"]);
        assert_eq!(by("vandal"), vec!["two.mp4"]);
        assert_eq!(by("四"), vec!["three.mp4", "two.mp4"]);
    }

    #[test]
    fn filters_compose_across_dimensions() {
        let lib = sample();
        let filter = LibraryFilter {
            query: String::new(),
            tags: vec!["三杀".into()],
            folder: Some(PathBuf::from("/a")),
        };
        assert_eq!(names(&lib.filter(&filter)), vec!["one.mp4"]);
    }

    #[test]
    fn sorting_reorders_whole_catalog() {
        let mut lib = sample();
        lib.sort(SortOrder::TimeDesc);
        let all: Vec<&VideoRecord> = lib.records().iter().collect();
        assert_eq!(names(&all), vec!["two.mp4", "three.mp4", "one.mp4"]);
        lib.sort(SortOrder::TimeAsc);
        assert_eq!(lib.records()[0].filename, "one.mp4");
        lib.sort(SortOrder::NameDesc);
        assert_eq!(lib.records()[0].filename, "two.mp4");
        assert_eq!("name-desc".parse::<SortOrder>().unwrap(), SortOrder::NameDesc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn unique_tags_cover_whole_catalog() {
        let mut lib = sample();
        lib.get_mut(Path::new("/b/three.mp4")).unwrap().meta.agent = Some("零".into());
        let tags = lib.unique_tags();
        assert_eq!(tags, vec!["三杀", "四杀", "零"]);
    }

    #[test]
    fn navigation_helpers() {
        let mut lib = sample();
        lib.get_mut(Path::new("/a/one.mp4")).unwrap().meta.is_new = false;
        assert_eq!(lib.new_count(None), 2);
        assert_eq!(lib.new_count(Some(Path::new("/a"))), 1);
        assert_eq!(
            lib.next_in_folder(Path::new("/a/one.mp4")).map(|r| r.filename.as_str()),
            Some("two.mp4")
        );
        assert!(lib.next_in_folder(Path::new("/a/two.mp4")).is_none());
        assert_eq!(lib.remove_folder(Path::new("/a")), 2);
        assert_eq!(lib.len(), 1);
    }
}
