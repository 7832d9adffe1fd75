//! Application context: owns the catalog, the open edit session and the
//! pending overlay, and drives navigation and saving between them.

use crate::config::Settings;
use crate::error::CoreError;
use crate::events::{AppEvent, EventBus};
use crate::library::{LibraryFilter, SortOrder, VideoLibrary};
use crate::models::VideoRecord;
use crate::pending::PendingChangeSet;
use crate::probe::{self, MediaProbe, ProbeUpdate};
use crate::reconcile::{self, FlushReport};
use crate::scanner::VideoFilter;
use crate::session::EditSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::{GlobalConfig, JsonMetadataStore, MetadataStore};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

/// What `finish` did after saving.
#[derive(Debug)]
pub enum FinishOutcome {
    /// Everything saved and nothing new is left; the session is closed.
    Completed(FlushReport),
    /// Everything saved; the next new clip is now open.
    Continue {
        report: FlushReport,
        next: PathBuf,
        remaining: usize,
    },
    /// Some folder failed to save. The session stays open and the overlay
    /// is kept for a retry.
    Failed(FlushReport),
}

impl FinishOutcome {
    pub fn report(&self) -> &FlushReport {
        match self {
            FinishOutcome::Completed(r) | FinishOutcome::Failed(r) => r,
            FinishOutcome::Continue { report, .. } => report,
        }
    }
}

pub struct AppContext {
    settings: Settings,
    config_path: PathBuf,
    config: GlobalConfig,
    store: Arc<dyn MetadataStore>,
    video_filter: VideoFilter,
    library: VideoLibrary,
    filter: LibraryFilter,
    session: Option<EditSession>,
    /// Navigation list while quick-tagging.
    playlist: Option<Vec<PathBuf>>,
    pending: PendingChangeSet,
    /// Bumped whenever the set of catalog paths changes; probe results from
    /// an older generation are dropped.
    generation: u64,
    events: EventBus,
}

impl AppContext {
    /// Loads `app_config.json` and builds the catalog with the JSON store.
    pub async fn bootstrap(settings: Settings) -> Result<Self, CoreError> {
        Self::bootstrap_with_store(settings, Arc::new(JsonMetadataStore::new())).await
    }

    pub async fn bootstrap_with_store(
        settings: Settings,
        store: Arc<dyn MetadataStore>,
    ) -> Result<Self, CoreError> {
        let video_filter = VideoFilter::new(&settings.scan.extensions)?;
        let config_path = settings.app_config_path();
        let config = storage::load_config(&config_path).await;

        let mut library = VideoLibrary::new(SortOrder::default());
        library
            .rebuild(store.as_ref(), &video_filter, &config.imported_folders)
            .await;

        info!(
            config = %config_path.display(),
            folders = config.imported_folders.len(),
            videos = library.len(),
            "app ready"
        );
        Ok(Self {
            settings,
            config_path,
            config,
            store,
            video_filter,
            library,
            filter: LibraryFilter::default(),
            session: None,
            playlist: None,
            pending: PendingChangeSet::new(),
            generation: 0,
            events: EventBus::default(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn library(&self) -> &VideoLibrary {
        &self.library
    }

    pub fn pending(&self) -> &PendingChangeSet {
        &self.pending
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Result<&mut EditSession, CoreError> {
        self.session.as_mut().ok_or(CoreError::NoSession)
    }

    pub fn is_quick_tag(&self) -> bool {
        self.playlist.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    pub fn filter(&self) -> &LibraryFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: LibraryFilter) {
        self.filter = filter;
    }

    /// Catalog view under the current filter, in the current sort order.
    pub fn filtered(&self) -> Vec<&VideoRecord> {
        self.library.filter(&self.filter)
    }

    pub fn set_sort(&mut self, order: SortOrder) {
        self.library.sort(order);
        self.events.emit(AppEvent::CatalogChanged {
            videos: self.library.len(),
        });
    }

    /// Rescans every imported folder.
    pub async fn refresh(&mut self) -> usize {
        let count = self
            .library
            .rebuild(
                self.store.as_ref(),
                &self.video_filter,
                &self.config.imported_folders,
            )
            .await;
        self.catalog_changed();
        count
    }

    /// Adds a folder to the imported list and loads its clips. The folder is
    /// scanned before the config is touched, so an unreadable folder is
    /// never recorded.
    pub async fn import_folder(&mut self, folder: &Path) -> Result<usize, CoreError> {
        if self.config.imported_folders.iter().any(|f| f == folder) {
            return Err(CoreError::FolderAlreadyImported(folder.to_path_buf()));
        }
        let count = self
            .library
            .load_folder(self.store.as_ref(), &self.video_filter, folder)
            .await?;
        let mut next = self.config.clone();
        next.imported_folders.push(folder.to_path_buf());
        if let Err(e) = self.commit_config(next).await {
            self.library.remove_folder(folder);
            return Err(e);
        }
        self.library.sort(self.library.order());
        info!(folder = %folder.display(), videos = count, "folder imported");
        self.catalog_changed();
        Ok(count)
    }

    /// Soft removal: the folder's clips leave the catalog but its metadata
    /// file stays on disk. Pending entries for those clips are kept and still
    /// flush to the folder.
    pub async fn remove_folder(&mut self, folder: &Path) -> Result<usize, CoreError> {
        let idx = self
            .config
            .imported_folders
            .iter()
            .position(|f| f == folder)
            .ok_or_else(|| CoreError::FolderNotImported(folder.to_path_buf()))?;
        let mut next = self.config.clone();
        next.imported_folders.remove(idx);
        self.commit_config(next).await?;

        if self.session.as_ref().map(|s| s.folder() == folder).unwrap_or(false) {
            self.close_session();
        }
        let removed = self.library.remove_folder(folder);
        if self.filter.folder.as_deref() == Some(folder) {
            self.filter.folder = None;
        }
        if let Some(list) = self.playlist.as_mut() {
            list.retain(|p| self.library.get(p).is_some());
        }
        info!(folder = %folder.display(), videos = removed, "folder removed");
        self.catalog_changed();
        Ok(removed)
    }

    pub async fn add_preset_tag(&mut self, tag: &str) -> Result<(), CoreError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(CoreError::EmptyTag);
        }
        if self.config.preset_tags.iter().any(|t| t == tag) {
            return Err(CoreError::DuplicatePresetTag(tag.to_string()));
        }
        let mut next = self.config.clone();
        next.preset_tags.push(tag.to_string());
        self.commit_config(next).await
    }

    pub async fn remove_preset_tag(&mut self, tag: &str) -> Result<(), CoreError> {
        let idx = self
            .config
            .preset_tags
            .iter()
            .position(|t| t == tag)
            .ok_or_else(|| CoreError::UnknownPresetTag(tag.to_string()))?;
        let mut next = self.config.clone();
        next.preset_tags.remove(idx);
        self.commit_config(next).await
    }

    /// Opens `path` for editing. The outgoing clip's draft is committed to
    /// the overlay first.
    pub fn open_video(&mut self, path: &Path) -> Result<&EditSession, CoreError> {
        if self.library.get(path).is_none() {
            return Err(CoreError::UnknownVideo(path.to_path_buf()));
        }
        self.commit_current();
        let record = self
            .library
            .get(path)
            .ok_or_else(|| CoreError::UnknownVideo(path.to_path_buf()))?;
        let session = EditSession::open(record, self.pending.get(path));
        debug!(path = %path.display(), "session opened");
        self.events.emit(AppEvent::SessionOpened {
            path: path.to_path_buf(),
        });
        let session: &EditSession = self.session.insert(session);
        Ok(session)
    }

    /// Starts a session over every new clip across all folders. Returns
    /// `None` when nothing is new.
    pub fn start_quick_tag(&mut self) -> Result<Option<&EditSession>, CoreError> {
        let list: Vec<PathBuf> = self
            .library
            .new_videos()
            .into_iter()
            .map(|r| r.path.clone())
            .collect();
        let Some(first) = list.first().cloned() else {
            return Ok(None);
        };
        info!(videos = list.len(), "quick tag started");
        self.playlist = Some(list);
        self.open_video(&first).map(Some)
    }

    /// Moves to the next clip: the next playlist entry while quick-tagging,
    /// otherwise the next clip of the same folder. `None` at the end.
    pub fn next_video(&mut self) -> Result<Option<&EditSession>, CoreError> {
        let current = self.session.as_ref().ok_or(CoreError::NoSession)?.path();
        let next = match &self.playlist {
            Some(list) => list
                .iter()
                .position(|p| p == current)
                .and_then(|i| list.get(i + 1))
                .cloned(),
            None => self.library.next_in_folder(current).map(|r| r.path.clone()),
        };
        match next {
            Some(path) => self.open_video(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Copies the open session's draft into the overlay. Returns whether a
    /// session was open.
    pub fn commit_current(&mut self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        self.pending
            .commit(session.path().to_path_buf(), session.draft().clone());
        self.events.emit(AppEvent::PendingChanged {
            count: self.pending.len(),
        });
        true
    }

    pub async fn flush_all(&mut self) -> FlushReport {
        let report =
            reconcile::flush_all(self.store.as_ref(), &mut self.library, &mut self.pending).await;
        self.events.emit(AppEvent::Flushed {
            saved: report.saved.len(),
            failed: report.failed.len(),
        });
        self.events.emit(AppEvent::PendingChanged {
            count: self.pending.len(),
        });
        report
    }

    /// Commits and flushes, then either ends the session or opens the next
    /// new clip of the folder (or of the quick-tag playlist).
    pub async fn finish(&mut self) -> Result<FinishOutcome, CoreError> {
        let current = self
            .session
            .as_ref()
            .ok_or(CoreError::NoSession)?
            .path()
            .to_path_buf();
        self.commit_current();
        let report = self.flush_all().await;
        if !report.is_success() {
            return Ok(FinishOutcome::Failed(report));
        }

        let (next, remaining) = self.next_new(&current);
        self.session = None;
        match next {
            Some(next) => {
                self.open_video(&next)?;
                Ok(FinishOutcome::Continue {
                    report,
                    next,
                    remaining,
                })
            }
            None => {
                self.playlist = None;
                self.events.emit(AppEvent::SessionClosed);
                Ok(FinishOutcome::Completed(report))
            }
        }
    }

    /// Drops every unsaved change and closes the session.
    pub fn discard(&mut self) {
        self.pending.clear();
        self.session = None;
        self.playlist = None;
        self.events.emit(AppEvent::PendingChanged { count: 0 });
        self.events.emit(AppEvent::SessionClosed);
    }

    /// Leaves the editor, keeping the outgoing draft in the overlay.
    pub fn close_session(&mut self) {
        self.commit_current();
        self.session = None;
        self.playlist = None;
        self.events.emit(AppEvent::SessionClosed);
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.session.as_ref().map(|s| s.is_dirty()).unwrap_or(false) || self.pending.has_unsaved()
    }

    /// Starts probing the whole catalog in the background. Results arrive on
    /// the returned channel and are applied with `apply_probe`.
    pub fn spawn_probes(&self, probe: Arc<dyn MediaProbe>) -> mpsc::Receiver<ProbeUpdate> {
        let items: Vec<(PathBuf, i64)> = self
            .library
            .records()
            .iter()
            .map(|r| (r.path.clone(), r.mtime))
            .collect();
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(probe::run_probe_sequence(
            probe,
            self.generation,
            items,
            self.settings.probe.timeout(),
            tx,
        ));
        rx
    }

    /// Stores a probe result. Results for an older catalog generation or a
    /// clip no longer in the catalog are ignored; returns whether it applied.
    pub fn apply_probe(&mut self, update: ProbeUpdate) -> bool {
        if update.generation != self.generation {
            debug!(path = %update.path.display(), "stale probe result dropped");
            return false;
        }
        let Some(record) = self.library.get_mut(&update.path) else {
            return false;
        };
        let duration = update.info.duration;
        record.duration = (duration > 0.0).then_some(duration);
        record.thumbnail = update.info.thumbnail;

        if let Some(session) = self.session.as_mut() {
            if session.path() == update.path.as_path() {
                session.set_duration(duration);
            }
        }
        self.events.emit(AppEvent::Probed { path: update.path });
        true
    }

    /// The next new clip after `current` in navigation order, wrapping
    /// around, and how many new clips the navigation list still holds.
    fn next_new(&self, current: &Path) -> (Option<PathBuf>, usize) {
        let list: Vec<PathBuf> = match &self.playlist {
            Some(list) => list.clone(),
            None => {
                let folder = self
                    .library
                    .get(current)
                    .map(|r| r.folder.clone())
                    .or_else(|| current.parent().map(Path::to_path_buf))
                    .unwrap_or_default();
                self.library
                    .folder_videos(&folder)
                    .into_iter()
                    .map(|r| r.path.clone())
                    .collect()
            }
        };
        let is_new = |p: &PathBuf| self.library.get(p).map(|r| r.meta.is_new).unwrap_or(false);
        let remaining = list.iter().filter(|p| is_new(*p)).count();
        let start = list
            .iter()
            .position(|p| p == current)
            .map(|i| i + 1)
            .unwrap_or(0);
        let next = list[start..]
            .iter()
            .chain(list[..start].iter())
            .find(|p| is_new(*p))
            .cloned();
        (next, remaining)
    }

    /// Persists `next` and only then adopts it, so a failed write leaves
    /// the in-memory config as it was and the action can be retried.
    async fn commit_config(&mut self, next: GlobalConfig) -> Result<(), CoreError> {
        storage::save_config(&self.config_path, &next).await?;
        self.config = next;
        self.events.emit(AppEvent::ConfigChanged);
        Ok(())
    }

    fn catalog_changed(&mut self) {
        self.generation += 1;
        self.events.emit(AppEvent::CatalogChanged {
            videos: self.library.len(),
        });
    }
}
