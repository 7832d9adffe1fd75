//! Editing state for the one clip currently open.

use crate::error::CoreError;
use crate::models::{EditDraft, VideoRecord};
use crate::taxonomy;
use std::path::{Path, PathBuf};

/// Smallest trim window, in seconds. The handles never cross or get closer.
pub const MIN_TRIM_GAP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Clean,
    Dirty,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    path: PathBuf,
    folder: PathBuf,
    filename: String,
    initial: EditDraft,
    draft: EditDraft,
    duration: Option<f64>,
    custom_tags: Vec<String>,
}

impl EditSession {
    /// Starts editing `record`. A pending overlay entry for the clip wins over
    /// its persisted metadata.
    pub fn open(record: &VideoRecord, pending: Option<&EditDraft>) -> Self {
        let initial = pending
            .cloned()
            .unwrap_or_else(|| EditDraft::from(&record.meta));
        let mut session = Self {
            path: record.path.clone(),
            folder: record.folder.clone(),
            filename: record.filename.clone(),
            draft: initial.clone(),
            initial,
            duration: None,
            custom_tags: Vec::new(),
        };
        if let Some(d) = record.duration {
            session.set_duration(d);
        }
        session
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn draft(&self) -> &EditDraft {
        &self.draft
    }

    pub fn initial(&self) -> &EditDraft {
        &self.initial
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Tags added with `add_custom_tag` during this session.
    pub fn custom_tags(&self) -> &[String] {
        &self.custom_tags
    }

    pub fn state(&self) -> SessionState {
        if self.draft.same_as(&self.initial) {
            SessionState::Clean
        } else {
            SessionState::Dirty
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == SessionState::Dirty
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.draft.tags.iter().any(|t| t == tag)
    }

    /// Adds the tag if absent, removes it otherwise. Returns whether the tag
    /// is now present.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if let Some(idx) = self.draft.tags.iter().position(|t| t == tag) {
            self.draft.tags.remove(idx);
            false
        } else {
            self.draft.tags.push(tag.to_string());
            true
        }
    }

    pub fn select_agent(&mut self, agent: &str) -> Result<(), CoreError> {
        if !taxonomy::is_agent(agent) {
            return Err(CoreError::UnknownAgent(agent.to_string()));
        }
        select_exclusive(&mut self.draft.tags, &mut self.draft.agent, agent);
        Ok(())
    }

    pub fn select_weapon(&mut self, weapon: &str) -> Result<(), CoreError> {
        if !taxonomy::is_weapon(weapon) {
            return Err(CoreError::UnknownWeapon(weapon.to_string()));
        }
        select_exclusive(&mut self.draft.tags, &mut self.draft.weapon, weapon);
        Ok(())
    }

    /// Sets both trim handles. `end` is clamped to `[MIN_TRIM_GAP, duration]`
    /// first, then `start` to `[0, end - MIN_TRIM_GAP]`.
    pub fn set_trim_range(&mut self, start: f64, end: f64) {
        if !start.is_finite() || !end.is_finite() {
            return;
        }
        let max = self.upper_bound();
        if max < MIN_TRIM_GAP {
            self.draft.start_time = 0.0;
            self.draft.end_time = max;
            return;
        }
        let end = end.clamp(MIN_TRIM_GAP, max);
        self.draft.start_time = start.clamp(0.0, end - MIN_TRIM_GAP);
        self.draft.end_time = end;
    }

    /// Moves only the start handle; the end handle stays unless it has to
    /// be pulled into range. While the length is unknown an unset end (0)
    /// stays unset and `set_duration` settles both handles later.
    pub fn set_start(&mut self, t: f64) {
        if !t.is_finite() {
            return;
        }
        if self.duration.is_none() && self.draft.end_time <= 0.0 {
            self.draft.start_time = t.max(0.0);
            return;
        }
        let max = self.upper_bound();
        if max < MIN_TRIM_GAP {
            self.set_trim_range(0.0, max);
            return;
        }
        let end = self.draft.end_time.clamp(MIN_TRIM_GAP, max);
        self.draft.start_time = t.clamp(0.0, end - MIN_TRIM_GAP);
        self.draft.end_time = end;
    }

    /// Moves only the end handle. Without a known length the end is only
    /// bounded below; `set_duration` pulls it back in once the length is
    /// learned.
    pub fn set_end(&mut self, t: f64) {
        if !t.is_finite() {
            return;
        }
        let max = self.upper_bound();
        if max < MIN_TRIM_GAP {
            self.set_trim_range(0.0, max);
            return;
        }
        let start = self.draft.start_time.clamp(0.0, max - MIN_TRIM_GAP);
        self.draft.start_time = start;
        self.draft.end_time = t.clamp(start + MIN_TRIM_GAP, max);
    }

    /// Records the probed duration. An unset end (0) snaps to the full
    /// length; the baseline follows when the user has not touched the end.
    pub fn set_duration(&mut self, duration: f64) {
        if !duration.is_finite() || duration <= 0.0 {
            return;
        }
        self.duration = Some(duration);
        if self.draft.end_time == 0.0 {
            if self.initial.end_time == 0.0 {
                self.initial.end_time = duration;
            }
            self.draft.end_time = duration;
        }
        let (start, end) = (self.draft.start_time, self.draft.end_time);
        if end > duration || end - start < MIN_TRIM_GAP {
            self.set_trim_range(start, end);
        }
    }

    /// Adds a free-form tag to the draft and to the session palette, so it
    /// stays selectable after being toggled off.
    pub fn add_custom_tag(&mut self, tag: &str) -> Result<(), CoreError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(CoreError::EmptyTag);
        }
        if !self.custom_tags.iter().any(|t| t == tag) {
            self.custom_tags.push(tag.to_string());
        }
        if !self.has_tag(tag) {
            self.draft.tags.push(tag.to_string());
        }
        Ok(())
    }

    /// Custom tags to offer: draft tags that are neither presets nor part
    /// of the taxonomy, followed by this session's custom tags.
    pub fn custom_palette(&self, presets: &[String]) -> Vec<String> {
        let mut palette: Vec<String> = self
            .draft
            .tags
            .iter()
            .filter(|t| {
                !presets.contains(*t) && !taxonomy::is_agent(t) && !taxonomy::is_weapon(t)
            })
            .cloned()
            .collect();
        for tag in &self.custom_tags {
            if !palette.contains(tag) {
                palette.push(tag.clone());
            }
        }
        palette
    }

    fn upper_bound(&self) -> f64 {
        self.duration.unwrap_or(f64::INFINITY)
    }
}

/// One-of selection coupled to the tag list: the selected value is always
/// also a tag, and deselecting removes it.
fn select_exclusive(tags: &mut Vec<String>, slot: &mut Option<String>, value: &str) {
    if slot.as_deref() == Some(value) {
        tags.retain(|t| t != value);
        *slot = None;
        return;
    }
    if let Some(previous) = slot.take() {
        tags.retain(|t| *t != previous);
    }
    if !tags.iter().any(|t| t == value) {
        tags.push(value.to_string());
    }
    *slot = Some(value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoMetadata;

    fn record(meta: VideoMetadata) -> VideoRecord {
        VideoRecord {
            filename: "a.mp4".into(),
            path: PathBuf::from("/clips/a.mp4"),
            folder: PathBuf::from("/clips"),
            size: 0,
            mtime: 0,
            duration: None,
            thumbnail: None,
            meta,
        }
    }

    fn session_with_duration(duration: f64) -> EditSession {
        let mut s = EditSession::open(&record(VideoMetadata::default()), None);
        s.set_duration(duration);
        s
    }

    fn assert_gap(d: &EditDraft, duration: f64) {
        assert!(d.start_time >= 0.0 && d.end_time <= duration, "{:?}", d);
        assert!(d.end_time - d.start_time >= MIN_TRIM_GAP - 1e-9, "{:?}", d);
    }

    fn agent_tags(s: &EditSession) -> usize {
        s.draft().tags.iter().filter(|t| taxonomy::is_agent(t)).count()
    }

    #[test]
    fn toggling_twice_is_identity() {
        let mut s = EditSession::open(
            &record(VideoMetadata {
                tags: vec!["一血".into(), "残局".into()],
                ..VideoMetadata::default()
            }),
            None,
        );
        for tag in ["一血", "三杀"] {
            let before = s.draft().clone();
            s.toggle_tag(tag);
            s.toggle_tag(tag);
            assert!(s.draft().same_as(&before));
        }
        assert_eq!(s.state(), SessionState::Clean);
    }

    #[test]
    fn trimming_before_the_length_is_known() {
        let mut s = EditSession::open(&record(VideoMetadata::default()), None);
        s.set_start(5.0);
        assert_eq!((s.draft().start_time, s.draft().end_time), (5.0, 0.0));
        s.set_duration(12.0);
        assert_eq!((s.draft().start_time, s.draft().end_time), (5.0, 12.0));

        let mut s = EditSession::open(&record(VideoMetadata::default()), None);
        s.set_start(8.0);
        s.set_duration(3.0);
        assert_gap(s.draft(), 3.0);
        assert_eq!(s.draft().end_time, 3.0);

        let mut s = EditSession::open(&record(VideoMetadata::default()), None);
        s.set_end(1000.0);
        assert_eq!(s.draft().end_time, 1000.0);
        s.set_duration(20.0);
        assert_gap(s.draft(), 20.0);
        assert_eq!(s.draft().end_time, 20.0);
    }

    #[test]
    fn reselecting_agent_clears_it() {
        let mut s = session_with_duration(10.0);
        s.select_agent("钛狐").unwrap();
        assert_eq!(s.draft().agent.as_deref(), Some("钛狐"));
        assert!(s.has_tag("钛狐"));
        s.select_agent("钛狐").unwrap();
        assert_eq!(s.draft().agent, None);
        assert!(!s.has_tag("钛狐"));
    }

    #[test]
    fn switching_agent_keeps_exactly_one_agent_tag() {
        let mut s = session_with_duration(10.0);
        s.select_agent("钛狐").unwrap();
        assert_eq!(agent_tags(&s), 1);
        s.select_agent("零").unwrap();
        assert_eq!(s.draft().agent.as_deref(), Some("零"));
        assert!(!s.has_tag("钛狐"));
        assert!(s.has_tag("零"));
        assert_eq!(agent_tags(&s), 1);
    }

    #[test]
    fn weapon_is_independent_of_agent() {
        let mut s = session_with_duration(10.0);
        s.select_agent("捷风").unwrap();
        s.select_weapon("幻影").unwrap();
        s.select_weapon("狂徒").unwrap();
        assert_eq!(s.draft().agent.as_deref(), Some("捷风"));
        assert_eq!(s.draft().weapon.as_deref(), Some("狂徒"));
        assert!(!s.has_tag("幻影"));
        assert!(s.select_weapon("钛狐").is_err());
        assert!(matches!(s.select_agent("nobody"), Err(CoreError::UnknownAgent(_))));
    }

    #[test]
    fn trim_gap_holds_for_any_sequence() {
        let mut s = session_with_duration(12.0);
        let calls: [(f64, f64); 8] = [
            (3.0, 3.1),
            (11.9, 2.0),
            (-4.0, 40.0),
            (5.0, 5.0),
            (12.0, 12.0),
            (0.0, 0.0),
            (6.2, 6.4),
            (f64::NAN, 1.0),
        ];
        for (start, end) in calls {
            s.set_trim_range(start, end);
            assert_gap(s.draft(), 12.0);
        }
        for t in [11.8, 0.1, 12.5, -1.0] {
            s.set_start(t);
            assert_gap(s.draft(), 12.0);
            s.set_end(t);
            assert_gap(s.draft(), 12.0);
        }
    }

    #[test]
    fn handle_drag_respects_other_handle() {
        let mut s = session_with_duration(10.0);
        s.set_trim_range(2.0, 6.0);
        s.set_start(7.0);
        assert_eq!(s.draft().start_time, 5.5);
        assert_eq!(s.draft().end_time, 6.0);
        s.set_end(1.0);
        assert_eq!(s.draft().end_time, 6.0);
        s.set_end(9.0);
        assert_eq!(s.draft().end_time, 9.0);
    }

    #[test]
    fn duration_fills_unset_end_without_dirtying() {
        let s = session_with_duration(8.0);
        assert_eq!(s.draft().end_time, 8.0);
        assert_eq!(s.state(), SessionState::Clean);
    }

    #[test]
    fn dirty_check_tolerates_jitter() {
        let mut s = session_with_duration(8.0);
        s.set_trim_range(1.0, 8.0);
        assert!(s.is_dirty());

        let mut s = EditSession::open(
            &record(VideoMetadata {
                start_time: 1.0,
                end_time: 5.0,
                ..VideoMetadata::default()
            }),
            None,
        );
        s.set_trim_range(1.004, 4.996);
        assert!(!s.is_dirty());
    }

    #[test]
    fn pending_entry_wins_over_persisted_meta() {
        let pending = EditDraft {
            tags: vec!["五杀".into()],
            agent: None,
            weapon: None,
            start_time: 0.0,
            end_time: 3.0,
        };
        let s = EditSession::open(&record(VideoMetadata::default()), Some(&pending));
        assert!(s.has_tag("五杀"));
        assert_eq!(s.initial(), &pending);
        assert!(!s.is_dirty());
    }

    #[test]
    fn custom_tags_stay_in_palette_after_toggle_off() {
        let presets = vec!["三杀".to_string()];
        let mut s = session_with_duration(5.0);
        s.add_custom_tag("  刀杀 ").unwrap();
        s.toggle_tag("三杀");
        s.select_agent("零").unwrap();
        assert!(s.has_tag("刀杀"));
        assert_eq!(s.custom_palette(&presets), vec!["刀杀"]);

        s.toggle_tag("刀杀");
        assert!(!s.has_tag("刀杀"));
        assert_eq!(s.custom_palette(&presets), vec!["刀杀"]);
        assert!(matches!(s.add_custom_tag("   "), Err(CoreError::EmptyTag)));
    }
}
