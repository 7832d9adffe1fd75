use std::path::PathBuf;
use tokio::sync::broadcast;

/// State-change notifications for whatever front end renders the app.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    CatalogChanged { videos: usize },
    ConfigChanged,
    SessionOpened { path: PathBuf },
    SessionClosed,
    PendingChanged { count: usize },
    Flushed { saved: usize, failed: usize },
    Probed { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Fire and forget; having no subscriber is fine.
    pub fn emit(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
