//! Duration and thumbnail probing, delegated to ffprobe/ffmpeg.
//!
//! Probing runs as a background sequence over the catalog. Each item is
//! bounded by a timeout so a corrupt file cannot stall the rest.

use crate::config::ProbeSettings;
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeInfo {
    /// Seconds; 0 when unknown.
    pub duration: f64,
    pub thumbnail: Option<PathBuf>,
}

#[async_trait::async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path, mtime: i64) -> anyhow::Result<ProbeInfo>;
}

/// Result of probing one clip, tagged with the catalog generation it was
/// started for.
#[derive(Debug, Clone)]
pub struct ProbeUpdate {
    pub generation: u64,
    pub path: PathBuf,
    pub info: ProbeInfo,
}

pub struct FfmpegProbe {
    ffprobe: String,
    ffmpeg: String,
    thumbnail_dir: Option<PathBuf>,
}

impl FfmpegProbe {
    pub fn new(settings: &ProbeSettings) -> Self {
        Self {
            ffprobe: settings.ffprobe.clone(),
            ffmpeg: settings.ffmpeg.clone(),
            thumbnail_dir: settings.thumbnail_dir.as_ref().map(PathBuf::from),
        }
    }

    async fn duration(&self, path: &Path) -> anyhow::Result<f64> {
        let out = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.ffprobe))?;
        if !out.status.success() {
            bail!("{} exited with {}", self.ffprobe, out.status);
        }
        let text = String::from_utf8_lossy(&out.stdout);
        let secs: f64 = text
            .trim()
            .parse()
            .with_context(|| format!("unexpected duration output: {:?}", text.trim()))?;
        Ok(secs)
    }

    async fn thumbnail(
        &self,
        path: &Path,
        mtime: i64,
        duration: f64,
    ) -> anyhow::Result<Option<PathBuf>> {
        let Some(dir) = &self.thumbnail_dir else {
            return Ok(None);
        };
        let dest = dir.join(thumbnail_name(path, mtime));
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            return Ok(Some(dest));
        }
        tokio::fs::create_dir_all(dir).await?;

        let at = (duration * 0.1).min(1.0);
        let status = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error", "-ss", &format!("{:.3}", at), "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-vf", "scale=320:180"])
            .arg(&dest)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to run {}", self.ffmpeg))?;
        if !status.success() {
            bail!("{} exited with {}", self.ffmpeg, status);
        }
        Ok(Some(dest))
    }
}

#[async_trait::async_trait]
impl MediaProbe for FfmpegProbe {
    async fn probe(&self, path: &Path, mtime: i64) -> anyhow::Result<ProbeInfo> {
        let duration = self.duration(path).await?;
        let thumbnail = match self.thumbnail(path, mtime, duration).await {
            Ok(t) => t,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "thumbnail extraction failed");
                None
            }
        };
        Ok(ProbeInfo {
            duration,
            thumbnail,
        })
    }
}

/// Cache file name for a clip's thumbnail; changes when the file does.
pub fn thumbnail_name(path: &Path, mtime: i64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(&mtime.to_le_bytes());
    format!("{}.jpg", hasher.finalize().to_hex())
}

/// Probes `items` one after another, sending each result to `tx`. A failed
/// or timed-out item reports an empty `ProbeInfo`. Stops early once the
/// receiver is gone.
pub async fn run_probe_sequence(
    probe: Arc<dyn MediaProbe>,
    generation: u64,
    items: Vec<(PathBuf, i64)>,
    per_item: Duration,
    tx: mpsc::Sender<ProbeUpdate>,
) {
    for (path, mtime) in items {
        let info = match tokio::time::timeout(per_item, probe.probe(&path, mtime)).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                debug!(path = %path.display(), error = %e, "probe failed");
                ProbeInfo::default()
            }
            Err(_) => {
                warn!(path = %path.display(), timeout = ?per_item, "probe timed out");
                ProbeInfo::default()
            }
        };
        let update = ProbeUpdate {
            generation,
            path,
            info,
        };
        if tx.send(update).await.is_err() {
            debug!("probe receiver dropped, stopping");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowOnPattern;

    #[async_trait::async_trait]
    impl MediaProbe for SlowOnPattern {
        async fn probe(&self, path: &Path, _mtime: i64) -> anyhow::Result<ProbeInfo> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with("corrupt") {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if name.starts_with("broken") {
                bail!("unreadable");
            }
            Ok(ProbeInfo {
                duration: 42.0,
                thumbnail: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_items_time_out_without_blocking_the_rest() {
        let (tx, mut rx) = mpsc::channel(8);
        let items = vec![
            (PathBuf::from("/c/corrupt.mp4"), 0),
            (PathBuf::from("/c/broken.mp4"), 0),
            (PathBuf::from("/c/good.mp4"), 0),
        ];
        tokio::spawn(run_probe_sequence(
            Arc::new(SlowOnPattern),
            7,
            items,
            Duration::from_secs(3),
            tx,
        ));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.path, PathBuf::from("/c/corrupt.mp4"));
        assert_eq!(first.info, ProbeInfo::default());
        let second = rx.recv().await.unwrap();
        assert_eq!(second.info.duration, 0.0);
        let third = rx.recv().await.unwrap();
        assert_eq!(third.generation, 7);
        assert_eq!(third.info.duration, 42.0);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn thumbnail_name_depends_on_mtime() {
        let p = Path::new("/clips/a.mp4");
        assert_ne!(thumbnail_name(p, 1), thumbnail_name(p, 2));
        assert!(thumbnail_name(p, 1).ends_with(".jpg"));
    }
}
