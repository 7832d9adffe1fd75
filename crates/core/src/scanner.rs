//! Lists the video files directly inside an imported folder.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq)]
pub struct ScannedVideo {
    pub filename: String,
    pub path: PathBuf,
    pub folder: PathBuf,
    pub size: u64,
    pub mtime: i64,
}

/// Matches file names against the recognized video extensions.
#[derive(Debug, Clone)]
pub struct VideoFilter {
    set: GlobSet,
}

impl VideoFilter {
    pub fn new(extensions: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for ext in extensions {
            let ext = ext.trim().trim_start_matches('.');
            if ext.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(&format!("*.{}", ext))
                .case_insensitive(true)
                .literal_separator(true)
                .build()?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    pub fn is_video(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }
}

/// Non-recursive scan of `folder`, sorted by filename.
pub async fn scan_folder(folder: &Path, filter: &VideoFilter) -> io::Result<Vec<ScannedVideo>> {
    let folder = folder.to_path_buf();
    let filter = filter.clone();
    let mut found = task::spawn_blocking(move || walk(&folder, &filter))
        .await
        .map_err(io::Error::other)??;
    found.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(found)
}

fn walk(folder: &Path, filter: &VideoFilter) -> io::Result<Vec<ScannedVideo>> {
    if !fs::metadata(folder)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", folder.display()),
        ));
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(filename) = entry.file_name().to_str() else {
            continue;
        };
        if !filter.is_video(filename) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        found.push(ScannedVideo {
            filename: filename.to_string(),
            path: entry.path().to_path_buf(),
            folder: folder.to_path_buf(),
            size: meta.len(),
            mtime,
        });
    }
    Ok(found)
}
