use anyhow::{bail, Context, Result};
use highlight_core::library::VideoLibrary;
use std::path::{Path, PathBuf};

/// Absolute, canonical form of a folder given on the command line, so the
/// same folder is never imported twice under different spellings.
pub fn resolve_dir(input: &str) -> Result<PathBuf> {
    let path = Path::new(input);
    let canonical = std::fs::canonicalize(path)
        .with_context(|| format!("cannot resolve folder {}", path.display()))?;
    if !canonical.is_dir() {
        bail!("{} is not a directory", canonical.display());
    }
    Ok(canonical)
}

/// Finds a clip by full path or, failing that, by a filename that is unique
/// across the catalog.
pub fn find_video(library: &VideoLibrary, input: &str) -> Result<PathBuf> {
    let direct = std::fs::canonicalize(input).unwrap_or_else(|_| PathBuf::from(input));
    if library.get(&direct).is_some() {
        return Ok(direct);
    }
    let matches: Vec<&Path> = library
        .records()
        .iter()
        .filter(|r| r.filename == input)
        .map(|r| r.path.as_path())
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.to_path_buf()),
        [] => bail!("no video named {}", input),
        many => bail!(
            "{} is ambiguous ({} matches), pass the full path",
            input,
            many.len()
        ),
    }
}
