// src/watch/walk.rs

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::{Result, WatchptyError};

/// Whether a directory with this base name is hidden.
///
/// Names starting with a single `.` are hidden; `..` and anything else
/// starting with `..` is not.
pub fn is_hidden_dir_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') && !name.starts_with("..")
}

/// Collect `root` and every non-hidden directory below it, in lexical
/// walk order.
///
/// Hidden directories are pruned together with everything beneath them.
/// `root` itself is always included, whatever its name. Symlinks are not
/// followed. Any error while walking is returned.
pub fn collect_watch_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir() && is_hidden_dir_name(entry.file_name()))
        });

    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| {
            let path = source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            WatchptyError::Walk { path, source }
        })?;

        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    Ok(dirs)
}
