use monoflow_core::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never searched for workspaces
const IGNORED_DIRS: [&str; 3] = [".git", "node_modules", "target"];

/// Every directory under `root` (the root included) that contains
/// `config_file`, in sorted path order
pub fn discover_workspaces(root: &Path, config_file: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::configuration(format!(
            "discovery root '{}' is not a directory",
            root.display()
        )));
    }

    let mut workspaces = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable path during discovery");
                continue;
            }
        };

        if entry.file_type().is_dir() && entry.path().join(config_file).is_file() {
            workspaces.push(entry.into_path());
        }
    }

    workspaces.sort();
    tracing::debug!(root = %root.display(), count = workspaces.len(), "Discovered workspaces");
    Ok(workspaces)
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}
