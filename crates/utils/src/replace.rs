//! Whole-file replacement for snapshot documents such as the cache table

use monoflow_core::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Replace `path` with `content` so that readers see either the previous
/// document or the new one, never a prefix of it.
///
/// Missing parent directories are created. The content is staged in a
/// hidden sibling file, synced, then renamed over the target.
pub fn replace_file(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        None => {
            return Err(Error::configuration(format!(
                "cannot replace '{}': not a file path",
                path.display()
            )))
        }
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::file_system(dir, "create directory", e))?;

    let staged = Staged::create(dir)?;
    staged.fill(content.as_bytes())?;
    staged.commit(path)
}

/// Sibling file that is removed again unless it was renamed into place
struct Staged {
    path: PathBuf,
    file: File,
    committed: bool,
}

impl Staged {
    fn create(dir: &Path) -> Result<Self> {
        let path = dir.join(format!(".monoflow-{}.partial", Uuid::new_v4().simple()));
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| Error::file_system(&path, "create staging file", e))?;
        Ok(Self {
            path,
            file,
            committed: false,
        })
    }

    fn fill(&self, bytes: &[u8]) -> Result<()> {
        let mut file = &self.file;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| Error::file_system(&self.path, "write staging file", e))
    }

    fn commit(mut self, target: &Path) -> Result<()> {
        std::fs::rename(&self.path, target)
            .map_err(|e| Error::file_system(target, "replace file", e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
