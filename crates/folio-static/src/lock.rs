//! Exclusive lock on an output root.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("another build holds {}", .0.display())]
    Held(PathBuf),

    #[error("failed to create lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Held for the duration of a build. The lock file is removed on drop.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    /// Take the lock beside `output_dir`, failing if it already exists.
    pub fn acquire(output_dir: &Path) -> Result<Self, LockError> {
        let path = lock_path(output_dir);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(LockError::Held(path)),
            Err(source) => return Err(LockError::Io { path, source }),
        };

        // The pid is informational only
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}

/// `public` locks through `public.lock`, kept outside the output root.
pub fn lock_path(output_dir: &Path) -> PathBuf {
    let name = output_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    output_dir.with_file_name(format!("{}.lock", name))
}
