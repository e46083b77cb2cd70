//! Temporary database files removed on drop.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A database path inside its own temporary directory.
///
/// The directory (and the WAL/SHM side files SQLite creates next to the
/// database) is deleted when the value is dropped.
#[derive(Debug)]
pub struct TempDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl TempDatabase {
    /// Reserve a fresh database path named `file_name`.
    pub fn new(file_name: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("partspro-").tempdir()?;
        let path = dir.path().join(file_name);
        Ok(Self { _dir: dir, path })
    }

    /// Path of the database file (not created yet).
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_removed_on_drop() {
        let db = TempDatabase::new("sync.db").unwrap();
        let parent = db.path().parent().unwrap().to_path_buf();
        assert!(parent.exists());
        assert!(!db.path().exists());

        drop(db);

        assert!(!parent.exists());
    }
}
