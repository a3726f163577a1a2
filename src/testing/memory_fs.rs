//! In-memory filesystem for tests

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::discovery::FileSystem;
use crate::common::{Error, Result};

/// In-memory tree whose listing order is the insertion order
#[derive(Default)]
pub(crate) struct MemoryFs {
    dirs: BTreeMap<PathBuf, Vec<String>>,
    files: BTreeMap<PathBuf, String>,
    written: RefCell<BTreeMap<PathBuf, String>>,
}

impl MemoryFs {
    pub(crate) fn dir(mut self, path: &str, entries: &[&str]) -> Self {
        let mut listed = vec![".".to_string(), "..".to_string()];
        listed.extend(entries.iter().map(|e| e.to_string()));
        self.dirs.insert(PathBuf::from(path), listed);
        self
    }

    pub(crate) fn file(self, path: &str) -> Self {
        self.file_with(path, "")
    }

    pub(crate) fn file_with(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(PathBuf::from(path), contents.to_string());
        self
    }

    /// Contents stored through `write`
    pub(crate) fn written(&self, path: &str) -> Option<String> {
        self.written.borrow().get(Path::new(path)).cloned()
    }
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.is_dir(path) || self.is_file(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains_key(path)
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        Ok(self.dirs.get(dir).cloned().unwrap_or_default())
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        Ok(Path::new("/").join(path))
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| Error::FileRead {
            path: path.display().to_string(),
            error: "not found".to_string(),
        })
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.written
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
