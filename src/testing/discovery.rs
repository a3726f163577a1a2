//! Suite discovery
//!
//! Turns the paths given on the command line into the ordered list of suite
//! files to run. Directories are expanded depth-first in place, explicit
//! files keep their argument order.

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Extensions of the files the suite host can execute
pub const SUITE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Filesystem primitives needed by discovery and reporting
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Entry names of a directory, in listing order
    fn list(&self, dir: &Path) -> Result<Vec<String>>;
    fn absolute(&self, path: &Path) -> Result<PathBuf>;
    fn read(&self, path: &Path) -> Result<String>;
    /// Store a report file
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
}

/// `std::fs` backed filesystem
///
/// Directory entries are listed sorted by name, so discovery order does not
/// depend on the platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        Ok(std::path::absolute(path)?)
    }

    fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        std::fs::write(path, contents).map_err(|e| Error::ReportWrite {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}

/// Whether `path` has a suite file extension
pub fn is_suite_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUITE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolve `paths` into the ordered list of suite files
///
/// Missing paths are reported through `on_missing` and skipped. An empty
/// result is an error: there is nothing to schedule.
pub fn resolve<P: AsRef<Path>>(
    fs: &dyn FileSystem,
    paths: &[P],
    mut on_missing: impl FnMut(&Path),
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !fs.exists(path) {
            tracing::warn!(path = %path.display(), "Path does not exist");
            on_missing(path);
            continue;
        }
        if fs.is_dir(path) {
            find_suite_files(fs, path, &mut files)?;
        } else if fs.is_file(path) {
            files.push(path.to_path_buf());
        }
    }

    if files.is_empty() {
        return Err(Error::no_tests_found(paths));
    }

    tracing::info!(count = files.len(), "Discovered suite files");
    Ok(files)
}

fn find_suite_files(fs: &dyn FileSystem, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for name in fs.list(dir)? {
        if name == "." || name == ".." {
            continue;
        }
        let entry = fs.absolute(&dir.join(&name))?;
        if fs.is_dir(&entry) {
            find_suite_files(fs, &entry, files)?;
        } else if fs.is_file(&entry) && is_suite_file(&entry) {
            files.push(entry);
        }
    }
    Ok(())
}
