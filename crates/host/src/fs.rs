//! Project file system backed by a local directory.
//!
//! `res://` maps onto the configured project root. Paths that would escape
//! the root (`..` components, absolute OS paths) are rejected before any I/O.

use gdpilot_core::error::HostError;
use gdpilot_core::host::{DirEntry, PROJECT_ROOT, ProjectFs};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

pub struct LocalProjectFs {
    root: PathBuf,
    refreshes: AtomicUsize,
}

impl LocalProjectFs {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, HostError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(HostError::InvalidPath(format!(
                "project root '{}' is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// How many times the index was asked to refresh.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Map a project path onto the local disk.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, HostError> {
        let rest = path.strip_prefix(PROJECT_ROOT).unwrap_or(path);
        let rest = rest.replace('\\', "/");

        let mut resolved = self.root.clone();
        for component in Path::new(&rest).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(HostError::InvalidPath(format!("'{path}' escapes the project root")));
                }
            }
        }
        Ok(resolved)
    }
}

impl ProjectFs for LocalProjectFs {
    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, HostError> {
        let dir = self.resolve(path)?;
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }

    fn file_exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn file_size(&self, path: &str) -> Result<u64, HostError> {
        Ok(std::fs::metadata(self.resolve(path)?)?.len())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, HostError> {
        Ok(std::fs::read(self.resolve(path)?)?)
    }

    fn create_dir_all(&self, path: &str) -> Result<(), HostError> {
        Ok(std::fs::create_dir_all(self.resolve(path)?)?)
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), HostError> {
        Ok(std::fs::write(self.resolve(path)?, contents)?)
    }

    fn refresh_index(&self) {
        let n = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(refreshes = n, "Project index refresh requested");
    }
}
