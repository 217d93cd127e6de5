//! In-memory filesystem.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::{DirEntry, EntryKind, VirtualFs};

#[derive(Debug, Clone)]
enum MemEntry {
    Dir,
    File(Vec<u8>),
    Symlink,
    Other,
    /// Listed as a file, fails on read
    Unreadable(String),
}

impl MemEntry {
    fn kind(&self) -> EntryKind {
        match self {
            MemEntry::Dir => EntryKind::Dir,
            MemEntry::File(_) | MemEntry::Unreadable(_) => EntryKind::File,
            MemEntry::Symlink => EntryKind::Symlink,
            MemEntry::Other => EntryKind::Other,
        }
    }
}

/// A filesystem held entirely in memory.
///
/// Parent directories are created implicitly when an entry is added.
///
/// ```
/// use cuebuild::vfs::{MemoryFs, VirtualFs};
/// use std::path::Path;
///
/// let fs = MemoryFs::new().with_file("env/prod.cue", "replicas: 3");
/// assert_eq!(fs.read_file(Path::new("env/prod.cue")).unwrap(), b"replicas: 3");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    entries: BTreeMap<PathBuf, MemEntry>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path.as_ref(), MemEntry::File(contents.into()));
        self
    }

    /// Add an empty directory.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemEntry::Dir);
        self
    }

    /// Add a symbolic link. Links are never followed.
    pub fn with_symlink(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemEntry::Symlink);
        self
    }

    /// Add an irregular entry such as a device or socket.
    pub fn with_irregular(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemEntry::Other);
        self
    }

    /// Add a regular file whose reads fail with `message`.
    pub fn with_unreadable(mut self, path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        self.insert(path.as_ref(), MemEntry::Unreadable(message.into()));
        self
    }

    /// Add or replace a file in place.
    pub fn insert_file(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        self.insert(path.as_ref(), MemEntry::File(contents.into()));
    }

    /// Number of regular files.
    pub fn file_count(&self) -> usize {
        self.entries.values().filter(|e| matches!(e, MemEntry::File(_))).count()
    }

    fn insert(&mut self, path: &Path, entry: MemEntry) {
        let path = normalize(path);
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.entries.entry(dir.to_path_buf()).or_insert(MemEntry::Dir);
            parent = dir.parent();
        }
        self.entries.insert(path, entry);
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.as_os_str().is_empty() || matches!(self.entries.get(path), Some(MemEntry::Dir))
    }
}

/// Strip root, `.` and `..` components so every path is relative to the fs root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            _ => {}
        }
    }
    out
}

impl VirtualFs for MemoryFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let path = normalize(path);
        if !self.is_dir(&path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a directory"));
        }
        Ok(self
            .entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path.as_path()))
            .filter_map(|(p, e)| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                Some(DirEntry::new(name, e.kind()))
            })
            .collect())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.entries.get(&normalize(path)) {
            Some(MemEntry::File(data)) => Ok(data.clone()),
            Some(MemEntry::Unreadable(message)) => Err(io::Error::other(message.clone())),
            Some(MemEntry::Dir) => Err(io::Error::other("is a directory")),
            Some(_) => Err(io::Error::other("not a regular file")),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "file does not exist")),
        }
    }
}
