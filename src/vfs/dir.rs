//! A real directory exposed as a [`VirtualFs`].

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::{DirEntry, EntryKind, VirtualFs};

/// Read-only view of a directory on disk.
///
/// Symbolic links are reported as [`EntryKind::Symlink`] and never followed.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory this filesystem is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the root, refusing to leave it.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let mut out = self.root.clone();
        for component in path.components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes filesystem root: {}", path.display()),
                    ))
                }
            }
        }
        Ok(out)
    }
}

fn entry_kind(file_type: fs::FileType) -> EntryKind {
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

impl VirtualFs for DirFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(DirEntry::new(name, entry_kind(entry.file_type()?)));
        }
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }
}
