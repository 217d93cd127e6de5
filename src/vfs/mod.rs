//! Virtual filesystems used as build overlays.
//!
//! A [`VirtualFs`] exposes a read-only tree addressed by `/`-free relative paths
//! (the root is the empty path). [`walk_dir`] visits it the same way for every
//! implementation: pre-order, entries sorted by name.

pub mod dir;
pub mod memory;

use std::io;
use std::path::{Path, PathBuf};

pub use dir::DirFs;
pub use memory::MemoryFs;

/// Type of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// Devices, sockets, pipes and anything else
    Other,
}

impl EntryKind {
    /// Whether the entry is a regular file.
    pub fn is_regular(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// An entry returned by [`VirtualFs::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Final path component
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self { name: name.into(), kind }
    }
}

/// A read-only filesystem.
pub trait VirtualFs: Send + Sync {
    /// List the entries of a directory. Order is unspecified.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Read a whole file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Walk every entry below the root of `fs`.
///
/// `visit` receives the path of each entry relative to the root, excluding the root
/// itself. Directories are reported before their children. The first error, either
/// from listing a directory or returned by `visit`, stops the walk; listing errors
/// carry the path of the directory that failed.
pub fn walk_dir<F, E>(fs: &dyn VirtualFs, mut visit: F) -> Result<(), E>
where
    F: FnMut(&Path, &DirEntry) -> Result<(), E>,
    E: From<WalkError>,
{
    walk_inner(fs, Path::new(""), &mut visit)
}

fn walk_inner<F, E>(fs: &dyn VirtualFs, dir: &Path, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&Path, &DirEntry) -> Result<(), E>,
    E: From<WalkError>,
{
    let mut entries = fs
        .read_dir(dir)
        .map_err(|source| WalkError { path: dir.to_path_buf(), source })?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    for entry in entries {
        let path = dir.join(&entry.name);
        visit(&path, &entry)?;
        if entry.kind == EntryKind::Dir {
            walk_inner(fs, &path, visit)?;
        }
    }
    Ok(())
}

/// A directory could not be listed during [`walk_dir`].
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", display_rel(.path))]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

fn display_rel(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_dir_preorder_sorted() {
        let fs = MemoryFs::new()
            .with_file("b.cue", "b: 1")
            .with_file("a/z.cue", "z: 1")
            .with_file("a/y.txt", "y");

        let mut seen = Vec::new();
        walk_dir(&fs, |path, entry| -> Result<(), WalkError> {
            seen.push((path.to_path_buf(), entry.kind));
            Ok(())
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                (PathBuf::from("a"), EntryKind::Dir),
                (PathBuf::from("a/y.txt"), EntryKind::File),
                (PathBuf::from("a/z.cue"), EntryKind::File),
                (PathBuf::from("b.cue"), EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_walk_dir_visitor_error_stops() {
        let fs = MemoryFs::new().with_file("a.cue", "").with_file("b.cue", "");
        let mut count = 0;
        let result = walk_dir(&fs, |_, _| -> Result<(), WalkError> {
            count += 1;
            Err(WalkError { path: PathBuf::from("a.cue"), source: io::Error::other("stop") })
        });
        assert!(result.is_err());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_walk_error_display_root() {
        let err = WalkError { path: PathBuf::new(), source: io::Error::other("gone") };
        assert_eq!(err.to_string(), ".: gone");
    }
}
