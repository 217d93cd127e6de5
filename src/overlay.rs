//! Overlay projection.
//!
//! Each overlay is a named [`VirtualFs`]. Projection walks every overlay and maps its
//! configuration source files into a single [`SourceTable`] keyed by synthetic path:
//! `src / mount / relative path`. The engine sees those files as if they were on disk.
//!
//! Overlays are processed in the order they were mounted. When two overlays produce
//! the same synthetic path, the [`CollisionPolicy`] decides: with `LastWins` the later
//! mount replaces the earlier file, with `Reject` the build fails.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::{BuildOptions, CollisionPolicy};
use crate::error::BuildError;
use crate::vfs::{walk_dir, VirtualFs, WalkError};

/// One named overlay.
#[derive(Clone)]
pub struct Overlay {
    name: String,
    fs: Arc<dyn VirtualFs>,
}

impl Overlay {
    /// Mount label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem mounted under the label.
    pub fn fs(&self) -> &dyn VirtualFs {
        self.fs.as_ref()
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Ordered set of overlays for one build.
///
/// ```
/// use cuebuild::overlay::Overlays;
/// use cuebuild::vfs::MemoryFs;
///
/// let overlays = Overlays::new()
///     .mount("base", MemoryFs::new().with_file("a.cue", "a: 1"))
///     .mount("env", MemoryFs::new().with_file("b.cue", "b: 2"));
/// assert_eq!(overlays.names().collect::<Vec<_>>(), ["base", "env"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Overlays {
    entries: Vec<Overlay>,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an overlay. Later mounts take precedence on collision.
    pub fn mount(mut self, name: impl Into<String>, fs: impl VirtualFs + 'static) -> Self {
        self.push(name, Arc::new(fs));
        self
    }

    /// Append a shared overlay.
    pub fn push(&mut self, name: impl Into<String>, fs: Arc<dyn VirtualFs>) {
        self.entries.push(Overlay { name: name.into(), fs });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mount labels in processing order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|o| o.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.entries.iter()
    }
}

/// File content projected from an overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Mount label of the overlay the file came from
    pub overlay: String,
    /// Full file content
    pub contents: Vec<u8>,
}

/// Synthetic path to file content, ready for the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    files: BTreeMap<PathBuf, Source>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, returning the source it replaced.
    pub fn insert(&mut self, path: PathBuf, source: Source) -> Option<Source> {
        self.files.insert(path, source)
    }

    pub fn get(&self, path: &Path) -> Option<&Source> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Source)> {
        self.files.iter().map(|(p, s)| (p.as_path(), s))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}

/// A synthetic path claimed by more than one overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub path: PathBuf,
    /// Overlay whose file was replaced
    pub replaced: String,
    /// Overlay whose file is kept
    pub winner: String,
}

/// Result of projecting overlays.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub table: SourceTable,
    /// Collisions resolved by last-wins, in processing order
    pub collisions: Vec<Collision>,
}

/// Join path components the way a slash-separated path join cleans them.
///
/// `.` and empty components vanish, `..` removes the previous component, and a
/// rooted component does not discard what came before it. Leading `..` components
/// that would climb above `base` are kept.
pub fn clean_join(base: &Path, parts: &[&Path]) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in base.components() {
        match component {
            Component::Normal(_) => {
                out.push(component);
                depth += 1;
            }
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => out.push(component),
        }
    }
    for part in parts {
        for component in part.components() {
            match component {
                Component::Normal(name) => {
                    out.push(name);
                    depth += 1;
                }
                Component::ParentDir => {
                    if depth > 0 {
                        out.pop();
                        depth -= 1;
                    } else if !out.has_root() {
                        out.push("..");
                    }
                }
                _ => {}
            }
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Read every source file of one overlay.
///
/// Returns `(synthetic path, content)` pairs in walk order. Errors carry the mount
/// label joined with the overlay-relative path of the failing entry.
fn collect_overlay(
    src: &Path,
    overlay: &Overlay,
    options: &BuildOptions,
) -> Result<Vec<(PathBuf, Vec<u8>)>, BuildError> {
    let mount = Path::new(&overlay.name);
    let mut files = Vec::new();

    walk_dir(overlay.fs(), |rel, entry| -> Result<(), WalkError> {
        if !entry.kind.is_regular() || !options.matches_extension(&entry.name) {
            return Ok(());
        }
        let contents = overlay
            .fs()
            .read_file(rel)
            .map_err(|source| WalkError { path: rel.to_path_buf(), source })?;
        files.push((clean_join(src, &[mount, rel]), contents));
        Ok(())
    })
    .map_err(|err| BuildError::Overlay { path: clean_join(mount, &[&err.path]), source: err.source })?;

    Ok(files)
}

/// Map every overlay into a single source table rooted under `src`.
///
/// Only regular files with the configured extension are read. Any listing or read
/// failure aborts projection and no table is returned.
pub fn project_overlays(
    src: &Path,
    overlays: &Overlays,
    options: &BuildOptions,
) -> Result<Projection, BuildError> {
    let per_overlay: Vec<Vec<(PathBuf, Vec<u8>)>> = if options.parallel_overlays {
        overlays
            .entries
            .par_iter()
            .map(|overlay| collect_overlay(src, overlay, options))
            .collect::<Result<_, _>>()?
    } else {
        overlays
            .entries
            .iter()
            .map(|overlay| collect_overlay(src, overlay, options))
            .collect::<Result<_, _>>()?
    };

    // Merge in mount order.
    let mut projection = Projection::default();
    for (overlay, files) in overlays.entries.iter().zip(per_overlay) {
        for (path, contents) in files {
            let source = Source { overlay: overlay.name.clone(), contents };
            if let Some(previous) = projection.table.get(&path) {
                if options.collisions == CollisionPolicy::Reject {
                    return Err(BuildError::OverlayCollision {
                        path,
                        first: previous.overlay.clone(),
                        second: overlay.name.clone(),
                    });
                }
                projection.collisions.push(Collision {
                    path: path.clone(),
                    replaced: previous.overlay.clone(),
                    winner: overlay.name.clone(),
                });
            }
            projection.table.insert(path, source);
        }
    }

    Ok(projection)
}
