//! Instance loading.
//!
//! Resolves selector arguments against the files visible to a build: source files on
//! disk below the request directory plus the projected overlay table. Overlay entries
//! shadow disk files at the same path.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::parser::{parse_file, File};
use crate::build::{BuildContext, LoadRequest};
use crate::engine::{Diagnostic, EngineError, LoadInstance};
use crate::overlay::clean_join;

/// Package name used when no file in an instance declares one.
pub const ANONYMOUS_PACKAGE: &str = "_";

/// One package worth of parsed files.
#[derive(Debug, Clone)]
pub struct NativeInstance {
    dir: PathBuf,
    package: String,
    files: Vec<File>,
    err: Option<EngineError>,
}

impl NativeInstance {
    /// Directory the instance was loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Declared package name, `_` if none.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Successfully parsed files, in path order.
    pub fn files(&self) -> &[File] {
        &self.files
    }

    fn failed(dir: PathBuf, diagnostic: Diagnostic) -> Self {
        Self {
            dir,
            package: ANONYMOUS_PACKAGE.to_string(),
            files: Vec::new(),
            err: Some(EngineError::single(diagnostic)),
        }
    }

    pub(crate) fn into_parts(self) -> (String, Vec<File>, Option<EngineError>) {
        (self.package, self.files, self.err)
    }
}

impl LoadInstance for NativeInstance {
    fn err(&self) -> Option<&EngineError> {
        self.err.as_ref()
    }

    fn display_name(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Where a visible file's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Disk,
    Overlay,
}

/// What a selector argument asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Dir(PathBuf),
    Files(Vec<PathBuf>),
}

fn is_source(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.rsplit_once('.'))
        .is_some_and(|(_, ext)| ext == extension)
}

fn parent_dir(path: &Path) -> PathBuf {
    clean_join(path.parent().unwrap_or(Path::new("")), &[])
}

fn is_within(path: &Path, dir: &Path) -> bool {
    if dir == Path::new(".") {
        path.is_relative() && !path.starts_with("..")
    } else {
        path.starts_with(dir)
    }
}

/// Keep the regular files of a disk listing.
///
/// Every entry that could not be read becomes a diagnostic, and any such entry fails
/// the whole listing.
fn collect_disk_files(
    entries: impl IntoIterator<Item = Result<PathBuf, Diagnostic>>,
) -> Result<Vec<PathBuf>, EngineError> {
    let mut files = Vec::new();
    let mut diagnostics = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(clean_join(&path, &[])),
            Ok(_) => {}
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }
    if diagnostics.is_empty() {
        Ok(files)
    } else {
        Err(EngineError::Diagnostics(diagnostics))
    }
}

/// Files under `root` visible to the loader.
fn visible_files(root: &Path, request: &LoadRequest) -> Result<BTreeMap<PathBuf, Origin>, EngineError> {
    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        glob::Pattern::escape(request.extension())
    );
    let entries = glob::glob(&pattern).map_err(|err| {
        EngineError::single(Diagnostic::new(format!("invalid source pattern {}: {}", pattern, err)))
    })?;
    let disk = collect_disk_files(entries.map(|entry| {
        entry.map_err(|err| {
            Diagnostic::new(format!("cannot list directory: {}", err.error())).with_path(err.path())
        })
    }))?;

    let mut files: BTreeMap<PathBuf, Origin> =
        disk.into_iter().map(|path| (path, Origin::Disk)).collect();
    for path in request.overlay().paths() {
        files.insert(clean_join(path, &[]), Origin::Overlay);
    }
    Ok(files)
}

fn resolve_arg(root: &Path, arg: &str) -> PathBuf {
    if Path::new(arg).is_absolute() {
        clean_join(Path::new(arg), &[])
    } else {
        clean_join(root, &[Path::new(arg)])
    }
}

/// Turn selector arguments into selections, in argument order.
fn select(
    root: &Path,
    args: &[String],
    extension: &str,
    visible: &BTreeMap<PathBuf, Origin>,
) -> Vec<Selection> {
    let default = [".".to_string()];
    let args = if args.is_empty() { &default[..] } else { args };

    let mut selections = Vec::new();
    let mut seen_dirs = BTreeSet::new();
    let mut file_group: Option<usize> = None;

    for arg in args {
        if is_source(Path::new(arg), extension) {
            let path = resolve_arg(root, arg);
            match file_group {
                Some(i) => {
                    if let Selection::Files(files) = &mut selections[i] {
                        files.push(path);
                    }
                }
                None => {
                    file_group = Some(selections.len());
                    selections.push(Selection::Files(vec![path]));
                }
            }
        } else if arg == "..." || arg.ends_with("/...") {
            let base = arg.strip_suffix("...").unwrap_or(arg);
            let base = resolve_arg(root, if base.is_empty() { "." } else { base });
            let dirs: BTreeSet<PathBuf> = visible
                .keys()
                .map(|p| parent_dir(p))
                .filter(|d| is_within(d, &base))
                .collect();
            for dir in dirs {
                if seen_dirs.insert(dir.clone()) {
                    selections.push(Selection::Dir(dir));
                }
            }
        } else {
            let dir = resolve_arg(root, arg);
            if seen_dirs.insert(dir.clone()) {
                selections.push(Selection::Dir(dir));
            }
        }
    }
    selections
}

fn read_source(path: &Path, origin: Option<Origin>, request: &LoadRequest) -> Result<String, Diagnostic> {
    let bytes = match (origin, request.overlay().get(path)) {
        (Some(Origin::Overlay), Some(source)) => source.contents.clone(),
        _ => std::fs::read(path).map_err(|e| Diagnostic::new(e.to_string()).with_path(path))?,
    };
    String::from_utf8(bytes).map_err(|_| Diagnostic::new("invalid UTF-8 in source file").with_path(path))
}

/// Parse `paths` into one instance rooted at `dir`.
fn load_instance(
    dir: PathBuf,
    paths: Vec<PathBuf>,
    request: &LoadRequest,
    visible: &BTreeMap<PathBuf, Origin>,
) -> NativeInstance {
    if paths.is_empty() {
        let diagnostic =
            Diagnostic::new(format!("no {} files in {}", request.extension(), dir.display()));
        return NativeInstance::failed(dir, diagnostic);
    }

    let mut diagnostics = Vec::new();
    let mut files = Vec::new();
    for path in &paths {
        match read_source(path, visible.get(path).copied(), request)
            .and_then(|source| parse_file(path, &source))
        {
            Ok(file) => files.push(file),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    let mut package: Option<(&str, &Path)> = None;
    for file in &files {
        let Some((name, pos)) = &file.package else { continue };
        match package {
            None => package = Some((name.as_str(), file.path.as_path())),
            Some((first, first_path)) if first != name.as_str() => {
                diagnostics.push(
                    Diagnostic::new(format!(
                        "found packages {} ({}) and {} ({}) in {}",
                        first,
                        first_path.display(),
                        name,
                        file.path.display(),
                        dir.display()
                    ))
                    .with_path(&file.path)
                    .with_position(*pos),
                );
            }
            Some(_) => {}
        }
    }
    let package = package.map(|(name, _)| name).unwrap_or(ANONYMOUS_PACKAGE).to_string();

    for file in &files {
        for import in &file.imports {
            diagnostics.push(
                Diagnostic::new(format!("cannot find package \"{}\"", import.path))
                    .with_path(&file.path)
                    .with_position(import.pos),
            );
        }
    }

    let err = if diagnostics.is_empty() { None } else { Some(EngineError::Diagnostics(diagnostics)) };
    NativeInstance { dir, package, files, err }
}

/// Resolve a load request into instances.
pub fn load_instances(
    ctx: &BuildContext,
    request: &LoadRequest,
) -> Result<Vec<NativeInstance>, EngineError> {
    if ctx.is_done() {
        return Err(EngineError::Cancelled);
    }

    let root = clean_join(request.dir(), &[]);
    let visible = visible_files(&root, request)?;
    let selections = select(&root, request.args(), request.extension(), &visible);

    let mut instances = Vec::with_capacity(selections.len());
    for selection in selections {
        if ctx.is_done() {
            return Err(EngineError::Cancelled);
        }
        let instance = match selection {
            Selection::Dir(dir) => {
                let paths = visible.keys().filter(|p| parent_dir(p) == dir).cloned().collect();
                load_instance(dir, paths, request, &visible)
            }
            Selection::Files(paths) => {
                let dir = paths.first().map(|p| parent_dir(p)).unwrap_or_else(|| root.clone());
                match paths.iter().find(|p| parent_dir(p) != dir) {
                    Some(stray) => {
                        let diagnostic = Diagnostic::new(format!(
                            "named files must all be in one directory; have {} and {}",
                            dir.display(),
                            parent_dir(stray).display()
                        ));
                        NativeInstance::failed(dir, diagnostic)
                    }
                    None => load_instance(dir, paths, request, &visible),
                }
            }
        };
        tracing::debug!(
            dir = %instance.dir.display(),
            package = %instance.package,
            files = instance.files.len(),
            failed = instance.err.is_some(),
            "Loaded instance"
        );
        instances.push(instance);
    }
    Ok(instances)
}
