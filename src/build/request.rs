//! Load request assembly.

use std::path::{Path, PathBuf};

use crate::overlay::SourceTable;

/// Everything the engine needs to resolve instances for one build.
///
/// Built once by [`assemble_request`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    dir: PathBuf,
    overlay: SourceTable,
    args: Vec<String>,
    extension: String,
}

impl LoadRequest {
    /// Source directory selectors are resolved against.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Projected overlay files, keyed by synthetic path.
    pub fn overlay(&self) -> &SourceTable {
        &self.overlay
    }

    /// Selector arguments as given by the caller.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Extension of configuration source files, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Combine the source directory, projected overlays and selectors into a request.
pub fn assemble_request<S: AsRef<str>>(
    dir: &Path,
    overlay: SourceTable,
    args: &[S],
    extension: &str,
) -> LoadRequest {
    LoadRequest {
        dir: dir.to_path_buf(),
        overlay,
        args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        extension: extension.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_request_copies_inputs() {
        let req = assemble_request(Path::new("/src"), SourceTable::new(), &["./...", "."], "cue");
        assert_eq!(req.dir(), Path::new("/src"));
        assert_eq!(req.args(), ["./...", "."]);
        assert_eq!(req.extension(), "cue");
        assert!(req.overlay().is_empty());
    }

    #[test]
    fn test_assemble_request_no_args() {
        let req = assemble_request::<&str>(Path::new("src"), SourceTable::new(), &[], "cue");
        assert!(req.args().is_empty());
    }
}
