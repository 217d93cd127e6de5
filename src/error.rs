//! Build error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::build::Stage;
use crate::config::ConfigValidationError;
use crate::engine::EngineError;

/// Broad category of a [`BuildError`], for callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reading or merging an overlay failed
    OverlayIo,
    /// Selector arguments did not resolve to exactly one package
    SelectionAmbiguity,
    /// The engine could not load the selected package
    Load,
    /// The engine could not evaluate the loaded package
    Compile,
    /// The engine broke the one-value-per-instance contract
    Internal,
    /// The build options cannot be used
    Options,
    /// The caller cancelled the build
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::OverlayIo => "overlay_io",
            ErrorKind::SelectionAmbiguity => "selection_ambiguity",
            ErrorKind::Load => "load",
            ErrorKind::Compile => "compile",
            ErrorKind::Internal => "internal",
            ErrorKind::Options => "options",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Error returned by [`Compiler::build`](crate::build::Compiler::build).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// An overlay entry could not be listed or read
    #[error("{}: {source}", .path.display())]
    Overlay {
        /// Mount label joined with the entry's path inside the overlay
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Two overlays project onto the same path under the `reject` policy
    #[error("overlay collision at {}: mounted by both '{first}' and '{second}'", .path.display())]
    OverlayCollision { path: PathBuf, first: String, second: String },
    /// Zero or several load instances
    #[error("only one package is supported at a time (selected {count})")]
    AmbiguousPackage { count: usize },
    /// Engine-reported load failure
    #[error("{0}")]
    Load(#[source] EngineError),
    /// Engine-reported evaluation failure
    #[error("{0}")]
    Compile(#[source] EngineError),
    /// One valid instance did not evaluate to exactly one value
    #[error("internal: wrong number of values ({count})")]
    Internal { count: usize },
    /// Build options failed validation before any stage ran
    #[error("invalid build options: {}", describe_options(.0))]
    InvalidOptions(Vec<ConfigValidationError>),
    #[error("build cancelled")]
    Cancelled,
}

fn describe_options(errors: &[ConfigValidationError]) -> String {
    errors.iter().map(|e| format!("'{}' {}", e.field, e.message)).collect::<Vec<_>>().join("; ")
}

impl BuildError {
    /// Wrap an engine error raised while running `stage`.
    pub fn from_engine(stage: Stage, err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => BuildError::Cancelled,
            err if stage == Stage::ResolveInstance => BuildError::Load(err),
            err => BuildError::Compile(err),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Overlay { .. } | BuildError::OverlayCollision { .. } => ErrorKind::OverlayIo,
            BuildError::AmbiguousPackage { .. } => ErrorKind::SelectionAmbiguity,
            BuildError::Load(_) => ErrorKind::Load,
            BuildError::Compile(_) => ErrorKind::Compile,
            BuildError::Internal { .. } => ErrorKind::Internal,
            BuildError::InvalidOptions(_) => ErrorKind::Options,
            BuildError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Engine error carried by load and compile failures.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            BuildError::Load(e) | BuildError::Compile(e) => Some(e),
            _ => None,
        }
    }
}
