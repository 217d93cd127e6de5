//! Configuration engine seam.
//!
//! The build pipeline does not parse or evaluate configuration itself. It hands a
//! [`LoadRequest`] to an [`Engine`], which resolves load instances and evaluates them
//! into compiled values. Everything the pipeline needs from those results is exposed
//! through the [`LoadInstance`] and [`CompiledValue`] traits.
//!
//! [`native::NativeEngine`] is the engine shipped with this crate.

pub mod native;

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build::{BuildContext, LoadRequest};
use crate::value::Node;

pub use native::NativeEngine;

/// Line and column of a diagnostic, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single engine-reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// File the problem was found in, if known
    pub path: Option<PathBuf>,
    /// Location inside `path`, if known
    pub position: Option<Position>,
    /// Human readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with no location.
    pub fn new(message: impl Into<String>) -> Self {
        Self { path: None, position: None, message: message.into() }
    }

    /// Attach the file the diagnostic refers to.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach a line/column position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.position) {
            (Some(path), Some(pos)) => write!(f, "{}:{}: {}", path.display(), pos, self.message),
            (Some(path), None) => write!(f, "{}: {}", path.display(), self.message),
            (None, Some(pos)) => write!(f, "{}: {}", pos, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Error reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// One or more problems with the configuration itself
    #[error("{}", .0.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n"))]
    Diagnostics(Vec<Diagnostic>),
    /// The engine observed a cancelled build context and stopped
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Shorthand for an error carrying exactly one diagnostic.
    pub fn single(diagnostic: Diagnostic) -> Self {
        EngineError::Diagnostics(vec![diagnostic])
    }

    /// Diagnostics carried by this error (empty when cancelled).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            EngineError::Diagnostics(d) => d,
            EngineError::Cancelled => &[],
        }
    }

    /// Whether any diagnostic refers to `path`.
    pub fn mentions(&self, path: &Path) -> bool {
        self.diagnostics().iter().any(|d| d.path.as_deref() == Some(path))
    }
}

/// A resolved unit of work produced by [`Engine::load`].
pub trait LoadInstance {
    /// Load-time error embedded in this instance, if any.
    fn err(&self) -> Option<&EngineError>;

    /// Short description used in events and errors (usually the directory).
    fn display_name(&self) -> String;
}

/// An evaluated package produced by [`Engine::build`].
pub trait CompiledValue {
    /// Evaluation error embedded in this value, if any.
    fn err(&self) -> Option<&EngineError>;

    /// Package name the value was evaluated from.
    fn package(&self) -> &str;

    /// Consume the value, yielding its evaluated tree.
    fn into_node(self) -> Node;
}

/// A configuration language engine.
///
/// Implementations should check `ctx` between units of work. An engine that never
/// does so keeps running after the caller cancels; the pipeline only observes the
/// cancellation once the call returns.
pub trait Engine: Send + Sync {
    type Instance: LoadInstance;
    type Output: CompiledValue;

    /// Resolve the request into load instances.
    ///
    /// Problems with individual instances are embedded in them; `Err` is reserved for
    /// failures of the whole call.
    fn load(
        &self,
        ctx: &BuildContext,
        request: &LoadRequest,
    ) -> Result<Vec<Self::Instance>, EngineError>;

    /// Evaluate load instances into compiled values.
    fn build(
        &self,
        ctx: &BuildContext,
        instances: Vec<Self::Instance>,
    ) -> Result<Vec<Self::Output>, EngineError>;
}
