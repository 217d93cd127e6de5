//! cuebuild - Build one compiled configuration value from a source tree and overlays
//!
//! This library provides functionality to:
//! - Project named virtual filesystems onto a source directory
//! - Resolve selectors to exactly one load instance
//! - Compile that instance into a single [`Value`]
//! - Report failures as typed [`BuildError`]s and progress as [`BuildEvent`]s

pub mod build;
pub mod config;
pub mod engine;
pub mod error;
pub mod overlay;
pub mod value;
pub mod vfs;

pub use build::{BuildContext, BuildEvent, BuildObserver, Compiler};
pub use config::{BuildOptions, CollisionPolicy};
pub use error::{BuildError, ErrorKind};
pub use overlay::Overlays;
pub use value::{Node, Value};
pub use vfs::{DirFs, MemoryFs};
