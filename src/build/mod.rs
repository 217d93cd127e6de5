//! Build pipeline module for cuebuild
//!
//! Turns a source directory plus named overlays into one compiled [`Value`].
//!
//! # Overview
//!
//! The pipeline consists of:
//! - **Projection**: map overlay files into a source table (see [`crate::overlay`])
//! - **Assembly**: combine directory, table and selectors into a [`LoadRequest`]
//! - **Resolution**: load the request and require exactly one instance
//! - **Compilation**: evaluate that instance and require exactly one value
//! - **Wrapping**: hand the value back as a [`Value`]
//!
//! # Example
//!
//! ```ignore
//! use cuebuild::build::{BuildContext, Compiler};
//! use cuebuild::overlay::Overlays;
//! use cuebuild::vfs::DirFs;
//!
//! let overlays = Overlays::new().mount("plan", DirFs::new("deploy/plan"));
//! let value = Compiler::native().build(&BuildContext::background(), "deploy", &overlays, &["./plan"])?;
//! println!("{}", value);
//! ```
//!
//! [`Value`]: crate::value::Value

pub mod compile;
pub mod context;
pub mod observer;
pub mod pipeline;
pub mod request;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testing;

pub use compile::*;
pub use context::*;
pub use observer::*;
pub use pipeline::*;
pub use request::*;
pub use resolve::*;
