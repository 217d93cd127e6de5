//! Configuration module for cuebuild
//!
//! Provides types and parsing for `cuebuild.toml` build options.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
