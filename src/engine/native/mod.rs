//! The built-in configuration engine.
//!
//! Understands a small declarative subset: a package clause, imports (which never
//! resolve), fields, structs, lists, scalars, type keywords and unification with `&`.
//! References, disjunctions and defaults are not supported.

mod eval;
pub mod lexer;
mod loader;
pub mod parser;

pub use loader::{NativeInstance, ANONYMOUS_PACKAGE};

use crate::build::{BuildContext, LoadRequest};
use crate::engine::{CompiledValue, Engine, EngineError, LoadInstance};
use crate::value::Node;

/// Engine evaluating the built-in configuration subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Result of evaluating one [`NativeInstance`].
#[derive(Debug, Clone)]
pub struct NativeValue {
    package: String,
    node: Node,
    err: Option<EngineError>,
}

impl CompiledValue for NativeValue {
    fn err(&self) -> Option<&EngineError> {
        self.err.as_ref()
    }

    fn package(&self) -> &str {
        &self.package
    }

    fn into_node(self) -> Node {
        self.node
    }
}

impl Engine for NativeEngine {
    type Instance = NativeInstance;
    type Output = NativeValue;

    fn load(
        &self,
        ctx: &BuildContext,
        request: &LoadRequest,
    ) -> Result<Vec<NativeInstance>, EngineError> {
        loader::load_instances(ctx, request)
    }

    fn build(
        &self,
        ctx: &BuildContext,
        instances: Vec<NativeInstance>,
    ) -> Result<Vec<NativeValue>, EngineError> {
        let mut values = Vec::with_capacity(instances.len());
        for instance in instances {
            if ctx.is_done() {
                return Err(EngineError::Cancelled);
            }
            // An instance that failed to load yields a value carrying the same error.
            if let Some(err) = instance.err() {
                values.push(NativeValue {
                    package: instance.package().to_string(),
                    node: Node::empty_struct(),
                    err: Some(err.clone()),
                });
                continue;
            }

            let (package, files, _) = instance.into_parts();
            let value = match eval::evaluate(&files) {
                Ok(node) => NativeValue { package, node, err: None },
                Err(diagnostics) => NativeValue {
                    package,
                    node: Node::empty_struct(),
                    err: Some(EngineError::Diagnostics(diagnostics)),
                },
            };
            values.push(value);
        }
        Ok(values)
    }
}
