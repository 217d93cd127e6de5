//! Instance resolution.

use crate::build::{BuildContext, LoadRequest, Stage};
use crate::engine::{Engine, LoadInstance};
use crate::error::BuildError;

/// Load the request and require exactly one error-free instance.
///
/// Any other instance count is a selection problem: builds handle a single package.
pub fn resolve_instance<E: Engine>(
    engine: &E,
    ctx: &BuildContext,
    request: &LoadRequest,
) -> Result<E::Instance, BuildError> {
    let mut instances = engine
        .load(ctx, request)
        .map_err(|e| BuildError::from_engine(Stage::ResolveInstance, e))?;

    if instances.len() != 1 {
        return Err(BuildError::AmbiguousPackage { count: instances.len() });
    }
    for instance in &instances {
        if let Some(err) = instance.err() {
            return Err(BuildError::from_engine(Stage::ResolveInstance, err.clone()));
        }
    }

    Ok(instances.remove(0))
}
