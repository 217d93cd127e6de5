//! Instance compilation.

use crate::build::{BuildContext, Stage};
use crate::engine::{CompiledValue, Engine};
use crate::error::BuildError;

/// Evaluate one validated instance and require exactly one error-free value.
///
/// Value errors are checked before the count. A count other than one is
/// [`BuildError::Internal`].
pub fn compile_instance<E: Engine>(
    engine: &E,
    ctx: &BuildContext,
    instance: E::Instance,
) -> Result<E::Output, BuildError> {
    let mut values = engine
        .build(ctx, vec![instance])
        .map_err(|e| BuildError::from_engine(Stage::CompileValue, e))?;

    for value in &values {
        if let Some(err) = value.err() {
            return Err(BuildError::from_engine(Stage::CompileValue, err.clone()));
        }
    }
    if values.len() != 1 {
        return Err(BuildError::Internal { count: values.len() });
    }

    Ok(values.remove(0))
}
