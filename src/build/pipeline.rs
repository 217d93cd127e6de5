//! Build pipeline orchestration.
//!
//! A build runs five stages in order and stops at the first failure:
//!
//! ```text
//! ProjectOverlays -> AssembleRequest -> ResolveInstance -> CompileValue -> Wrap
//! ```
//!
//! Nothing is retried. The context is checked before every stage.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::build::{
    assemble_request, compile_instance, resolve_instance, BuildContext, BuildEvent, BuildObserver,
    NullObserver,
};
use crate::config::BuildOptions;
use crate::engine::{Engine, LoadInstance, NativeEngine};
use crate::error::BuildError;
use crate::overlay::{project_overlays, Overlays};
use crate::value::Value;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ProjectOverlays,
    AssembleRequest,
    ResolveInstance,
    CompileValue,
    Wrap,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::ProjectOverlays,
        Stage::AssembleRequest,
        Stage::ResolveInstance,
        Stage::CompileValue,
        Stage::Wrap,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ProjectOverlays => "project-overlays",
            Stage::AssembleRequest => "assemble-request",
            Stage::ResolveInstance => "resolve-instance",
            Stage::CompileValue => "compile-value",
            Stage::Wrap => "wrap",
        };
        f.write_str(name)
    }
}

/// Builds compiled values with one engine and one set of options.
///
/// A compiler holds no per-build state, so one instance can serve concurrent builds
/// from several threads.
///
/// # Example
///
/// ```
/// use cuebuild::build::{BuildContext, Compiler};
/// use cuebuild::overlay::Overlays;
/// use cuebuild::vfs::MemoryFs;
///
/// let overlays = Overlays::new()
///     .mount(".", MemoryFs::new().with_file("app.cue", "package app\nreplicas: 2\n"));
/// let value = Compiler::native()
///     .build(&BuildContext::background(), "/nonexistent-src", &overlays, &["."])
///     .unwrap();
/// assert_eq!(value.package(), "app");
/// ```
pub struct Compiler<E: Engine> {
    engine: E,
    options: BuildOptions,
    observer: Arc<dyn BuildObserver>,
}

impl Compiler<NativeEngine> {
    /// A compiler using the built-in engine and default options.
    pub fn native() -> Self {
        Self::new(NativeEngine::new())
    }
}

impl<E: Engine> Compiler<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, options: BuildOptions::default(), observer: Arc::new(NullObserver) }
    }

    /// Set build options.
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the observer that receives build events.
    pub fn with_observer(self, observer: impl BuildObserver + 'static) -> Self {
        self.with_shared_observer(Arc::new(observer))
    }

    /// Set an observer the caller keeps a handle to.
    pub fn with_shared_observer(mut self, observer: Arc<dyn BuildObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the single package selected by `args` from `src` plus `overlays`.
    ///
    /// Overlay files appear to the engine under `src/<mount label>/`. The call
    /// succeeds only if the selectors resolve to exactly one instance that loads
    /// and evaluates without error. Options are validated before anything runs.
    pub fn build<S: AsRef<str>>(
        &self,
        ctx: &BuildContext,
        src: impl AsRef<Path>,
        overlays: &Overlays,
        args: &[S],
    ) -> Result<Value, BuildError> {
        let errors = self.options.validate();
        if !errors.is_empty() {
            return Err(BuildError::InvalidOptions(errors));
        }

        let src = src.as_ref();
        let start = Instant::now();
        self.observer.on_event(&BuildEvent::BuildStarted {
            src: src.to_path_buf(),
            overlays: overlays.names().map(str::to_string).collect(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        });

        let projection = self.run_stage(ctx, Stage::ProjectOverlays, || {
            project_overlays(src, overlays, &self.options)
        })?;
        for collision in &projection.collisions {
            self.observer.on_event(&BuildEvent::OverlayCollision {
                path: collision.path.clone(),
                replaced: collision.replaced.clone(),
                winner: collision.winner.clone(),
            });
        }

        let request = self.run_stage(ctx, Stage::AssembleRequest, || {
            Ok(assemble_request(src, projection.table, args, &self.options.extension))
        })?;

        let instance = self.run_stage(ctx, Stage::ResolveInstance, || {
            resolve_instance(&self.engine, ctx, &request)
        })?;
        self.observer.on_event(&BuildEvent::InstanceResolved { instance: instance.display_name() });

        let compiled = self.run_stage(ctx, Stage::CompileValue, || {
            compile_instance(&self.engine, ctx, instance)
        })?;

        let value = self.run_stage(ctx, Stage::Wrap, || Ok(Value::wrap(compiled)))?;

        self.observer.on_event(&BuildEvent::BuildFinished {
            package: value.package().to_string(),
            duration: start.elapsed(),
        });
        Ok(value)
    }

    /// Run one stage, reporting its outcome to the observer.
    fn run_stage<T>(
        &self,
        ctx: &BuildContext,
        stage: Stage,
        run: impl FnOnce() -> Result<T, BuildError>,
    ) -> Result<T, BuildError> {
        let start = Instant::now();
        let result = if ctx.is_done() { Err(BuildError::Cancelled) } else { run() };

        match &result {
            Ok(_) => self.observer.on_event(&BuildEvent::StageCompleted {
                stage,
                duration: start.elapsed(),
            }),
            Err(err) => self.observer.on_event(&BuildEvent::BuildFailed {
                stage,
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
        result
    }
}

impl<E: Engine + fmt::Debug> fmt::Debug for Compiler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("engine", &self.engine)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
