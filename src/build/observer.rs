//! Build observation.
//!
//! The pipeline reports what it is doing through a [`BuildObserver`] handed to the
//! [`Compiler`](crate::build::Compiler). The pipeline itself never logs; hosts pick
//! an observer that fits their environment.
//!
//! # Example
//!
//! ```ignore
//! use cuebuild::build::{Compiler, TracingObserver};
//!
//! let compiler = Compiler::new(NativeEngine::new()).with_observer(TracingObserver::new());
//! ```

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::build::Stage;
use crate::error::ErrorKind;

/// Events reported during a build.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// A build call started
    BuildStarted {
        /// Source directory
        src: PathBuf,
        /// Overlay mount labels, in processing order
        overlays: Vec<String>,
        /// Selector arguments
        args: Vec<String>,
    },
    /// A pipeline stage finished successfully
    StageCompleted {
        stage: Stage,
        duration: Duration,
    },
    /// A later overlay replaced a file from an earlier one
    OverlayCollision {
        /// Synthetic path both overlays projected to
        path: PathBuf,
        /// Overlay whose file was replaced
        replaced: String,
        /// Overlay whose file was kept
        winner: String,
    },
    /// The selectors resolved to this instance
    InstanceResolved {
        instance: String,
    },
    /// The build failed during `stage`
    BuildFailed {
        stage: Stage,
        kind: ErrorKind,
        message: String,
    },
    /// The build produced a value
    BuildFinished {
        /// Package of the produced value
        package: String,
        duration: Duration,
    },
}

/// Receiver of [`BuildEvent`]s.
pub trait BuildObserver: Send + Sync {
    /// Observe one event.
    fn on_event(&self, event: &BuildEvent);
}

/// An observer that discards all events.
#[derive(Debug, Default)]
pub struct NullObserver;

impl NullObserver {
    pub fn new() -> Self {
        Self
    }
}

impl BuildObserver for NullObserver {
    fn on_event(&self, _event: &BuildEvent) {}
}

/// An observer that keeps every event, mostly for tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<BuildEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far, in order.
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Stages that completed, in order.
    pub fn completed_stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BuildEvent::StageCompleted { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl BuildObserver for RecordingObserver {
    fn on_event(&self, event: &BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards events to the `tracing` facade.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl BuildObserver for TracingObserver {
    fn on_event(&self, event: &BuildEvent) {
        match event {
            BuildEvent::BuildStarted { src, overlays, args } => {
                tracing::debug!(
                    src = %src.display(),
                    overlays = ?overlays,
                    args = ?args,
                    "Build started"
                );
            }
            BuildEvent::StageCompleted { stage, duration } => {
                tracing::debug!(stage = %stage, duration_ms = duration.as_millis() as u64, "Stage completed");
            }
            BuildEvent::OverlayCollision { path, replaced, winner } => {
                tracing::warn!(
                    path = %path.display(),
                    replaced = %replaced,
                    winner = %winner,
                    "Overlay file replaced by later mount"
                );
            }
            BuildEvent::InstanceResolved { instance } => {
                tracing::debug!(instance = %instance, "Instance resolved");
            }
            BuildEvent::BuildFailed { stage, kind, message } => {
                tracing::warn!(stage = %stage, kind = %kind, error = %message, "Build failed");
            }
            BuildEvent::BuildFinished { package, duration } => {
                tracing::info!(
                    package = %package,
                    duration_ms = duration.as_millis() as u64,
                    "Build finished"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_event(&BuildEvent::StageCompleted {
            stage: Stage::ProjectOverlays,
            duration: Duration::ZERO,
        });
        observer.on_event(&BuildEvent::StageCompleted {
            stage: Stage::AssembleRequest,
            duration: Duration::ZERO,
        });
        assert_eq!(
            observer.completed_stages(),
            vec![Stage::ProjectOverlays, Stage::AssembleRequest]
        );
        observer.clear();
        assert!(observer.events().is_empty());
    }

    #[test]
    fn test_null_and_tracing_observers_accept_events() {
        let event = BuildEvent::BuildFailed {
            stage: Stage::ResolveInstance,
            kind: ErrorKind::SelectionAmbiguity,
            message: "only one package is supported at a time".to_string(),
        };
        NullObserver::new().on_event(&event);
        TracingObserver::new().on_event(&event);
    }
}
