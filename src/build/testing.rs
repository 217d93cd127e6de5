//! Scripted engine for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::build::{BuildContext, LoadRequest};
use crate::engine::{CompiledValue, Engine, EngineError, LoadInstance};
use crate::value::Node;

#[derive(Debug, Clone)]
pub(crate) struct FakeInstance {
    err: Option<EngineError>,
}

impl FakeInstance {
    pub(crate) fn ok() -> Self {
        Self { err: None }
    }

    pub(crate) fn failed(err: EngineError) -> Self {
        Self { err: Some(err) }
    }
}

impl LoadInstance for FakeInstance {
    fn err(&self) -> Option<&EngineError> {
        self.err.as_ref()
    }

    fn display_name(&self) -> String {
        "fake".to_string()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeValue {
    node: Node,
    err: Option<EngineError>,
}

impl FakeValue {
    pub(crate) fn ok(node: Node) -> Self {
        Self { node, err: None }
    }

    pub(crate) fn failed(err: EngineError) -> Self {
        Self { node: Node::Null, err: Some(err) }
    }
}

impl CompiledValue for FakeValue {
    fn err(&self) -> Option<&EngineError> {
        self.err.as_ref()
    }

    fn package(&self) -> &str {
        "fake"
    }

    fn into_node(self) -> Node {
        self.node
    }
}

/// Returns the instances and values it was created with.
#[derive(Debug)]
pub(crate) struct FakeEngine {
    instances: Vec<FakeInstance>,
    values: Vec<FakeValue>,
    build_error: Option<EngineError>,
    load_calls: AtomicUsize,
    last_request: Mutex<Option<LoadRequest>>,
}

impl FakeEngine {
    pub(crate) fn new(instances: Vec<FakeInstance>, values: Vec<FakeValue>) -> Self {
        Self {
            instances,
            values,
            build_error: None,
            load_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub(crate) fn with_build_error(mut self, err: EngineError) -> Self {
        self.build_error = Some(err);
        self
    }

    pub(crate) fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<LoadRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

impl Engine for FakeEngine {
    type Instance = FakeInstance;
    type Output = FakeValue;

    fn load(
        &self,
        _ctx: &BuildContext,
        request: &LoadRequest,
    ) -> Result<Vec<FakeInstance>, EngineError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        Ok(self.instances.clone())
    }

    fn build(
        &self,
        _ctx: &BuildContext,
        _instances: Vec<FakeInstance>,
    ) -> Result<Vec<FakeValue>, EngineError> {
        match &self.build_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.values.clone()),
        }
    }
}
