// Test utilities: recording observers and in-memory systems
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::model::{Model, StaticModelRegistry};
use crate::observer::context::ObserverContext;
use crate::observer::error::{ObserverError, ValidationError, ValidationWarning};
use crate::observer::model_record::ModelRecord;
use crate::observer::pipeline::ObserverPipeline;
use crate::observer::registry::ObserverRegistry;
use crate::observer::traits::{Observer, ObserverRing};
use crate::filter::FilterData;
use crate::storage::{MemoryStorage, RecordPersist, RecordSelect, SelectOptions, StorageError};
use crate::system::System;
use crate::types::{Operation, Record};

/// Shared log of (ring, observer) invocations in call order
pub type CallLog = Arc<Mutex<Vec<(ObserverRing, &'static str)>>>;

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("test record must be a JSON object")
}

/// Limits used by unit tests: short timeout, no debug noise
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        max_recursion_depth: 3,
        observer_timeout_ms: 500,
        enable_schema_validation: true,
        debug_logging: false,
    }
}

pub fn system<S>(registry: ObserverRegistry, models: StaticModelRegistry, storage: Arc<S>) -> Arc<System>
where
    S: RecordSelect + RecordPersist + 'static,
{
    let pipeline = Arc::new(ObserverPipeline::new(Arc::new(registry), test_config()));
    Arc::new(System::new("test_tenant", Arc::new(models), storage, pipeline))
}

/// Standalone context for exercising one observer
pub fn context(operation: Operation, model: Model, records: Vec<ModelRecord>) -> ObserverContext {
    let system = system(
        ObserverRegistry::empty(),
        StaticModelRegistry::new().with_model(model.clone()),
        Arc::new(MemoryStorage::new()),
    );
    ObserverContext::new(system, operation, Arc::new(model), records, 0)
}

pub fn calls(log: &CallLog) -> Vec<(ObserverRing, &'static str)> {
    log.lock().expect("call log poisoned").clone()
}

/// Appends (ring, name) to a shared log whenever it runs
pub struct RecordingObserver {
    name: &'static str,
    ring: ObserverRing,
    operations: Option<&'static [Operation]>,
    log: CallLog,
}

impl RecordingObserver {
    pub fn log() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn new(name: &'static str, ring: ObserverRing, log: &CallLog) -> Self {
        Self {
            name,
            ring,
            operations: None,
            log: Arc::clone(log),
        }
    }

    pub fn arc(name: &'static str, ring: ObserverRing, log: &CallLog) -> Arc<dyn Observer> {
        Arc::new(Self::new(name, ring, log))
    }

    pub fn with_operations(mut self, operations: &'static [Operation]) -> Self {
        self.operations = Some(operations);
        self
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn ring(&self) -> ObserverRing {
        self.ring
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        self.operations
    }

    async fn execute(&self, _ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        self.log.lock().expect("call log poisoned").push((self.ring, self.name));
        Ok(())
    }
}

/// Returns `Err` with a fixed message
pub struct FailingObserver {
    pub name: &'static str,
    pub ring: ObserverRing,
    pub message: &'static str,
}

#[async_trait]
impl Observer for FailingObserver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn ring(&self) -> ObserverRing {
        self.ring
    }

    async fn execute(&self, _ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        Err(ObserverError::ValidationError(self.message.to_string()))
    }
}

pub struct PanickingObserver {
    pub name: &'static str,
    pub ring: ObserverRing,
}

#[async_trait]
impl Observer for PanickingObserver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn ring(&self) -> ObserverRing {
        self.ring
    }

    async fn execute(&self, _ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        panic!("{} exploded", self.name);
    }
}

/// Sleeps past its own timeout
pub struct SlowObserver {
    pub name: &'static str,
    pub ring: ObserverRing,
    pub delay: Duration,
    pub limit: Duration,
}

#[async_trait]
impl Observer for SlowObserver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn ring(&self) -> ObserverRing {
        self.ring
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.limit)
    }

    async fn execute(&self, _ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Pushes one error (or warning) with the given code onto the context
pub struct ReportingObserver {
    pub name: &'static str,
    pub ring: ObserverRing,
    pub code: &'static str,
    pub warning: bool,
}

#[async_trait]
impl Observer for ReportingObserver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn ring(&self) -> ObserverRing {
        self.ring
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if self.warning {
            ctx.add_warning(ValidationWarning::new(self.code, format!("{} reported", self.name)));
        } else {
            ctx.add_error(ValidationError::new(self.code, format!("{} reported", self.name)));
        }
        Ok(())
    }
}

/// Storage whose select and/or persist report the backend as unavailable
///
/// Calls that are not set to fail go to the wrapped [`MemoryStorage`].
#[derive(Debug, Default)]
pub struct UnavailableStorage {
    pub inner: MemoryStorage,
    pub fail_select: bool,
    pub fail_persist: bool,
}

impl UnavailableStorage {
    pub fn failing_select() -> Self {
        Self { fail_select: true, ..Self::default() }
    }

    pub fn failing_persist() -> Self {
        Self { fail_persist: true, ..Self::default() }
    }
}

#[async_trait]
impl RecordSelect for UnavailableStorage {
    async fn select(&self, model: &str, filter: FilterData, options: SelectOptions) -> Result<Vec<Record>, StorageError> {
        if self.fail_select {
            return Err(StorageError::Unavailable(format!("select on {} refused", model)));
        }
        self.inner.select(model, filter, options).await
    }
}

#[async_trait]
impl RecordPersist for UnavailableStorage {
    async fn persist(&self, operation: Operation, model: &Model, records: Vec<Record>) -> Result<Vec<Record>, StorageError> {
        if self.fail_persist {
            return Err(StorageError::Unavailable(format!("{} on {} refused", operation, model.name)));
        }
        self.inner.persist(operation, model, records).await
    }
}
