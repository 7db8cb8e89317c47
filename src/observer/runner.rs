// Ring scheduler: executes rings 0-9 in order against one shared context
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::error::PipelineError;
use crate::model::Model;
use crate::observer::context::ObserverContext;
use crate::observer::error::{codes, PipelineResult, ValidationError};
use crate::observer::model_record::ModelRecord;
use crate::observer::registry::ObserverRegistry;
use crate::observer::traits::{Observer, ObserverRing};
use crate::system::System;
use crate::types::{Operation, Record};

pub struct ObserverRunner {
    registry: Arc<ObserverRegistry>,
    default_timeout: Duration,
}

impl ObserverRunner {
    pub fn new(registry: Arc<ObserverRegistry>, default_timeout: Duration) -> Self {
        Self { registry, default_timeout }
    }

    pub fn registry(&self) -> &Arc<ObserverRegistry> {
        &self.registry
    }

    /// Run every ring for the batch
    ///
    /// Observer failures are collected into the result; only errors from the
    /// persistence capability come back as `Err`, unchanged.
    pub async fn execute(
        &self,
        system: Arc<System>,
        operation: Operation,
        model: Arc<Model>,
        records: Vec<ModelRecord>,
        depth: usize,
    ) -> Result<PipelineResult, PipelineError> {
        let mut ctx = ObserverContext::new(system, operation, model, records, depth);
        let rings_executed = self.execute_context(&mut ctx).await?;
        Ok(ctx.into_result(rings_executed))
    }

    /// Execute the rings against an existing context, returning the rings that ran
    pub async fn execute_context(&self, ctx: &mut ObserverContext) -> Result<Vec<ObserverRing>, PipelineError> {
        tracing::info!(
            "Observer pipeline starting: operation={}, model={}, records={}, depth={}",
            ctx.operation, ctx.model_name(), ctx.records.len(), ctx.depth
        );

        let mut rings_executed = Vec::with_capacity(ObserverRing::ALL.len());
        let mut database_executed = false;

        for ring in ObserverRing::ALL {
            ctx.current_ring = Some(ring);
            self.execute_ring(ring, ctx).await;

            if ring == ObserverRing::Database && !ctx.has_errors() {
                self.persist(ctx).await?;
                database_executed = true;
            }

            rings_executed.push(ring);

            // Stop before persistence once anything has failed
            if ctx.has_errors() && !database_executed {
                tracing::warn!(
                    "Observer pipeline stopped at {} with {} error(s); persistence skipped",
                    ring, ctx.errors().len()
                );
                break;
            }
        }

        tracing::info!(
            "Observer pipeline finished: operation={}, model={}, success={}, errors={}, warnings={}, elapsed={:?}",
            ctx.operation, ctx.model_name(), !ctx.has_errors(),
            ctx.errors().len(), ctx.warnings().len(), ctx.execution_time()
        );
        Ok(rings_executed)
    }

    /// Execute observers in a specific ring
    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut ObserverContext) {
        let observers = self.registry.observers_for(ctx.model_name(), ring, ctx.operation);
        if observers.is_empty() {
            tracing::trace!("No observers for {} on model {}", ring, ctx.model_name());
            return;
        }

        tracing::debug!("Executing {} with {} observers", ring, observers.len());

        for observer in observers {
            self.execute_observer(observer.as_ref(), ctx).await;
        }
    }

    /// Run one observer, converting failures, panics and timeouts into errors
    async fn execute_observer(&self, observer: &dyn Observer, ctx: &mut ObserverContext) {
        let name = observer.name();
        let limit = observer.timeout().unwrap_or(self.default_timeout);
        let errors_before = ctx.errors().len();
        let warnings_before = ctx.warnings().len();
        let observer_start = Instant::now();

        let outcome = timeout(limit, AssertUnwindSafe(observer.execute(ctx)).catch_unwind()).await;
        let execution_time = observer_start.elapsed();

        ctx.attribute_since(errors_before, warnings_before, name);

        match outcome {
            Ok(Ok(Ok(()))) => {
                tracing::debug!("Observer: {} completed in {:?}", name, execution_time);
            }
            Ok(Ok(Err(error))) => {
                tracing::warn!("Observer: {} failed in {:?}: {}", name, execution_time, error);
                ctx.add_error(
                    ValidationError::new(codes::OBSERVER_ERROR, error.to_string()).with_observer(name),
                );
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Observer: {} panicked: {}", name, message);
                ctx.add_error(ValidationError::new(codes::OBSERVER_ERROR, message).with_observer(name));
            }
            Err(_elapsed) => {
                tracing::error!("Observer: {} timed out after {:?}", name, limit);
                ctx.add_error(
                    ValidationError::new(codes::OBSERVER_TIMEOUT, format!("Observer {} timed out after {:?}", name, limit))
                        .with_observer(name),
                );
            }
        }
    }

    /// Database ring: hand the batch to the persistence capability exactly once
    async fn persist(&self, ctx: &mut ObserverContext) -> Result<(), PipelineError> {
        let records: Vec<Record> = ctx.records.iter().map(|r| r.working().clone()).collect();
        let persister = Arc::clone(ctx.system.persister());

        let rows = persister.persist(ctx.operation, &ctx.model, records).await.map_err(|e| {
            tracing::error!("Persistence failed for {} on {}: {}", ctx.operation, ctx.model_name(), e);
            PipelineError::Storage(e)
        })?;

        // Later rings see persisted state (ids, timestamps)
        if rows.len() == ctx.records.len() {
            for (record, row) in ctx.records.iter_mut().zip(rows.iter()) {
                record.absorb_persisted(row.clone());
            }
        } else {
            tracing::warn!(
                "Persistence returned {} rows for {} records; working state left as-is",
                rows.len(), ctx.records.len()
            );
        }

        tracing::debug!("Persisted {} rows for {} on {}", rows.len(), ctx.operation, ctx.model_name());
        ctx.result = Some(rows);
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "observer panicked".to_string()
    }
}
