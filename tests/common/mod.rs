#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use monk_pipeline::config::{AppConfig, PipelineConfig};
use monk_pipeline::model::StaticModelRegistry;
use monk_pipeline::observer::{
    register_builtin_observers, ObserverContext, ObserverError, ObserverPipeline, ObserverRegistry,
    ObserverRegistryBuilder, ObserverRing, Observer, ValidationError,
};
use monk_pipeline::storage::MemoryStorage;
use monk_pipeline::types::{Operation, Record};
use monk_pipeline::System;

pub const MAX_DEPTH: usize = 3;

pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record fixtures are JSON objects")
}

pub fn calls(log: &CallLog) -> Vec<&'static str> {
    log.lock().expect("call log poisoned").clone()
}

pub fn models() -> StaticModelRegistry {
    StaticModelRegistry::from_definitions(json!({
        "user": {
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string", "pattern": "^[^@\\s]+@[^@\\s]+\\.[^@\\s]+$" },
                "age": { "type": "integer", "minimum": 0 }
            }
        },
        "account": {
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "balance": { "type": "integer" },
                "status": { "type": "string", "enum": ["open", "closed"], "description": "Account state" }
            }
        },
        "ledger": {
            "type": "object",
            "required": ["account_id", "amount"],
            "properties": {
                "account_id": { "type": "string" },
                "amount": { "type": "integer" }
            }
        },
        "invoice": {
            "type": "object",
            "required": ["amount"],
            "properties": {
                "amount": { "type": "number", "minimum": 0 },
                "due": { "type": "string", "format": "date-time" },
                "issued_on": { "type": "string", "format": "date" }
            }
        },
        "node": {
            "type": "object",
            "properties": { "label": { "type": "string" } }
        }
    }))
    .expect("fixture models parse")
}

pub fn app_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.pipeline = PipelineConfig {
        max_recursion_depth: MAX_DEPTH,
        observer_timeout_ms: 1_000,
        enable_schema_validation: true,
        debug_logging: false,
    };
    config.security.enable_audit_logging = true;
    config
}

pub struct TestEnv {
    pub system: Arc<System>,
    pub storage: Arc<MemoryStorage>,
}

/// Built-in observers plus whatever the test registers
pub fn env(register: impl Fn(&mut ObserverRegistryBuilder)) -> TestEnv {
    let config = app_config();
    let mut builder = ObserverRegistry::builder();
    register_builtin_observers(&mut builder, &config);
    register(&mut builder);

    let storage = Arc::new(MemoryStorage::new());
    let pipeline = Arc::new(ObserverPipeline::new(Arc::new(builder.build()), config.pipeline));
    let system = Arc::new(System::new("test_tenant", Arc::new(models()), Arc::clone(&storage), pipeline));
    TestEnv { system, storage }
}

// ========================================
// Fixture observers
// ========================================

/// Ring 0, user/create: trims and lowercases email
pub struct EmailNormalizer;

#[async_trait]
impl Observer for EmailNormalizer {
    fn name(&self) -> &'static str {
        "EmailNormalizer"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Create])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        for record in ctx.records.iter_mut() {
            let normalized = record.get("email").and_then(Value::as_str).map(|e| e.trim().to_lowercase());
            if let Some(email) = normalized {
                record.set("email", email);
            }
        }
        Ok(())
    }
}

/// Ring 3, account/create: opening balance may not be negative
pub struct StartingBalanceCheck;

#[async_trait]
impl Observer for StartingBalanceCheck {
    fn name(&self) -> &'static str {
        "StartingBalanceCheck"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Create])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let negative: Vec<usize> = ctx
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.get("balance").and_then(Value::as_i64).is_some_and(|b| b < 0))
            .map(|(i, _)| i)
            .collect();

        for index in negative {
            ctx.add_error(
                ValidationError::new("NEGATIVE_STARTING_BALANCE", "Starting balance cannot be negative")
                    .with_field("balance")
                    .at_record(index),
            );
        }
        Ok(())
    }
}

/// Ring 3, account/update: publishes the balance delta for later rings
pub struct BalanceChangeTracker;

#[async_trait]
impl Observer for BalanceChangeTracker {
    fn name(&self) -> &'static str {
        "BalanceChangeTracker"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Update])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let Some(record) = ctx.records.first() else {
            return Ok(());
        };
        if !record.changed("balance") {
            return Ok(());
        }

        let old = record.get_original("balance").and_then(Value::as_i64).unwrap_or(0);
        let new = record.get("balance").and_then(Value::as_i64).unwrap_or(0);
        let change = new - old;

        ctx.set_metadata("balance_change", change);
        ctx.set_metadata("transaction_type", if change < 0 { "debit" } else { "credit" });
        Ok(())
    }
}

/// Returns `Err("boom")`
pub struct Exploding;

#[async_trait]
impl Observer for Exploding {
    fn name(&self) -> &'static str {
        "Exploding"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    async fn execute(&self, _ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        Err(ObserverError::ValidationError("boom".to_string()))
    }
}

/// Logs its name on every invocation
pub struct Recorder {
    pub name: &'static str,
    pub ring: ObserverRing,
    pub operations: Option<&'static [Operation]>,
    pub log: CallLog,
}

impl Recorder {
    pub fn new(name: &'static str, ring: ObserverRing, log: &CallLog) -> Self {
        Self { name, ring, operations: None, log: Arc::clone(log) }
    }
}

#[async_trait]
impl Observer for Recorder {
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
        self.log.lock().expect("call log poisoned").push(self.name);
        Ok(())
    }
}

/// Ring 6, account/create: writes an opening ledger entry through a nested run
pub struct OpeningLedgerEntry;

#[async_trait]
impl Observer for OpeningLedgerEntry {
    fn name(&self) -> &'static str {
        "OpeningLedgerEntry"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Create])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let entries: Vec<Record> = ctx
            .records
            .iter()
            .map(|account| {
                record(json!({
                    "account_id": account.id().unwrap_or_default(),
                    "amount": account.get("balance").cloned().unwrap_or(json!(0)),
                }))
            })
            .collect();

        let created = ctx.run_nested(Operation::Create, "ledger", entries).await?;
        ctx.set_metadata("ledger_entries", created.len());
        Ok(())
    }
}

/// Ring 6, node/create: creates a child node, forever
pub struct EndlessChildren;

#[async_trait]
impl Observer for EndlessChildren {
    fn name(&self) -> &'static str {
        "EndlessChildren"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let child = record(json!({ "label": format!("depth {}", ctx.depth + 1) }));
        ctx.run_nested(Operation::Create, "node", vec![child]).await?;
        Ok(())
    }
}
