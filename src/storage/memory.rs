// In-memory storage backend implementing both pipeline capabilities
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecordPersist, RecordSelect, SelectOptions, StorageError};
use crate::filter::{FilterData, FilterWhere};
use crate::model::Model;
use crate::types::{Operation, Record};

const ACCESS_FIELDS: &[&str] = &["access_read", "access_edit", "access_full", "access_deny"];

/// Tables of records keyed by model name, with call counters for instrumentation
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, Vec<Record>>>,
    select_calls: AtomicUsize,
    persist_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, bypassing the pipeline
    pub async fn seed(&self, model: &str, rows: Vec<Record>) {
        let mut tables = self.tables.write().await;
        tables.entry(model.to_string()).or_default().extend(rows);
    }

    /// All rows of a model, trashed ones included
    pub async fn rows(&self, model: &str) -> Vec<Record> {
        self.tables.read().await.get(model).cloned().unwrap_or_default()
    }

    pub async fn find(&self, model: &str, id: &str) -> Option<Record> {
        self.tables
            .read()
            .await
            .get(model)
            .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(id)).cloned())
    }

    pub fn select_count(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn persist_count(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    fn now() -> Value {
        Value::String(Utc::now().to_rfc3339())
    }

    fn insert_row(rows: &mut Vec<Record>, mut record: Record) -> Result<Record, StorageError> {
        let id = match row_id(&record) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        if rows.iter().any(|row| row_id(row) == Some(id.as_str())) {
            return Err(StorageError::Conflict(format!("Record {} already exists", id)));
        }

        let now = Self::now();
        record.insert("id".to_string(), Value::String(id));
        record.entry("created_at").or_insert_with(|| now.clone());
        record.entry("updated_at").or_insert(now);
        record.entry("trashed_at").or_insert(Value::Null);
        record.entry("deleted_at").or_insert(Value::Null);
        for field in ACCESS_FIELDS {
            record.entry(*field).or_insert_with(|| json!([]));
        }

        rows.push(record.clone());
        Ok(record)
    }

    fn locate<'a>(rows: &'a mut [Record], record: &Record) -> Result<&'a mut Record, StorageError> {
        let id = row_id(record).ok_or_else(|| StorageError::QueryError("Record is missing an id".to_string()))?;
        rows.iter_mut()
            .find(|row| row_id(row) == Some(id))
            .ok_or_else(|| StorageError::NotFound(format!("Record {} not found", id)))
    }
}

fn row_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[async_trait]
impl RecordSelect for MemoryStorage {
    async fn select(&self, model: &str, filter: FilterData, options: SelectOptions) -> Result<Vec<Record>, StorageError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(where_clause) = &filter.where_clause {
            FilterWhere::validate(where_clause)?;
        }

        let tables = self.tables.read().await;
        let rows = match tables.get(model) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };

        let mut matched = Vec::new();
        for row in rows {
            if FilterWhere::matches(filter.where_clause.as_ref(), row, &options)? {
                matched.push(row.clone());
            }
        }

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl RecordPersist for MemoryStorage {
    async fn persist(&self, operation: Operation, model: &Model, records: Vec<Record>) -> Result<Vec<Record>, StorageError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().await;

        // Batches apply on a staged copy; the table is replaced only when every record succeeds
        let mut staged = tables.get(&model.name).cloned().unwrap_or_default();
        let rows = &mut staged;

        let mut persisted = Vec::with_capacity(records.len());
        for record in records {
            let row = match operation {
                Operation::Create => Self::insert_row(rows, record)?,
                Operation::Update => {
                    let row = Self::locate(rows, &record)?;
                    for (field, value) in record {
                        if field != "id" {
                            row.insert(field, value);
                        }
                    }
                    row.insert("updated_at".to_string(), Self::now());
                    row.clone()
                }
                Operation::Delete => {
                    let row = Self::locate(rows, &record)?;
                    row.insert("trashed_at".to_string(), Self::now());
                    row.clone()
                }
                Operation::Revert => {
                    let row = Self::locate(rows, &record)?;
                    row.insert("trashed_at".to_string(), Value::Null);
                    row.clone()
                }
                Operation::Access => {
                    let row = Self::locate(rows, &record)?;
                    for field in ACCESS_FIELDS {
                        if let Some(value) = record.get(*field) {
                            row.insert(field.to_string(), value.clone());
                        }
                    }
                    row.clone()
                }
            };
            persisted.push(row);
        }
        tables.insert(model.name.clone(), staged);

        tracing::debug!(
            "MemoryStorage persisted {} {} record(s) for model {}",
            persisted.len(), operation, model.name
        );
        Ok(persisted)
    }
}
