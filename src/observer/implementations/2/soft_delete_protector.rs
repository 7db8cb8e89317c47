// Ring 2: Soft Delete Protector - trashed rows are read-only until reverted
use async_trait::async_trait;
use serde_json::Value;

use crate::observer::context::ObserverContext;
use crate::observer::error::{codes, ObserverError, ValidationError};
use crate::observer::model_record::ModelRecord;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

/// Ring 2: blocks changes to trashed rows and reverts of live rows
#[derive(Default)]
pub struct SoftDeleteProtector;

impl SoftDeleteProtector {
    fn is_trashed(record: &ModelRecord) -> bool {
        !matches!(record.get_original("trashed_at"), None | Some(Value::Null))
    }
}

#[async_trait]
impl Observer for SoftDeleteProtector {
    fn name(&self) -> &'static str {
        "SoftDeleteProtector"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Update, Operation::Delete, Operation::Revert, Operation::Access])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let operation = ctx.operation;
        let mut violations = Vec::new();

        for (index, record) in ctx.records.iter().enumerate() {
            if !record.has_original() {
                continue;
            }
            let id = record.id().unwrap_or_default();
            let trashed = Self::is_trashed(record);

            match operation {
                Operation::Revert if !trashed => violations.push(
                    ValidationError::new(codes::RECORD_NOT_TRASHED, format!("Record {} is not trashed", id))
                        .at_record(index),
                ),
                Operation::Revert => {}
                _ if trashed => violations.push(
                    ValidationError::new(
                        codes::RECORD_TRASHED,
                        format!("Record {} is trashed; revert it before {}", id, operation),
                    )
                    .at_record(index),
                ),
                _ => {}
            }
        }

        for violation in violations {
            ctx.add_error(violation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::testing::{context, record};
    use serde_json::json;

    fn preloaded(original: Value) -> ModelRecord {
        let mut wrapped = ModelRecord::new(record(json!({ "id": original["id"].clone() })));
        wrapped.load_original(record(original));
        wrapped
    }

    #[tokio::test]
    async fn update_of_trashed_row_is_rejected() {
        let records = vec![
            preloaded(json!({ "id": "a1", "trashed_at": null })),
            preloaded(json!({ "id": "a2", "trashed_at": "2024-01-01T00:00:00Z" })),
        ];
        let mut ctx = context(Operation::Update, Model::new("account"), records);
        SoftDeleteProtector.execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].code, codes::RECORD_TRASHED);
        assert_eq!(ctx.errors()[0].record_index, Some(1));
    }

    #[tokio::test]
    async fn revert_requires_trashed_row() {
        let records = vec![
            preloaded(json!({ "id": "a1" })),
            preloaded(json!({ "id": "a2", "trashed_at": "2024-01-01T00:00:00Z" })),
        ];
        let mut ctx = context(Operation::Revert, Model::new("account"), records);
        SoftDeleteProtector.execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].code, codes::RECORD_NOT_TRASHED);
        assert_eq!(ctx.errors()[0].record_index, Some(0));
    }
}
