// Ring 4: Timestamp Enricher - stamps ids and timestamps before persistence
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

/// Ring 4: `id`/`created_at`/`updated_at` on create, `updated_at` on update
#[derive(Default)]
pub struct TimestampEnricher;

#[async_trait]
impl Observer for TimestampEnricher {
    fn name(&self) -> &'static str {
        "TimestampEnricher"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Create, Operation::Update])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let now = Value::String(Utc::now().to_rfc3339());

        for record in ctx.records.iter_mut() {
            if ctx.operation == Operation::Create {
                if record.id().is_none() {
                    record.set("id", Uuid::new_v4().to_string());
                }
                record.set("created_at", now.clone());
            }
            record.set("updated_at", now.clone());
        }

        tracing::trace!("Stamped {} record(s) at {}", ctx.records.len(), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::observer::model_record::ModelRecord;
    use crate::testing::{context, record};
    use serde_json::json;

    #[tokio::test]
    async fn create_gets_id_and_both_timestamps() {
        let records = vec![
            ModelRecord::new(record(json!({ "name": "a" }))),
            ModelRecord::new(record(json!({ "id": "keep", "name": "b" }))),
        ];
        let mut ctx = context(Operation::Create, Model::new("user"), records);
        TimestampEnricher.execute(&mut ctx).await.unwrap();

        assert!(ctx.records[0].id().is_some_and(|id| Uuid::parse_str(id).is_ok()));
        assert_eq!(ctx.records[1].id(), Some("keep"));
        assert_eq!(ctx.records[0].get("created_at"), ctx.records[0].get("updated_at"));
    }

    #[tokio::test]
    async fn update_only_touches_updated_at() {
        let records = vec![ModelRecord::new(record(json!({ "id": "u1" })))];
        let mut ctx = context(Operation::Update, Model::new("user"), records);
        TimestampEnricher.execute(&mut ctx).await.unwrap();

        assert!(ctx.records[0].has("updated_at"));
        assert!(!ctx.records[0].has("created_at"));
    }
}
