// Ring 7: Audit Logger - one structured audit line per changed record
use async_trait::async_trait;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};

/// Ring 7: logs who changed what after persistence
#[derive(Default)]
pub struct AuditLogger;

#[async_trait]
impl Observer for AuditLogger {
    fn name(&self) -> &'static str {
        "AuditLogger"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Audit
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if !ctx.has_record_changes() {
            ctx.set_metadata("audited_records", 0);
            return Ok(());
        }

        let user = ctx.system.user_id.map(|id| id.to_string()).unwrap_or_else(|| "anonymous".to_string());
        let mut audited = 0;

        for record in &ctx.records {
            let changes = record.changes();
            if changes.is_empty() {
                continue;
            }
            let changed: Vec<&str> = changes.iter().map(|change| change.field.as_str()).collect();

            tracing::info!(
                target: "audit",
                tenant = %ctx.system.tenant,
                user = %user,
                operation = %ctx.operation,
                model = %ctx.model_name(),
                record = record.id().unwrap_or("-"),
                "changed fields: {}",
                changed.join(", ")
            );
            audited += 1;
        }

        ctx.set_metadata("audited_records", audited);
        Ok(())
    }
}
