mod common;

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use common::{env, record, EndlessChildren, OpeningLedgerEntry, MAX_DEPTH};
use monk_pipeline::observer::codes;
use monk_pipeline::types::Operation;

#[tokio::test]
async fn observer_can_run_a_nested_pipeline() -> Result<()> {
    let env = env(|b| {
        b.register("account", Arc::new(OpeningLedgerEntry));
    });

    let result = env
        .system
        .pipeline()
        .execute(
            &env.system,
            Operation::Create,
            "account",
            vec![record(json!({ "name": "Opened", "balance": 250 }))],
            env.system.selector().as_ref(),
            0,
        )
        .await?;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.metadata["ledger_entries"], json!(1));

    let ledger = env.storage.rows("ledger").await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["amount"], json!(250));
    assert_eq!(ledger[0]["account_id"], result.records[0].working()["id"]);
    Ok(())
}

#[tokio::test]
async fn nested_runs_fail_past_maximum_depth() -> Result<()> {
    let env = env(|b| {
        b.register("node", Arc::new(EndlessChildren));
    });

    let err = env.system.create_all("node", vec![record(json!({ "label": "root" }))]).await.unwrap_err();

    assert_eq!(err.code(), codes::OBSERVER_ERROR);
    assert!(err.to_string().contains("recursion"), "{}", err);
    // Depths 0..=MAX each persisted once before the next level was refused
    assert_eq!(env.storage.rows("node").await.len(), MAX_DEPTH + 1);
    assert_eq!(env.storage.persist_count(), MAX_DEPTH + 1);
    Ok(())
}
