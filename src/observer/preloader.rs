// Batched preload of original record state for non-create operations
use serde_json::json;
use std::collections::{HashMap, HashSet};

use crate::filter::FilterData;
use crate::model::Model;
use crate::observer::context::PreloadStats;
use crate::observer::model_record::ModelRecord;
use crate::storage::{RecordSelect, SelectOptions, StorageError};
use crate::types::{Operation, Record};

pub struct Preloader;

impl Preloader {
    /// Distinct record ids in batch order
    pub fn collect_ids(records: &[ModelRecord]) -> Vec<String> {
        let mut seen = HashSet::new();
        records
            .iter()
            .filter_map(|record| record.id())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    /// Issue one lookup for every id in the batch and attach the matching rows
    /// as originals. Trashed rows are included so revert can see them.
    pub async fn preload(
        select: &dyn RecordSelect,
        model: &Model,
        operation: Operation,
        records: &mut [ModelRecord],
    ) -> Result<PreloadStats, StorageError> {
        if !operation.targets_existing() {
            return Ok(PreloadStats::default());
        }

        let ids = Self::collect_ids(records);
        if ids.is_empty() {
            tracing::debug!("No record ids to preload for {} on {}", operation, model.name);
            return Ok(PreloadStats::default());
        }

        let filter = FilterData::with_where(json!({ "id": { "$in": ids } }));
        let options = SelectOptions { include_trashed: true, include_deleted: false };
        let rows = select.select(&model.name, filter, options).await?;

        let rows_by_id: HashMap<String, Record> = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").and_then(|v| v.as_str())?.to_string();
                Some((id, row))
            })
            .collect();

        let mut found_count = 0;
        for record in records.iter_mut() {
            let original = record.id().and_then(|id| rows_by_id.get(id)).cloned();
            if let Some(original) = original {
                record.load_original(original);
                found_count += 1;
            }
        }

        tracing::debug!(
            "Preloaded {}/{} original records for {} on {}",
            found_count, records.len(), operation, model.name
        );

        Ok(PreloadStats {
            requested_count: ids.len(),
            found_count,
        })
    }
}
