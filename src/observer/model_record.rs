use serde_json::Value;

use crate::types::Record;

/// Information about a specific field change
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<Value>,
    pub new_value: Value,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,    // Field didn't exist in original
    Modified, // Field existed but value changed
}

/// Working/original dual view of one record for the duration of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    /// Current state, visible and mutable to every observer
    working: Record,
    /// Pre-mutation snapshot from storage (None for creates and unmatched ids)
    original: Option<Record>,
}

impl ModelRecord {
    pub fn new(record: Record) -> Self {
        Self {
            working: record,
            original: None,
        }
    }

    /// Record id from the working state, falling back to the original
    pub fn id(&self) -> Option<&str> {
        self.working
            .get("id")
            .or_else(|| self.original.as_ref().and_then(|o| o.get("id")))
            .and_then(Value::as_str)
    }

    /// Attach the preloaded snapshot. Only the first load takes effect.
    pub fn load_original(&mut self, original: Record) -> bool {
        if self.original.is_some() {
            tracing::debug!("Original already loaded for record {:?}, ignoring reload", self.id());
            return false;
        }
        self.original = Some(original);
        true
    }

    pub fn has_original(&self) -> bool {
        self.original.is_some()
    }

    pub fn original(&self) -> Option<&Record> {
        self.original.as_ref()
    }

    pub fn working(&self) -> &Record {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut Record {
        &mut self.working
    }

    /// Current value of a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.working.get(field)
    }

    pub fn get_original(&self, field: &str) -> Option<&Value> {
        self.original.as_ref().and_then(|o| o.get(field))
    }

    pub fn has(&self, field: &str) -> bool {
        self.working.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.working.insert(field.into(), value.into());
        self
    }

    /// Remove a field entirely (omit from persistence); use `set(field, Value::Null)` to store NULL
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.working.remove(field)
    }

    /// Check if a field in the working state differs from the original
    pub fn changed(&self, field: &str) -> bool {
        match self.working.get(field) {
            Some(value) => self.get_original(field) != Some(value),
            None => false,
        }
    }

    /// Working fields whose values differ from the original
    pub fn changes(&self) -> Vec<FieldChange> {
        self.working
            .iter()
            .filter_map(|(field, new_value)| match self.get_original(field) {
                Some(old) if old == new_value => None,
                Some(old) => Some(FieldChange {
                    field: field.clone(),
                    old_value: Some(old.clone()),
                    new_value: new_value.clone(),
                    change_type: ChangeType::Modified,
                }),
                None => Some(FieldChange {
                    field: field.clone(),
                    old_value: None,
                    new_value: new_value.clone(),
                    change_type: ChangeType::Added,
                }),
            })
            .collect()
    }

    /// Original overlaid with the working state: the row as it will look after an update
    pub fn merged(&self) -> Record {
        let mut merged = self.original.clone().unwrap_or_default();
        for (field, value) in &self.working {
            merged.insert(field.clone(), value.clone());
        }
        merged
    }

    /// Fold a persisted row back into the working state
    pub(crate) fn absorb_persisted(&mut self, row: Record) {
        for (field, value) in row {
            self.working.insert(field, value);
        }
    }

    /// Unwrap back into a plain record
    pub fn into_record(self) -> Record {
        self.working
    }
}

impl From<Record> for ModelRecord {
    fn from(record: Record) -> Self {
        Self::new(record)
    }
}
