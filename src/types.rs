/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A plain record as exchanged with callers and storage: field name -> value
pub type Record = Map<String, Value>;

/// System fields present on every model's records
pub const SYSTEM_FIELDS: &[&str] = &[
    "id",
    "access_read",
    "access_edit",
    "access_full",
    "access_deny",
    "created_at",
    "updated_at",
    "trashed_at",
    "deleted_at",
];

pub fn is_system_field(field: &str) -> bool {
    SYSTEM_FIELDS.contains(&field)
}

/// Mutation operations supported by the observer pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Revert,  // Undo soft-delete by clearing trashed_at timestamp
    Access,  // Rewrite access_* lists without touching user fields
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Update,
        Operation::Delete,
        Operation::Revert,
        Operation::Access,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Revert => "revert",
            Operation::Access => "access",
        }
    }

    /// Every operation except create targets rows that already exist
    pub fn targets_existing(&self) -> bool {
        !matches!(self, Operation::Create)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            "revert" => Ok(Operation::Revert),
            "access" => Ok(Operation::Access),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_parses_case_insensitively() {
        assert_eq!("Create".parse::<Operation>().unwrap(), Operation::Create);
        assert_eq!("access".parse::<Operation>().unwrap(), Operation::Access);
        assert!("select".parse::<Operation>().is_err());
    }

    #[test]
    fn only_create_targets_new_rows() {
        assert!(!Operation::Create.targets_existing());
        for op in &Operation::ALL[1..] {
            assert!(op.targets_existing());
        }
    }
}
