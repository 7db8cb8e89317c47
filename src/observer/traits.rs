use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::types::Operation;

/// Observer rings with semantic meaning, executed in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ObserverRing {
    DataPreparation = 0,    // Normalize input, load existing data
    InputValidation = 1,    // Schema validation, required fields
    Security = 2,           // Access control, soft delete protection
    Business = 3,           // Domain rules, workflows
    Enrichment = 4,         // Computed fields, defaults
    Database = 5,           // Persistence capability executes here
    PostDatabase = 6,       // Immediate processing after persistence
    Audit = 7,              // Change tracking, compliance logging
    Integration = 8,        // External APIs, webhooks, cache invalidation
    Notification = 9,       // User notifications, real-time updates
}

impl ObserverRing {
    pub const ALL: [ObserverRing; 10] = [
        ObserverRing::DataPreparation,
        ObserverRing::InputValidation,
        ObserverRing::Security,
        ObserverRing::Business,
        ObserverRing::Enrichment,
        ObserverRing::Database,
        ObserverRing::PostDatabase,
        ObserverRing::Audit,
        ObserverRing::Integration,
        ObserverRing::Notification,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(n as usize).copied()
    }

    /// Rings that run before persistence and can still abort the run
    pub fn is_pre_database(&self) -> bool {
        *self < ObserverRing::Database
    }

    pub fn is_post_database(&self) -> bool {
        *self > ObserverRing::Database
    }
}

impl fmt::Display for ObserverRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ring {} ({:?})", self.number(), self)
    }
}

/// A unit of logic attached to one ring
///
/// Observers are registered once through an [`ObserverRegistry`](crate::observer::ObserverRegistry)
/// loader and reused across runs, so they must not keep per-run state.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Observer name for logging and error attribution
    fn name(&self) -> &'static str;

    /// Which ring this observer belongs to
    fn ring(&self) -> ObserverRing;

    /// Operations this observer runs for; `None` means every operation
    fn operations(&self) -> Option<&'static [Operation]> {
        None
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        self.operations().map_or(true, |ops| ops.contains(&op))
    }

    /// Execution limit; `None` uses the pipeline's configured default
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_sort_ascending() {
        let mut rings = vec![ObserverRing::Audit, ObserverRing::DataPreparation, ObserverRing::Database];
        rings.sort();
        assert_eq!(rings, vec![ObserverRing::DataPreparation, ObserverRing::Database, ObserverRing::Audit]);
    }

    #[test]
    fn ring_numbers_round_trip() {
        for ring in ObserverRing::ALL {
            assert_eq!(ObserverRing::from_number(ring.number()), Some(ring));
        }
        assert_eq!(ObserverRing::from_number(10), None);
        assert!(ObserverRing::Enrichment.is_pre_database());
        assert!(ObserverRing::PostDatabase.is_post_database());
        assert!(!ObserverRing::Database.is_pre_database());
    }
}
