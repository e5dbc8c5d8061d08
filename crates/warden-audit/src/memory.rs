//! In-memory implementation of `AuditStore`.
//!
//! `InMemoryAuditStore` is the reference persistence collaborator.  It keeps
//! entries in a `Vec` behind an `RwLock`; appends are trivially atomic per
//! entry.  Nothing survives the process.

use std::sync::{PoisonError, RwLock};

use warden_contracts::{audit::AuditEntry, error::WardenResult};
use warden_core::traits::AuditStore;

#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `entries`, exactly as given.
    ///
    /// Used to reopen a log from previously exported entries.  The entries
    /// are not checked; `AuditLog::verify` reports any damage.
    pub fn with_entries(entries: Vec<AuditEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> WardenResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }

    fn iterate(&self) -> WardenResult<Vec<AuditEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
