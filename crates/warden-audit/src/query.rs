//! Lazy, restartable views over a snapshot of the audit log.

use std::sync::Arc;

use warden_contracts::audit::{AuditEntry, AuditFilter};

/// The result of `AuditLog::query`.
///
/// Holds a snapshot taken when the query was created; later appends are
/// not visible.  Filtering happens while iterating, and `iter()` can be
/// called any number of times, each time starting from the first entry.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    snapshot: Arc<[AuditEntry]>,
    filter: AuditFilter,
}

impl AuditQuery {
    pub(crate) fn new(snapshot: Arc<[AuditEntry]>, filter: AuditFilter) -> Self {
        Self { snapshot, filter }
    }

    /// Matching entries in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> + '_ {
        self.snapshot.iter().filter(|e| self.filter.matches(e))
    }

    pub fn filter(&self) -> &AuditFilter {
        &self.filter
    }

    /// Number of matching entries.  Walks the snapshot.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Collect the matching entries.
    pub fn to_vec(&self) -> Vec<AuditEntry> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a AuditQuery {
    type Item = &'a AuditEntry;
    type IntoIter = Box<dyn Iterator<Item = &'a AuditEntry> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
