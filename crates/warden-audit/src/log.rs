//! The hash-chained audit log.
//!
//! `AuditLog` is the sole owner of chain state.  All state lives in one
//! `ChainState` behind one `Mutex`, and `append` holds that lock for the
//! whole unit: sequence assignment, hashing, persistence, commit.  Readers
//! take a snapshot under the same lock and do their work outside it.
//!
//! The in-memory entries serve queries.  They are not trusted for
//! verification: `verify` re-reads the store and checks the stored chain
//! against the head this process committed, so edits, truncation or a
//! rehashed rewrite of the persisted entries are all reported.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use warden_contracts::{
    audit::{AuditEntry, AuditFilter, EventType, GENESIS_HASH},
    error::{WardenError, WardenResult},
};
use warden_core::traits::{AuditStore, AuditTrail};

use crate::{
    chain::{hash_entry, verify_chain},
    memory::InMemoryAuditStore,
    query::AuditQuery,
};

// ── Internal mutable state ────────────────────────────────────────────────────

/// The mutable interior of an `AuditLog`.
pub(crate) struct ChainState {
    /// All committed entries, in sequence order.
    entries: Vec<AuditEntry>,

    /// Hash of the last committed entry, or `GENESIS_HASH`.
    head_hash: String,

    /// Timestamp of the last committed entry.
    last_timestamp: Option<DateTime<Utc>>,
}

impl ChainState {
    fn from_entries(entries: Vec<AuditEntry>) -> Self {
        let head_hash = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let last_timestamp = entries.last().map(|e| e.timestamp);
        Self {
            entries,
            head_hash,
            last_timestamp,
        }
    }

    fn next_sequence(&self) -> WardenResult<u64> {
        match self.entries.last() {
            None => Ok(0),
            Some(last) => last
                .sequence
                .checked_add(1)
                .ok_or_else(|| WardenError::IntegrityViolation {
                    sequence: last.sequence,
                    reason: "sequence space exhausted".to_string(),
                }),
        }
    }
}

// ── Public log ────────────────────────────────────────────────────────────────

/// An append-only audit log backed by a SHA-256 hash chain.
///
/// # Thread safety
///
/// `append` is serialized by an internal `Mutex`; no two appends ever read
/// the same predecessor.  `verify` and `query` may run concurrently with
/// appends and see every entry committed before their snapshot.
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    state: Mutex<ChainState>,
}

impl AuditLog {
    /// An empty log over a fresh `InMemoryAuditStore`.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryAuditStore::new()),
            state: Mutex::new(ChainState::from_entries(Vec::new())),
        }
    }

    /// Rebuild a log from everything `store` already holds.
    ///
    /// The stored chain is loaded as-is, even if it is damaged; `verify`
    /// reports the damage and nothing is repaired.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` if the store cannot be read.
    pub fn open(store: Arc<dyn AuditStore>) -> WardenResult<Self> {
        let entries = store.iterate()?;
        info!(entries = entries.len(), "audit log opened");
        Ok(Self {
            store,
            state: Mutex::new(ChainState::from_entries(entries)),
        })
    }

    /// Append one event to the chain and return the committed entry.
    ///
    /// The entry is handed to the store before it is committed in memory.
    /// If the store fails, nothing changes: the next append reuses the same
    /// sequence number and predecessor.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` if the store rejects the entry or the internal
    /// lock is poisoned.
    pub fn append(
        &self,
        event_type: EventType,
        detail: &str,
        agent_id: &str,
        session_key: &str,
        request_id: &str,
    ) -> WardenResult<AuditEntry> {
        let mut state = self.state.lock().map_err(|e| WardenError::PersistenceFailure {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        let sequence = state.next_sequence()?;

        // Wall clocks can step backwards; the chain's timestamps cannot.
        let now = Utc::now();
        let timestamp = match state.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let mut entry = AuditEntry {
            sequence,
            timestamp,
            event_type,
            event_detail: detail.to_string(),
            agent_id: agent_id.to_string(),
            session_key: session_key.to_string(),
            request_id: request_id.to_string(),
            prev_hash: state.head_hash.clone(),
            hash: String::new(),
        };
        entry.hash = hash_entry(&entry);

        if let Err(e) = self.store.append(&entry) {
            error!(
                sequence,
                event_type = %event_type,
                error = %e,
                "audit append failed; chain not advanced"
            );
            return Err(match e {
                WardenError::PersistenceFailure { .. } => e,
                other => WardenError::PersistenceFailure {
                    reason: other.to_string(),
                },
            });
        }

        state.head_hash = entry.hash.clone();
        state.last_timestamp = Some(entry.timestamp);
        state.entries.push(entry.clone());

        debug!(
            sequence,
            event_type = %event_type,
            agent_id = %agent_id,
            request_id = %request_id,
            "audit entry committed"
        );

        Ok(entry)
    }

    /// Re-read the store and recompute the chain from genesis.  True when
    /// it is intact.
    ///
    /// A violation, or a store that cannot be read, is logged as an error on
    /// the `warden::integrity` target.
    pub fn verify(&self) -> bool {
        match self.verify_detailed() {
            Ok(()) => true,
            Err(e) => {
                error!(target: "warden::integrity", error = %e, "audit chain verification failed");
                false
            }
        }
    }

    /// Like `verify`, but returns the first violation found.
    ///
    /// The stored chain must verify on its own and must end at the head this
    /// log committed, with the same number of entries.
    ///
    /// # Errors
    ///
    /// `IntegrityViolation` naming the first broken entry, or
    /// `PersistenceFailure` if the store cannot be read.
    pub fn verify_detailed(&self) -> WardenResult<()> {
        let (stored, committed, head_hash) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (self.store.iterate()?, state.entries.len(), state.head_hash.clone())
        };

        verify_chain(&stored)?;

        if stored.len() != committed {
            return Err(WardenError::IntegrityViolation {
                sequence: stored.len().min(committed) as u64,
                reason: format!(
                    "store holds {} entries but {} were committed",
                    stored.len(),
                    committed
                ),
            });
        }
        let stored_head = stored.last().map_or(GENESIS_HASH, |e| e.hash.as_str());
        if stored_head != head_hash {
            return Err(WardenError::IntegrityViolation {
                sequence: committed.saturating_sub(1) as u64,
                reason: "stored chain does not end at the committed head hash".to_string(),
            });
        }
        Ok(())
    }

    /// Entries matching `filter`, as a lazy view over the current snapshot.
    pub fn query(&self, filter: AuditFilter) -> AuditQuery {
        AuditQuery::new(self.snapshot(), filter)
    }

    /// Every committed entry at this instant.
    pub fn snapshot(&self) -> Arc<[AuditEntry]> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::from(state.entries.as_slice())
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash of the last committed entry, or `GENESIS_HASH` when empty.
    pub fn head_hash(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .head_hash
            .clone()
    }
}

// ── AuditTrail impl ───────────────────────────────────────────────────────────

impl AuditTrail for AuditLog {
    fn append(
        &self,
        event_type: EventType,
        detail: &str,
        agent_id: &str,
        session_key: &str,
        request_id: &str,
    ) -> WardenResult<AuditEntry> {
        AuditLog::append(self, event_type, detail, agent_id, session_key, request_id)
    }

    fn verify_detailed(&self) -> WardenResult<()> {
        AuditLog::verify_detailed(self)
    }

    fn entries(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        self.query(filter.clone()).to_vec()
    }

    fn len(&self) -> usize {
        AuditLog::len(self)
    }

    fn head_hash(&self) -> String {
        AuditLog::head_hash(self)
    }
}
