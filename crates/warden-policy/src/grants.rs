//! Grant store implementations.
//!
//! - `InMemoryGrantStore`: the reference store, loadable from TOML.
//! - `CachedGrantStore`: a bounded read-through cache in front of any
//!   `GrantStore`.  Entries stay cached until `invalidate` or
//!   `invalidate_all` is called, so whoever changes a grant must invalidate
//!   the agent it belongs to after the change is committed.

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        PoisonError, RwLock,
    },
};

use serde::Deserialize;
use tracing::{debug, info};

use warden_contracts::{
    authz::Grant,
    error::{WardenError, WardenResult},
};
use warden_core::traits::GrantStore;

type GrantKey = (String, String);

fn key(agent_id: &str, tool_name: &str) -> GrantKey {
    (agent_id.to_string(), tool_name.to_string())
}

// ── In-memory store ───────────────────────────────────────────────────────────

/// Grants file schema.  Timestamps are RFC 3339 strings.
///
/// ```toml
/// [[grants]]
/// agent_id = "agent-a"
/// tool_name = "exec_command"
/// valid_from = "2026-01-01T00:00:00Z"
/// expires_at = "2026-02-01T00:00:00Z"
/// ```
#[derive(Debug, Deserialize)]
struct GrantFile {
    #[serde(default)]
    grants: Vec<Grant>,
}

/// At most one grant per (agent, tool); a later `grant` replaces the earlier.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    grants: RwLock<HashMap<GrantKey, Grant>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let file: GrantFile = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse grants TOML: {}", e),
        })?;
        Self::from_grants(file.grants)
    }

    /// A store holding `grants`, validated with [`check_grant`].
    pub fn from_grants(grants: impl IntoIterator<Item = Grant>) -> WardenResult<Self> {
        let store = Self::new();
        for grant in grants {
            check_grant(&grant)?;
            store.grant(grant);
        }
        Ok(store)
    }

    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read grants file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Insert or replace the grant for its (agent, tool) pair.
    pub fn grant(&self, grant: Grant) {
        info!(agent_id = %grant.agent_id, tool = %grant.tool_name, "grant stored");
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(&grant.agent_id, &grant.tool_name), grant);
    }

    /// Remove the grant for (agent, tool).  Returns true if one existed.
    pub fn revoke(&self, agent_id: &str, tool_name: &str) -> bool {
        let removed = self
            .grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key(agent_id, tool_name))
            .is_some();
        if removed {
            info!(agent_id = %agent_id, tool = %tool_name, "grant revoked");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.grants.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reject a grant with an empty agent or tool id.
pub fn check_grant(grant: &Grant) -> WardenResult<()> {
    if grant.agent_id.is_empty() || grant.tool_name.is_empty() {
        return Err(WardenError::ConfigError {
            reason: format!(
                "grant for agent '{}' tool '{}' has an empty id",
                grant.agent_id, grant.tool_name
            ),
        });
    }
    Ok(())
}

impl GrantStore for InMemoryGrantStore {
    fn lookup(&self, agent_id: &str, tool_name: &str) -> WardenResult<Option<Grant>> {
        Ok(self
            .grants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key(agent_id, tool_name))
            .cloned())
    }
}

// ── Read-through cache ────────────────────────────────────────────────────────

/// Default number of (agent, tool) lookups a `CachedGrantStore` retains.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Caches lookups from `inner`, including misses.  Failed lookups are not
/// cached.
///
/// Every invalidation bumps a generation counter.  A lookup that raced an
/// invalidation returns what it read but does not cache it, so a grant
/// revoked before `invalidate` can never be re-cached by a lookup that
/// started earlier.  When the cache is full an arbitrary entry is evicted.
#[derive(Debug)]
pub struct CachedGrantStore<S> {
    inner: S,
    cache: RwLock<HashMap<GrantKey, Option<Grant>>>,
    generation: AtomicU64,
    capacity: usize,
}

impl<S: GrantStore> CachedGrantStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// A cache retaining at most `capacity` lookups.  Zero disables caching.
    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached lookup for `agent_id`.
    pub fn invalidate(&self, agent_id: &str) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        let before = cache.len();
        cache.retain(|(agent, _), _| agent != agent_id);
        debug!(agent_id = %agent_id, dropped = before - cache.len(), "grant cache invalidated");
    }

    pub fn invalidate_all(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        cache.clear();
        debug!("grant cache cleared");
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<S: GrantStore> GrantStore for CachedGrantStore<S> {
    fn lookup(&self, agent_id: &str, tool_name: &str) -> WardenResult<Option<Grant>> {
        let k = key(agent_id, tool_name);
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&k)
        {
            return Ok(hit.clone());
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let grant = self.inner.lookup(agent_id, tool_name)?;
        if self.capacity == 0 {
            return Ok(grant);
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(agent_id = %agent_id, tool = %tool_name, "lookup raced an invalidation; not cached");
            return Ok(grant);
        }
        if cache.len() >= self.capacity && !cache.contains_key(&k) {
            if let Some(victim) = cache.keys().next().cloned() {
                cache.remove(&victim);
            }
        }
        cache.insert(k, grant.clone());
        Ok(grant)
    }
}
