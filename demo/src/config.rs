//! Combined runtime configuration.
//!
//! One TOML file carries the routing table, the tool policy and the initial
//! grants.  Each section is the same schema the owning crate loads on its
//! own; see `config/warden.toml` for an example.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use serde::Deserialize;
use tracing::info;

use warden_audit::AuditLog;
use warden_contracts::{
    authz::{AuthLevel, Grant},
    error::{WardenError, WardenResult},
};
use warden_core::{traits::AuditTrail, Dispatcher, Runtime};
use warden_policy::{check_grant, InMemoryGrantStore, ToolAuthorizationEngine, ToolPolicy};
use warden_routing::{RouteResolver, RuleTable};

use crate::runner::BuiltinRunner;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    #[serde(default)]
    pub routing: RuleTable,

    #[serde(default)]
    pub tools: BTreeMap<String, AuthLevel>,

    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl WardenConfig {
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let config: WardenConfig = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse WARDEN config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> WardenResult<()> {
        self.routing.validate()?;
        self.grants.iter().try_for_each(check_grant)
    }

    /// Wire every component over `audit` and return an uninitialized runtime.
    ///
    /// Grants are served straight from the in-memory store: nothing in this
    /// process mutates them after startup, so there is nothing to cache or
    /// invalidate.
    pub fn build_runtime(&self, audit: Arc<dyn AuditTrail>) -> WardenResult<Runtime> {
        let grants = InMemoryGrantStore::from_grants(self.grants.iter().cloned())?;

        info!(
            routing_rules = self.routing.rule_count(),
            tools = self.tools.len(),
            grants = self.grants.len(),
            "runtime configured"
        );

        Ok(Runtime::new(Dispatcher::new(
            Box::new(RouteResolver::new(self.routing.clone())),
            Box::new(ToolAuthorizationEngine::new(ToolPolicy {
                tools: self.tools.clone(),
            })),
            Arc::new(grants),
            audit,
            Box::new(BuiltinRunner),
        )))
    }

    /// `build_runtime` over a fresh in-memory audit log.
    pub fn build_in_memory(&self) -> WardenResult<Runtime> {
        self.build_runtime(Arc::new(AuditLog::in_memory()))
    }
}
