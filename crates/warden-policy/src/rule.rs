//! Tool policy configuration schema.
//!
//! A `ToolPolicy` assigns one `AuthLevel` to each tool name.  A tool that is
//! not listed has no level; the engine treats it as always-denied.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use warden_contracts::{
    authz::AuthLevel,
    error::{WardenError, WardenResult},
};

/// The top-level structure deserialized from a TOML tool policy.
///
/// Example:
/// ```toml
/// [tools]
/// web_search = "always-allowed"
/// exec_command = "requires-grant"
/// delete_file = "always-denied"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPolicy {
    #[serde(default)]
    pub tools: BTreeMap<String, AuthLevel>,
}

impl ToolPolicy {
    /// Parse `s` as TOML.
    ///
    /// Returns `WardenError::ConfigError` if the TOML is malformed or names a
    /// level other than `always-allowed`, `requires-grant`, `always-denied`.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse tool policy TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read tool policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The configured level for `tool_name`, if any.
    pub fn level(&self, tool_name: &str) -> Option<AuthLevel> {
        self.tools.get(tool_name).copied()
    }

    /// Builder-style helper used by tests and embedders.
    pub fn with_tool(mut self, tool_name: impl Into<String>, level: AuthLevel) -> Self {
        self.tools.insert(tool_name.into(), level);
        self
    }
}
