//! Routing rule table and configuration schema.
//!
//! A `RuleTable` maps each identifier kind to the agent that owns it.  Every
//! table is an exact-key lookup; there is no pattern matching.  The resolver
//! consults the tables in fixed precedence order, not declaration order.
//!
//! Keyed tiers (peer through account) may scope a rule to one channel.  A
//! scoped rule only fires for messages on that channel and takes priority
//! over an unscoped rule for the same identifier within its tier.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use warden_contracts::error::{WardenError, WardenResult};

/// The routing configuration, deserialized from TOML.
///
/// Example:
/// ```toml
/// default_agent = "main"
///
/// [peer]
/// "user-42" = "personal-assistant"
///
/// [peer.telegram]
/// "123456" = "agent-personal"
///
/// [guild]
/// "guild-7" = "community-bot"
///
/// [channel]
/// slack = "work-agent"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTable {
    /// Agent used when no other tier matches.  Without one, an unmatched
    /// context is an `UnresolvedRoute` error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agent: Option<String>,

    #[serde(default)]
    pub peer: TierRules,

    #[serde(default)]
    pub parent_peer: TierRules,

    #[serde(default)]
    pub guild: TierRules,

    #[serde(default)]
    pub team: TierRules,

    #[serde(default)]
    pub account: TierRules,

    /// Channel name → agent.  Applies to every message on that channel that
    /// no narrower tier claimed.
    #[serde(default)]
    pub channel: BTreeMap<String, String>,
}

impl RuleTable {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `WardenError::ConfigError` if the TOML is malformed, has
    /// unknown keys, or names an empty key or agent id.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let table: RuleTable = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse routing TOML: {}", e),
        })?;
        table.validate()?;
        Ok(table)
    }

    /// Read the file at `path` and parse it as a routing table.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read routing file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject entries the resolver could never honour.
    ///
    /// An empty key can never match because empty identifiers are treated
    /// as absent; an empty agent id would produce a route with no owner.
    pub fn validate(&self) -> WardenResult<()> {
        if let Some(agent) = &self.default_agent {
            if agent.is_empty() {
                return Err(WardenError::ConfigError {
                    reason: "default_agent must not be empty".to_string(),
                });
            }
        }

        for (tier, rules) in self.keyed_tiers() {
            check_rules(tier, &rules.any_channel)?;
            for (channel, scoped) in &rules.by_channel {
                if channel.is_empty() {
                    return Err(WardenError::ConfigError {
                        reason: format!("empty channel scope in [{}] routing table", tier),
                    });
                }
                check_rules(&format!("{}.{}", tier, channel), scoped)?;
            }
        }
        check_rules("channel", &self.channel)
    }

    /// Total number of keyed rules, excluding the default.
    pub fn rule_count(&self) -> usize {
        self.keyed_tiers()
            .iter()
            .map(|(_, rules)| rules.len())
            .sum::<usize>()
            + self.channel.len()
    }

    fn keyed_tiers(&self) -> [(&'static str, &TierRules); 5] {
        [
            ("peer", &self.peer),
            ("parent_peer", &self.parent_peer),
            ("guild", &self.guild),
            ("team", &self.team),
            ("account", &self.account),
        ]
    }
}

fn check_rules(tier: &str, rules: &BTreeMap<String, String>) -> WardenResult<()> {
    for (key, agent) in rules {
        if key.is_empty() {
            return Err(WardenError::ConfigError {
                reason: format!("empty key in [{}] routing table", tier),
            });
        }
        if agent.is_empty() {
            return Err(WardenError::ConfigError {
                reason: format!("empty agent id for '{}' in [{}] routing table", key, tier),
            });
        }
    }
    Ok(())
}

// ── Keyed tier ────────────────────────────────────────────────────────────────

/// The rules of one keyed tier.
///
/// In TOML a string value is an unscoped rule and a table value is a channel
/// scope holding rules for that channel only:
///
/// ```toml
/// [peer]
/// "user-42" = "personal-assistant"   # any channel
///
/// [peer.telegram]
/// "123456" = "agent-personal"        # telegram only
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, RuleEntry>", into = "BTreeMap<String, RuleEntry>")]
pub struct TierRules {
    /// Identifier → agent, on every channel.
    pub any_channel: BTreeMap<String, String>,

    /// Channel → identifier → agent.
    pub by_channel: BTreeMap<String, BTreeMap<String, String>>,
}

impl TierRules {
    /// The agent owning `id` on `channel`.  A rule scoped to `channel` wins
    /// over an unscoped one.
    pub fn agent(&self, channel: &str, id: &str) -> Option<&str> {
        self.by_channel
            .get(channel)
            .and_then(|scoped| scoped.get(id))
            .or_else(|| self.any_channel.get(id))
            .map(String::as_str)
    }

    /// Add an unscoped rule.
    pub fn insert(&mut self, id: impl Into<String>, agent: impl Into<String>) {
        self.any_channel.insert(id.into(), agent.into());
    }

    /// Add a rule that only fires on `channel`.
    pub fn insert_scoped(
        &mut self,
        channel: impl Into<String>,
        id: impl Into<String>,
        agent: impl Into<String>,
    ) {
        self.by_channel
            .entry(channel.into())
            .or_default()
            .insert(id.into(), agent.into());
    }

    pub fn len(&self) -> usize {
        self.any_channel.len() + self.by_channel.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One value in a keyed tier table: an agent id or a channel scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    Agent(String),
    Scoped(BTreeMap<String, String>),
}

impl From<BTreeMap<String, RuleEntry>> for TierRules {
    fn from(entries: BTreeMap<String, RuleEntry>) -> Self {
        let mut rules = TierRules::default();
        for (key, entry) in entries {
            match entry {
                RuleEntry::Agent(agent) => {
                    rules.any_channel.insert(key, agent);
                }
                RuleEntry::Scoped(scoped) => {
                    rules.by_channel.insert(key, scoped);
                }
            }
        }
        rules
    }
}

impl From<TierRules> for BTreeMap<String, RuleEntry> {
    fn from(rules: TierRules) -> Self {
        rules
            .any_channel
            .into_iter()
            .map(|(id, agent)| (id, RuleEntry::Agent(agent)))
            .chain(
                rules
                    .by_channel
                    .into_iter()
                    .map(|(channel, scoped)| (channel, RuleEntry::Scoped(scoped))),
            )
            .collect()
    }
}
