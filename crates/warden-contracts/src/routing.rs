//! Route resolution types.
//!
//! A `RouteContext` is what the transport knows about an inbound message;
//! a `ResolvedRoute` is the agent and session the resolver picked for it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The routing tier that produced a `ResolvedRoute`.
///
/// Declaration order is precedence order: `Peer` wins over everything,
/// `Default` only applies when no other tier matched.  The derived `Ord`
/// follows the same order, so a smaller value means a higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchReason {
    Peer,
    ParentPeer,
    Guild,
    Team,
    Account,
    ChannelWildcard,
    Default,
}

impl MatchReason {
    /// Every tier, highest priority first.
    pub const PRECEDENCE: [MatchReason; 7] = [
        MatchReason::Peer,
        MatchReason::ParentPeer,
        MatchReason::Guild,
        MatchReason::Team,
        MatchReason::Account,
        MatchReason::ChannelWildcard,
        MatchReason::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::Peer => "peer",
            MatchReason::ParentPeer => "parent-peer",
            MatchReason::Guild => "guild",
            MatchReason::Team => "team",
            MatchReason::Account => "account",
            MatchReason::ChannelWildcard => "channel-wildcard",
            MatchReason::Default => "default",
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifying attributes of an inbound message.
///
/// Only `channel` is mandatory.  An identifier that is `None` or empty is
/// treated as absent by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteContext {
    /// Transport channel name, e.g. "telegram" or "slack".
    pub channel: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,

    /// The peer that owns the conversation `peer_id` belongs to
    /// (e.g. the parent of a thread).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_peer_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl RouteContext {
    /// Build a context carrying only the mandatory channel.
    pub fn for_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Self::default()
        }
    }
}

/// The single route chosen for one resolution call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    pub agent_id: String,
    pub channel: String,

    /// The account the message arrived on, if the context carried one.
    pub account_id: Option<String>,

    /// Stable key of the (agent, channel, account) session.
    pub session_key: String,

    /// Key of the broader per-account session this route belongs to, or
    /// `session_key` itself when the route is not a sub-session.
    pub main_session_key: String,

    pub matched_by: MatchReason,
}

impl ResolvedRoute {
    /// True when `session_key` is a channel-specific thread of a broader
    /// per-account session.
    pub fn is_sub_session(&self) -> bool {
        self.session_key != self.main_session_key
    }
}
