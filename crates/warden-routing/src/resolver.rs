//! Route resolution.
//!
//! Resolution algorithm:
//!
//! 1. Walk `MatchReason::PRECEDENCE`: peer, parent-peer, guild, team,
//!    account, channel-wildcard, default.
//! 2. For each tier, take the context's identifier for that tier.  A `None`
//!    or empty identifier skips the tier.
//! 3. The first identifier present as an exact key in its table wins.  A
//!    keyed rule scoped to another channel never fires.
//! 4. If nothing matched and no default agent exists → `UnresolvedRoute`.
//!
//! Session keys are a pure function of (agent, channel, account).

use std::{borrow::Cow, path::Path};

use tracing::{debug, warn};

use warden_contracts::{
    error::{WardenError, WardenResult},
    routing::{MatchReason, ResolvedRoute, RouteContext},
};
use warden_core::traits::Router;

use crate::rule::RuleTable;

/// Resolve `ctx` against `table`.
///
/// # Errors
///
/// `UnresolvedRoute` when no tier matches and `table` has no default agent.
pub fn resolve(ctx: &RouteContext, table: &RuleTable) -> WardenResult<ResolvedRoute> {
    for tier in MatchReason::PRECEDENCE {
        let Some(agent_id) = agent_for_tier(tier, ctx, table) else {
            continue;
        };

        let account_id = present(ctx.account_id.as_deref());
        let (session_key, main_session_key) = session_keys(agent_id, &ctx.channel, account_id);

        debug!(
            agent_id = %agent_id,
            channel = %ctx.channel,
            matched_by = %tier,
            "route resolved"
        );

        return Ok(ResolvedRoute {
            agent_id: agent_id.to_string(),
            channel: ctx.channel.clone(),
            account_id: account_id.map(str::to_string),
            session_key,
            main_session_key,
            matched_by: tier,
        });
    }

    warn!(channel = %ctx.channel, "no routing tier matched and no default agent configured");
    Err(WardenError::UnresolvedRoute {
        channel: ctx.channel.clone(),
    })
}

/// The agent `tier` selects for `ctx`, if that tier fires.
fn agent_for_tier<'a>(tier: MatchReason, ctx: &RouteContext, table: &'a RuleTable) -> Option<&'a str> {
    let (key, rules) = match tier {
        MatchReason::Peer => (ctx.peer_id.as_deref(), &table.peer),
        MatchReason::ParentPeer => (ctx.parent_peer_id.as_deref(), &table.parent_peer),
        MatchReason::Guild => (ctx.guild_id.as_deref(), &table.guild),
        MatchReason::Team => (ctx.team_id.as_deref(), &table.team),
        MatchReason::Account => (ctx.account_id.as_deref(), &table.account),
        MatchReason::ChannelWildcard => {
            return present(Some(ctx.channel.as_str()))
                .and_then(|channel| table.channel.get(channel))
                .map(String::as_str)
                .filter(|agent| !agent.is_empty());
        }
        MatchReason::Default => return present(table.default_agent.as_deref()),
    };
    present(key)
        .and_then(|k| rules.agent(&ctx.channel, k))
        .filter(|agent| !agent.is_empty())
}

fn present(id: Option<&str>) -> Option<&str> {
    id.filter(|s| !s.is_empty())
}

/// Compute `(session_key, main_session_key)` for a route.
///
/// - no account: `agent:{agent}:channel:{channel}` for both keys
/// - account:    `agent:{agent}:channel:{channel}:account:{account}`, with
///   main key `agent:{agent}:account:{account}`
///
/// Components are escaped so they never contain `:`, which makes the
/// mapping injective.
pub fn session_keys(agent_id: &str, channel: &str, account_id: Option<&str>) -> (String, String) {
    let agent = escape(agent_id);
    let channel = escape(channel);
    let base = format!("agent:{}:channel:{}", agent, channel);

    match present(account_id) {
        None => (base.clone(), base),
        Some(account) => {
            let account = escape(account);
            (
                format!("{}:account:{}", base, account),
                format!("agent:{}:account:{}", agent, account),
            )
        }
    }
}

fn escape(component: &str) -> Cow<'_, str> {
    if component.contains(['%', ':']) {
        Cow::Owned(component.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(component)
    }
}

/// A `Router` over an immutable `RuleTable`.
///
/// ```rust,ignore
/// use warden_routing::RouteResolver;
///
/// let resolver = RouteResolver::from_file(Path::new("routing.toml"))?;
/// let route = resolver.resolve(&RouteContext::for_channel("slack"))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteResolver {
    table: RuleTable,
}

impl RouteResolver {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        RuleTable::from_toml_str(s).map(Self::new)
    }

    pub fn from_file(path: &Path) -> WardenResult<Self> {
        RuleTable::from_file(path).map(Self::new)
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }
}

impl Router for RouteResolver {
    fn resolve(&self, ctx: &RouteContext) -> WardenResult<ResolvedRoute> {
        resolve(ctx, &self.table)
    }
}
