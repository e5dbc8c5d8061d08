//! Fuzz harness for route resolution over adversarial contexts.
//!
//! Input is split on NUL into fields.  The first fields fill the rule table
//! (per keyed tier an unscoped key and a channel-scoped key, then a channel
//! key and a default agent); the next six fill the context.
//! Resolution must never panic, must pick the highest-priority tier whose
//! identifier is present, and must produce session keys from which the
//! original components cannot be confused.

#![no_main]
use libfuzzer_sys::fuzz_target;
use warden_contracts::routing::{MatchReason, RouteContext};
use warden_routing::{resolve, session_keys, RuleTable};

fn opt(field: Option<&str>) -> Option<String> {
    field.map(str::to_string)
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut fields = text.split('\0');
    let mut next = || fields.next();

    let mut table = RuleTable::default();
    for (tier, rules) in [
        (0, &mut table.peer),
        (1, &mut table.parent_peer),
        (2, &mut table.guild),
        (3, &mut table.team),
        (4, &mut table.account),
    ] {
        if let Some(key) = next() {
            rules.insert(key, format!("agent-{tier}"));
        }
        if let (Some(channel), Some(key)) = (next(), next()) {
            rules.insert_scoped(channel, key, format!("scoped-{tier}"));
        }
    }
    if let Some(key) = next() {
        table.channel.insert(key.to_string(), "agent-5".to_string());
    }
    table.default_agent = opt(next());

    let ctx = RouteContext {
        channel: next().unwrap_or_default().to_string(),
        peer_id: opt(next()),
        parent_peer_id: opt(next()),
        guild_id: opt(next()),
        team_id: opt(next()),
        account_id: opt(next()),
    };

    let Ok(route) = resolve(&ctx, &table) else {
        return;
    };

    assert!(!route.agent_id.is_empty());
    assert_eq!(route.channel, ctx.channel);

    let expected = session_keys(&route.agent_id, &ctx.channel, route.account_id.as_deref());
    assert_eq!((route.session_key.clone(), route.main_session_key.clone()), expected);

    // Escaped components never contain the separator, so the key has a
    // fixed number of parts.
    let parts = route.session_key.split(':').count();
    assert_eq!(parts, if route.account_id.is_some() { 6 } else { 4 });

    if route.matched_by != MatchReason::Peer {
        let peer_hit = ctx
            .peer_id
            .as_deref()
            .is_some_and(|p| !p.is_empty() && table.peer.agent(&ctx.channel, p).is_some());
        assert!(!peer_hit, "peer rule matched but {} won", route.matched_by);
    }
});
