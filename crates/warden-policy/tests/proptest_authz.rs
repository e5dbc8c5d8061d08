//! Property tests for grant-gated authorization.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use warden_contracts::authz::{AuthLevel, DenyReason, Grant};
use warden_policy::{InMemoryGrantStore, ToolAuthorizationEngine, ToolPolicy};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn level_strategy() -> impl Strategy<Value = AuthLevel> {
    prop_oneof![
        Just(AuthLevel::AlwaysAllowed),
        Just(AuthLevel::RequiresGrant),
        Just(AuthLevel::AlwaysDenied),
    ]
}

proptest! {
    /// A requires-grant tool is authorized iff the grant window contains `now`.
    #[test]
    fn requires_grant_iff_active(
        has_grant in any::<bool>(),
        from_offset in -1_000i64..1_000,
        length in prop::option::of(0i64..1_000),
        now_offset in -2_000i64..2_000,
    ) {
        let engine = ToolAuthorizationEngine::new(
            ToolPolicy::default().with_tool("exec", AuthLevel::RequiresGrant),
        );
        let grants = InMemoryGrantStore::new();
        let valid_from = base() + Duration::seconds(from_offset);
        let expires_at = length.map(|l| valid_from + Duration::seconds(l));
        if has_grant {
            grants.grant(Grant {
                agent_id: "agent".to_string(),
                tool_name: "exec".to_string(),
                valid_from,
                expires_at,
            });
        }

        let now = base() + Duration::seconds(now_offset);
        let decision = engine.authorize_at("exec", "agent", &grants, now);

        let active = has_grant && now >= valid_from && expires_at.map_or(true, |e| now < e);
        prop_assert_eq!(decision.is_authorized(), active);
        prop_assert_eq!(decision.reason().is_none(), decision.is_authorized());
        if !has_grant {
            prop_assert_eq!(decision.reason(), Some(DenyReason::NoGrant));
        }
    }

    /// Tools missing from the policy are never authorized.
    #[test]
    fn unconfigured_tools_always_denied(
        tools in prop::collection::btree_map("[a-z]{1,6}", level_strategy(), 0..6),
        unlisted in "[a-z]{1,6}",
    ) {
        prop_assume!(!tools.contains_key(&unlisted));
        let engine = ToolAuthorizationEngine::new(ToolPolicy { tools });
        let decision = engine.authorize_at(&unlisted, "agent", &InMemoryGrantStore::new(), base());
        prop_assert!(!decision.is_authorized());
        prop_assert_eq!(decision.reason(), Some(DenyReason::UnknownTool));
    }
}
