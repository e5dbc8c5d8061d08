//! Fuzz harness for audit chain verification.
//!
//! Input is interpreted two ways:
//!
//! 1. As a JSON array of `AuditEntry`.  Verification of arbitrary, possibly
//!    hostile, stored chains must never panic, and `AuditLog::open` must
//!    agree with `verify_chain`.
//! 2. As a tamper script against a freshly built chain: each byte pair picks
//!    an entry and a field to alter.  Any effective edit must be detected.

#![no_main]
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use warden_audit::{verify_chain, AuditLog, InMemoryAuditStore};
use warden_contracts::audit::{AuditEntry, EventType};

fn check_stored_chain(data: &[u8]) {
    let Ok(entries) = serde_json::from_slice::<Vec<AuditEntry>>(data) else {
        return;
    };
    let direct = verify_chain(&entries).is_ok();
    let Ok(log) = AuditLog::open(Arc::new(InMemoryAuditStore::with_entries(entries))) else {
        return;
    };
    assert_eq!(log.verify(), direct);
}

fn check_tamper_script(data: &[u8]) {
    let Some((&count, script)) = data.split_first() else {
        return;
    };
    let count = usize::from(count % 16) + 1;

    let log = AuditLog::in_memory();
    for i in 0..count {
        let event_type = EventType::ALL[i % EventType::ALL.len()];
        if log
            .append(event_type, &format!("detail-{i}"), "agent", "session", "req")
            .is_err()
        {
            return;
        }
    }
    assert!(log.verify());

    let original = log.snapshot().to_vec();
    let mut entries = original.clone();
    for pair in script.chunks_exact(2) {
        let entry = &mut entries[usize::from(pair[0]) % count];
        let byte = pair[1];
        match byte % 6 {
            0 => entry.event_detail.push(char::from(byte)),
            1 => entry.agent_id = format!("agent-{byte}"),
            2 => entry.sequence = entry.sequence.wrapping_add(u64::from(byte)),
            3 => entry.event_type = EventType::ALL[usize::from(byte) % EventType::ALL.len()],
            4 => entry.prev_hash = entry.hash.clone(),
            _ => entry.request_id.clear(),
        }
    }

    let reopened = match AuditLog::open(Arc::new(InMemoryAuditStore::with_entries(entries.clone()))) {
        Ok(log) => log,
        Err(_) => return,
    };
    if entries == original {
        assert!(reopened.verify());
    } else {
        assert!(!reopened.verify(), "tampered chain verified");
    }
}

fuzz_target!(|data: &[u8]| {
    check_stored_chain(data);
    check_tamper_script(data);
});
