//! Hash-chain primitives: canonical encoding, hashing, and verification.
//!
//! Canonical encoding, version 1 (bytes, in order):
//!   1. format version, one byte (`CANONICAL_VERSION`)
//!   2. sequence as 8-byte little-endian
//!   3. timestamp, RFC 3339 with nanoseconds and `Z` suffix
//!   4. event type, stable snake_case name
//!   5. event_detail
//!   6. agent_id
//!   7. session_key
//!   8. request_id
//!   9. prev_hash (64 ASCII hex chars)
//!
//! Every string field is written as an 8-byte little-endian length followed
//! by its UTF-8 bytes, so no two distinct entries share an encoding.  The
//! entry's own `hash` is not part of the input.
//!
//! Changing this layout invalidates every stored chain and must bump
//! `CANONICAL_VERSION`.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use warden_contracts::{
    audit::{AuditEntry, GENESIS_HASH},
    error::{WardenError, WardenResult},
};

/// Version byte prefixed to every canonical encoding.
pub const CANONICAL_VERSION: u8 = 1;

/// Serialize every hashed field of `entry` in canonical order.
pub fn canonical_bytes(entry: &AuditEntry) -> Vec<u8> {
    let timestamp = entry.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);

    let mut out = Vec::with_capacity(
        128 + entry.event_detail.len() + entry.agent_id.len() + entry.session_key.len(),
    );
    out.push(CANONICAL_VERSION);
    out.extend_from_slice(&entry.sequence.to_le_bytes());
    put_str(&mut out, &timestamp);
    put_str(&mut out, entry.event_type.as_str());
    put_str(&mut out, &entry.event_detail);
    put_str(&mut out, &entry.agent_id);
    put_str(&mut out, &entry.session_key);
    put_str(&mut out, &entry.request_id);
    put_str(&mut out, &entry.prev_hash);
    out
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Compute the SHA-256 hash of `entry`'s canonical encoding.
///
/// Returns a lowercase 64-character hex string.  The `hash` field of
/// `entry` is ignored.
pub fn hash_entry(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(entry));
    hex::encode(hasher.finalize())
}

/// Verify a chain from genesis.
///
/// For each entry at position `i`:
///
/// 1. **Sequence** equals `i`.
/// 2. **Prev-hash linkage**: `prev_hash` equals the previous entry's
///    `hash`, or `GENESIS_HASH` for position 0.
/// 3. **Hash correctness**: `hash` equals the recomputed hash of the entry.
/// 4. **Time order**: `timestamp` is not earlier than the previous entry's.
///
/// Returns `IntegrityViolation` for the first entry that breaks a rule.
/// An empty chain is valid.
pub fn verify_chain(entries: &[AuditEntry]) -> WardenResult<()> {
    let mut expected_prev = GENESIS_HASH;
    let mut prev_timestamp = None;

    for (idx, entry) in entries.iter().enumerate() {
        let violation = |reason: String| WardenError::IntegrityViolation {
            sequence: entry.sequence,
            reason,
        };

        if entry.sequence != idx as u64 {
            return Err(violation(format!(
                "expected sequence {}, found {}",
                idx, entry.sequence
            )));
        }

        if entry.prev_hash != expected_prev {
            return Err(violation("prev_hash does not match predecessor".to_string()));
        }

        if entry.hash != hash_entry(entry) {
            return Err(violation("stored hash does not match entry contents".to_string()));
        }

        if prev_timestamp.is_some_and(|prev| entry.timestamp < prev) {
            return Err(violation("timestamp earlier than predecessor".to_string()));
        }

        expected_prev = entry.hash.as_str();
        prev_timestamp = Some(entry.timestamp);
    }

    Ok(())
}
