/*!
Negotiated round parameters (spec §A.3, §REDESIGN FLAGS).

The original implementation scattered several of these as compile-time flags (slot
signing vs. hashing, slot closing, reconnection behavior); per the redesign notes, they
are promoted here to explicit parameters carried in the round id's derivation (see
[`crate::round_id::RoundId::derive`]), so every participant that hashes the same
[`RoundParams`] necessarily agrees on wire format bit-exactly.
*/

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{sha256, Digest256};

/// How a bulk round slot proves its ciphertext is well-formed: a signature over the slot
/// (cheap to verify, but the signing key must itself stay anonymous) or a hash commitment
/// checked against a prior announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotIntegrity {
    Signed,
    Hashed,
}

/// Parameters negotiated once per session and held fixed for every round it runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundParams {
    /// Hard wall-clock deadline for a bulk round phase, regardless of how many slots have
    /// reported in.
    pub bulk_hard_deadline_ms: u64,
    /// Fraction of participants (numerator/denominator) that must have reported before the
    /// phase is allowed to close early, ahead of the hard deadline.
    pub bulk_flex_fraction: (u32, u32),
    /// How long the shuffle's client-submission window stays open.
    pub shuffle_submission_window_ms: u64,
    /// Number of past phases the phase log retains for deferred blame (C9).
    pub retained_phases: u32,
    pub slot_integrity: SlotIntegrity,
    /// Size of one aggregate slot header, in bytes, before the randomizer seed prefix.
    pub aggregate_header_bytes: u32,
}

impl RoundParams {
    pub fn fingerprint(&self) -> Digest256 {
        let encoded = bincode::serialize(self).expect("RoundParams always serializes");
        sha256(&[&encoded])
    }
}

impl Default for RoundParams {
    fn default() -> Self {
        Self {
            bulk_hard_deadline_ms: 30_000,
            bulk_flex_fraction: (2, 3),
            shuffle_submission_window_ms: 30_000,
            retained_phases: 5,
            slot_integrity: SlotIntegrity::Signed,
            aggregate_header_bytes: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_changes_with_any_field() {
        let base = RoundParams::default();
        let mut changed = base.clone();
        changed.retained_phases += 1;
        assert_ne!(base.fingerprint(), changed.fingerprint());
    }
}
