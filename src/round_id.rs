/*!
Round identifiers (spec §3, §A.3): a fresh byte string carried in every round-scoped
message for replay resistance, derived from the group membership and the negotiated
[`crate::config::RoundParams`] so participants can never silently disagree on wire format.
A blame sub-round's id is a deterministic double-hash of its parent round's id, so no
additional negotiation is needed to start one.
*/

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{sha256, Digest256};
use crate::group::Group;

/// A round identifier: unique to one run of one round type over one group and parameter set.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(Digest256);

impl RoundId {
    /// Derives a fresh round id from a random per-round nonce, the group roster, and the
    /// wire-format parameters in effect, so two rounds started with different parameters (or
    /// different membership) can never collide.
    pub fn derive(nonce: &[u8], group: &Group, params_fingerprint: &[u8]) -> Self {
        let member_bytes: Vec<u8> = group
            .servers()
            .iter()
            .chain(group.clients())
            .flat_map(|identity| *identity.id.as_bytes())
            .collect();
        Self(sha256(&[nonce, &member_bytes, params_fingerprint]))
    }

    /// Derives a blame sub-round's id by double-hashing the parent round's id, salted with
    /// the accusation's phase so distinct blame rounds over the same parent never collide.
    pub fn derive_blame(parent: &RoundId, accused_phase: u64) -> Self {
        let once = sha256(&[&parent.0]);
        Self(sha256(&[&once, &accused_phase.to_be_bytes()]))
    }

    pub fn as_bytes(&self) -> &Digest256 {
        &self.0
    }
}

impl std::fmt::Debug for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RoundId(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// A monotonically increasing phase counter within one round. Messages for a phase behind
/// the current one are discarded; messages for a phase ahead of the current one are buffered
/// until the round catches up (spec §3, C3).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Phase(pub u64);

impl Phase {
    pub fn next(self) -> Self {
        Phase(self.0 + 1)
    }
}
