/*!
Wire messages (spec §6): every message is prefixed with a message-type tag and the round
id, carries an explicit phase, and (for anything crossing a trust boundary) a signature
over the payload. This module defines the tagged payloads; `round_base` handles the
signature envelope and round-id/phase checks uniformly across both round families.
*/

use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group_math::GroupElement;
use crate::crypto::zkp::{DleqProof, ShuffleProof};
use crate::group::ParticipantId;
use crate::round_id::{Phase, RoundId};

/// Envelope common to every round-scoped message: the tag lives in `body`'s variant, this
/// carries the replay-resistance and ordering fields the state machine and round base check
/// before a handler ever sees the body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub round_id: RoundId,
    pub phase: Phase,
    pub sender: ParticipantId,
    pub body: Body,
    /// Signature over `bincode::serialize(&body)` under the sender's long-term key, present
    /// on every message that must survive as evidence to a third party.
    pub signature: Option<Signature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Body {
    // --- Bulk round (CSBulk), spec §6 table ---
    ClientCiphertext { ciphertext: Vec<u8> },
    ServerClientList { served: Vec<bool> },
    ServerCommit { commitment: crate::crypto::hash::Digest256 },
    ServerCiphertext { ciphertext: Vec<u8> },
    ServerValidation { signature: Signature },
    ServerCleartext { signatures: Vec<Signature>, cleartext: Vec<u8> },
    ServerBlameBits { actual_bits: Vec<u8>, expected_bits: Vec<u8> },
    ServerRebuttalOrVerdict(RebuttalOrVerdict),
    ClientRebuttal {
        accused_server_idx: u32,
        /// The DH-shared element itself, revealed only now that a rebuttal is required;
        /// `proof` attests it was honestly derived from the client's long-term DH key.
        revealed_element: GroupElement,
        proof: DleqProof,
    },
    ServerVerdictSignature { signature: Signature },

    // --- Neff shuffle, spec §6 and §4.4 ---
    KeySubmit { encrypted_dh_key: Ciphertext },
    KeyShuffle { permuted: Vec<Ciphertext>, proof: ShuffleProof },
    AnonymizedKeys { keys: Vec<GroupElement> },
    MsgSubmit { encrypted_payload: Ciphertext },
    MsgShuffle { permuted: Vec<Ciphertext>, proof: ShuffleProof },
    MsgSignature { signature: Signature },
    MsgOutput { cleartexts: Vec<GroupElement> },
    MsgKeyExch { dh_public: GroupElement },
    MsgKeySignature { signature: Signature },
    MsgKeyDist { keys: Vec<GroupElement> },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RebuttalOrVerdict {
    Rebuttal {
        accused_server_idx: u32,
        revealed_element: GroupElement,
        proof: DleqProof,
    },
    Verdict {
        /// The blamed slot owner's index, the bit index the accusation named, and the phase
        /// it was raised against — the same triple `blame::verdict_digest` hashes, so a
        /// recipient can reconstruct the digest and run `blame::verify_verdict_certificate`.
        owner_idx: u32,
        accuse_bit_idx: u32,
        phase: Phase,
        guilty_id: ParticipantId,
        signatures: Vec<Signature>,
    },
}
