/*!
The layout of one client's own slot within a bulk-round aggregate (spec §3, "Slot message
layout"): accusation flag, phase, next-phase length, payload, an integrity trailer under
the session's anonymous key, and a randomizing seed prefix that makes the whole slot value
indistinguishable from noise to anyone but its owner.

The randomizer is the same construction as `original_source/src/Anonymity/
MessageRandomizer.{hpp,cpp}`: a fresh seed is generated, appended in clear, and the entire
remaining tail is XORed with a keystream derived from that seed, so a slot's declared
length never leaks unkeyed zero bytes — except the original seeds a CTR-DRBG and this
crate reuses the SHA-3-based [`crate::crypto::prg::Prg`] already on hand for the bulk
ciphertext keystream itself.

The integrity trailer is either a real signature or a plain hash, per [`SlotIntegrity`],
mirroring the original's `CSBulkRound::GenerateSlotMessage`'s `CSBR_SIGN_SLOTS` compile
flag: signing authenticates the slot as belonging to the anonymous key's holder, while
hashing only lets the owner detect that its own previous contribution was corrupted.

A declared slot length may exceed what the header, payload, and trailer actually need
(the owner's content shrank since the length was last negotiated); the header carries an
explicit payload length so derandomization can tell real content apart from the
keystream-derived filler that fills out the rest, rather than guessing from the end of
the buffer.
*/

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::config::SlotIntegrity;
use crate::crypto::hash::sha256;
use crate::crypto::prg::Prg;

/// Length of the clear-text randomizer seed prefixed to every slot value.
pub const RANDOMIZER_SEED_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;
const HASH_LEN: usize = 32;
/// accusation flag (1) + phase (4) + next_length (4) + payload_len (4). `payload_len` lets
/// a derandomized slot tell its real content apart from the keystream filler that pads it
/// out to the declared slot length, since the two are otherwise indistinguishable noise.
const HEADER_LEN: usize = 13;

fn trailer_len(integrity: SlotIntegrity) -> usize {
    match integrity {
        SlotIntegrity::Signed => SIGNATURE_LEN,
        SlotIntegrity::Hashed => HASH_LEN,
    }
}

/// The contents of one client's own slot, before randomization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMessage {
    /// Set by the owner when it believes its previous slot was corrupted in transit.
    pub accusation: bool,
    pub phase: u32,
    /// Length (including header) the owner's slot will occupy next phase; 0 closes it.
    pub next_length: u32,
    pub payload: Vec<u8>,
}

impl SlotMessage {
    /// Encodes the header and payload, then appends the integrity trailer `integrity` calls
    /// for, returning the plaintext form (before randomization).
    fn encode(&self, anonymous_key: &SigningKey, integrity: SlotIntegrity) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len() + trailer_len(integrity));
        out.push(self.accusation as u8);
        out.extend_from_slice(&self.phase.to_le_bytes());
        out.extend_from_slice(&self.next_length.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.payload);
        match integrity {
            SlotIntegrity::Signed => {
                let signature: Signature = anonymous_key.sign(&out);
                out.extend_from_slice(&signature.to_bytes());
            }
            SlotIntegrity::Hashed => {
                out.extend_from_slice(&sha256(&[&out]));
            }
        }
        out
    }

    /// Produces the final randomized slot value of exactly `total_len` bytes (the length
    /// declared for this slot by the previous phase's header). The whole `total_len -
    /// RANDOMIZER_SEED_LEN` tail, not just the encoded content, is XORed with the seed
    /// keystream, so any bytes beyond the encoded message are keystream noise rather than
    /// predictable zeros.
    pub fn randomize(
        &self,
        anonymous_key: &SigningKey,
        integrity: SlotIntegrity,
        total_len: usize,
        rng: &mut dyn CryptoRngCore,
    ) -> Vec<u8> {
        let plain = self.encode(anonymous_key, integrity);
        assert!(
            RANDOMIZER_SEED_LEN + plain.len() <= total_len,
            "slot payload does not fit the declared slot length"
        );
        let mut seed = [0u8; RANDOMIZER_SEED_LEN];
        rng.fill_bytes(&mut seed);
        let mut padded_plain = plain;
        padded_plain.resize(total_len - RANDOMIZER_SEED_LEN, 0);
        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(&seed);
        out.extend_from_slice(&pad_with_seed(&seed, &padded_plain));
        out
    }

    /// Reverses [`SlotMessage::randomize`] and checks the integrity trailer, returning `None`
    /// if the slot is malformed or the trailer fails to verify. `anonymous_key` is required
    /// (and used) only under [`SlotIntegrity::Signed`].
    pub fn derandomize_and_verify(
        randomized: &[u8],
        integrity: SlotIntegrity,
        anonymous_key: Option<&VerifyingKey>,
    ) -> Option<Self> {
        let trailer_len = trailer_len(integrity);
        if randomized.len() < RANDOMIZER_SEED_LEN + HEADER_LEN + trailer_len {
            return None;
        }
        let (seed, tail) = randomized.split_at(RANDOMIZER_SEED_LEN);
        let plain = pad_with_seed(seed.try_into().expect("exact length"), tail);
        if plain.len() < HEADER_LEN + trailer_len {
            return None;
        }

        let payload_len = u32::from_le_bytes(plain[9..HEADER_LEN].try_into().ok()?) as usize;
        let content_len = HEADER_LEN.checked_add(payload_len)?.checked_add(trailer_len)?;
        if content_len > plain.len() {
            return None;
        }
        let (content, _filler) = plain.split_at(content_len);
        let (signed_part, trailer_bytes) = content.split_at(content.len() - trailer_len);
        match integrity {
            SlotIntegrity::Signed => {
                let anonymous_key = anonymous_key?;
                let signature = Signature::from_bytes(trailer_bytes.try_into().ok()?);
                anonymous_key.verify_strict(signed_part, &signature).ok()?;
            }
            SlotIntegrity::Hashed => {
                if trailer_bytes != sha256(&[signed_part]) {
                    return None;
                }
            }
        }

        let accusation = signed_part[0] != 0;
        let phase = u32::from_le_bytes(signed_part[1..5].try_into().ok()?);
        let next_length = u32::from_le_bytes(signed_part[5..9].try_into().ok()?);
        let payload = signed_part[HEADER_LEN..].to_vec();
        Some(Self {
            accusation,
            phase,
            next_length,
            payload,
        })
    }
}

/// XORs `message` against a keystream derived from `seed`, padding (or truncating) the
/// stream to `message`'s length. Self-inverse: applying it twice with the same seed recovers
/// the original bytes, which is how derandomization works.
fn pad_with_seed(seed: &[u8; RANDOMIZER_SEED_LEN], message: &[u8]) -> Vec<u8> {
    let mut prg = Prg::new(seed, 0);
    let pad = prg.take(message.len());
    pad.iter().zip(message).map(|(p, m)| p ^ m).collect()
}
