/*!
Hashing used for round/phase ids, Fiat-Shamir challenges, and commitments (C2).

SHA-256 is used wherever a fixed-size digest crosses the wire (round ids,
participant ids); SHA-3 (Keccak) is used for the shuffle's Fiat-Shamir transcript
and the bulk round's PRG seed expansion, matching the split the original
implementation draws between `CryptoHash` (used for ids) and the hash used
inside `AbstractGroup`'s NIZK transcripts.
*/

use sha2::{Digest, Sha256};
use sha3::Sha3_256;

/// A 256-bit digest.
pub type Digest256 = [u8; 32];

pub fn sha256(parts: &[&[u8]]) -> Digest256 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Hashes a sequence of byte strings into a single digest, each length-prefixed so that
/// `hash_parts(&[a, b])` cannot collide with `hash_parts(&[a || b])`.
pub fn sha3_transcript(parts: &[&[u8]]) -> Digest256 {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_hash_is_domain_separated() {
        let a = sha3_transcript(&[b"ab"]);
        let b = sha3_transcript(&[b"a", b"b"]);
        assert_ne!(a, b);
    }
}
