/*!
DC-net ciphertext generation for one phase of a bulk round (spec §4.5, "Ciphertext
generation"): every pairwise DH secret is stretched into a per-phase keystream, and a
participant's contribution to the aggregate is the XOR of every keystream it owns a share
of, with the slot owner additionally XORing in its own signed slot message.
*/

use crate::crypto::dh::SharedSecret;
use crate::crypto::hash::sha256;
use crate::crypto::prg::Prg;
use crate::round_id::{Phase, RoundId};

/// Stretches one pairwise DH secret into the seed for this phase's keystream, binding in the
/// round id so a (secret, phase) pair can never be replayed across rounds.
pub fn per_phase_seed(secret: &SharedSecret, phase: Phase, round_id: &RoundId) -> [u8; 32] {
    sha256(&[secret.as_bytes(), &phase.0.to_be_bytes(), round_id.as_bytes()])
}

/// Expands a per-phase seed to exactly `len` keystream bytes.
pub fn keystream(seed: &[u8; 32], len: usize) -> Vec<u8> {
    Prg::new(seed, 0).take(len)
}

fn xor_into(accumulator: &mut [u8], other: &[u8]) {
    for (a, b) in accumulator.iter_mut().zip(other) {
        *a ^= b;
    }
}

/// One client's ciphertext for the current phase: the XOR of its keystream share with every
/// server, plus (if it owns an open slot this phase) its own slot bytes XORed in at the
/// slot's offset.
pub fn client_ciphertext(per_server_seeds: &[[u8; 32]], aggregate_len: usize, own_slot: Option<(usize, &[u8])>) -> Vec<u8> {
    let mut out = vec![0u8; aggregate_len];
    for seed in per_server_seeds {
        xor_into(&mut out, &keystream(seed, aggregate_len));
    }
    if let Some((offset, slot_bytes)) = own_slot {
        let end = offset + slot_bytes.len();
        assert!(end <= aggregate_len, "slot does not fit the aggregate");
        xor_into(&mut out[offset..end], slot_bytes);
    }
    out
}

/// One server's ciphertext for the current phase: the XOR of its keystream share with every
/// client it has accepted a submission from this phase.
pub fn server_ciphertext(per_client_seeds: &[[u8; 32]], aggregate_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; aggregate_len];
    for seed in per_client_seeds {
        xor_into(&mut out, &keystream(seed, aggregate_len));
    }
    out
}

/// XORs every client ciphertext and every server ciphertext together to recover the shared
/// cleartext (spec §4.5 step 5, "Validate").
pub fn combine(ciphertexts: impl Iterator<Item = Vec<u8>>, aggregate_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; aggregate_len];
    for ct in ciphertexts {
        xor_into(&mut out, &ct);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_and_server_shares_of_the_same_pairwise_secret_cancel() {
        let secret = SharedSecret([7u8; 32]);
        let round_id = RoundId::derive(b"nonce", &test_group(), b"params");
        let seed = per_phase_seed(&secret, Phase(3), &round_id);

        let client_side = client_ciphertext(&[seed], 32, None);
        let server_side = server_ciphertext(&[seed], 32);
        let combined = combine([client_side, server_side].into_iter(), 32);
        assert_eq!(combined, vec![0u8; 32]);
    }

    #[test]
    fn own_slot_bytes_survive_the_round_trip_once_other_shares_cancel() {
        let secret = SharedSecret([11u8; 32]);
        let round_id = RoundId::derive(b"nonce", &test_group(), b"params");
        let seed = per_phase_seed(&secret, Phase(0), &round_id);

        let slot_bytes = [0xABu8; 8];
        let client_side = client_ciphertext(&[seed], 32, Some((4, &slot_bytes)));
        let server_side = server_ciphertext(&[seed], 32);
        let combined = combine([client_side, server_side].into_iter(), 32);

        assert_eq!(&combined[4..12], &slot_bytes);
        assert_eq!(&combined[..4], &[0u8; 4]);
    }

    fn test_group() -> crate::group::Group {
        let members: Vec<_> = (0..2).map(crate::testing::test_identity).collect();
        crate::group::Group::new(members, 1)
    }
}
