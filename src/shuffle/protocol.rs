/*!
The four phases of the Neff shuffle (C7, spec §4.4): server key setup, client submission
under an admission window, the per-server shuffle-and-partial-decrypt chain, and the final
signature exchange.

Following the split the teacher's `Round` trait draws between "what do I do with this
message" and "how do bytes get there", this module exposes pure, directly testable
functions and a small coordinator struct; `round_base`/`network` carry the actual bytes.
*/

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;
use tracing::{debug, warn};

use crate::crypto::elgamal::Ciphertext;
use crate::crypto::group_math::{GroupElement, IntegerGroup, Scalar};
use crate::crypto::hash::sha256;
use crate::error::ProtocolError;
use crate::shuffle::kind::ShuffleKind;
use crate::shuffle::transcript::{self, ShuffleStep};

/// One server's ephemeral DSA keypair for a single shuffle run (spec §4.4 phase 1: "fresh
/// ephemeral DSA keypair with the agreed parameters").
pub struct EphemeralKeys {
    pub secret: Scalar,
    pub public: GroupElement,
}

impl EphemeralKeys {
    pub fn generate(group: &IntegerGroup, rng: &mut dyn CryptoRngCore) -> Self {
        let secret = group.random_scalar(rng);
        let public = group.pow_g(&secret);
        Self { secret, public }
    }
}

/// Hashes the concatenated ephemeral public elements from every server, in subgroup order,
/// producing the digest each server signs and exchanges in phase 1.
pub fn key_setup_digest(server_keys: &[GroupElement]) -> [u8; 32] {
    let encoded: Vec<Vec<u8>> = server_keys.iter().map(|k| k.to_bytes()).collect();
    let refs: Vec<&[u8]> = encoded.iter().map(|b| b.as_slice()).collect();
    sha256(&refs)
}

/// Verifies every server's signature over the key-setup digest, per spec §4.4 phase 1
/// ("Each server verifies every other server's signature; mismatches abort the round").
/// Returns the index of the first server whose signature fails, if any.
pub fn verify_key_setup_signatures(
    digest: &[u8; 32],
    server_verifying_keys: &[VerifyingKey],
    signatures: &[Signature],
) -> Result<(), ProtocolError> {
    if server_verifying_keys.len() != signatures.len() {
        return Err(ProtocolError::new("key-setup signature count mismatch", None));
    }
    for (idx, (key, signature)) in server_verifying_keys.iter().zip(signatures.iter()).enumerate() {
        if key.verify_strict(digest, signature).is_err() {
            warn!(server_idx = idx, "shuffle: key-setup signature verification failed");
            return Err(ProtocolError::new("key-setup signature verification failed", Some(idx as u32)));
        }
    }
    debug!(servers = server_verifying_keys.len(), "shuffle: key-setup signatures all verified");
    Ok(())
}

/// The joint public key servers encrypt under: the product of every server's ephemeral
/// public element, per spec §4.4 ("Inputs").
pub fn joint_public_key(group: &IntegerGroup, server_keys: &[GroupElement]) -> GroupElement {
    server_keys.iter().fold(group.identity(), |acc, key| group.mul(&acc, key))
}

/// A client's submission for one shuffle run: its input encrypted once under the joint
/// public key. `ShuffleKind` only changes what's wrapped in `plaintext` before this call;
/// the encryption itself is identical either way.
pub fn client_submit(
    group: &IntegerGroup,
    joint_pk: &GroupElement,
    plaintext: &GroupElement,
    rng: &mut dyn CryptoRngCore,
) -> Ciphertext {
    let r = crate::crypto::elgamal::random_factor(group, rng);
    crate::crypto::elgamal::encrypt(group, joint_pk, plaintext, &r)
}

/// State carried by one server across the per-server shuffle chain.
pub struct ShuffleRun {
    pub kind: ShuffleKind,
    pub group: IntegerGroup,
    pub joint_pk: GroupElement,
    pub ephemeral: EphemeralKeys,
    pub server_public_keys: Vec<GroupElement>,
}

impl ShuffleRun {
    /// Verifies the previous server's step (skipped for the first server in subgroup order,
    /// whose "previous transcript" is just the raw client submissions) and produces this
    /// server's own step over the verified input.
    pub fn verify_and_step(
        &self,
        previous_server_index: Option<usize>,
        input: &[Ciphertext],
        previous_step: Option<&ShuffleStep>,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<ShuffleStep, ProtocolError> {
        if let (Some(idx), Some(step)) = (previous_server_index, previous_step) {
            let previous_pk = self
                .server_public_keys
                .get(idx)
                .ok_or_else(|| ProtocolError::new("unknown previous server index", Some(idx as u32)))?;
            if !transcript::verify_step(&self.group, &self.joint_pk, previous_pk, input, step) {
                warn!(server_idx = idx, "shuffle: transcript rejected");
                return Err(ProtocolError::new("shuffle transcript rejected", Some(idx as u32)));
            }
        }
        debug!(kind = self.kind.wire_label(), inputs = input.len(), "shuffle: producing step");
        Ok(transcript::produce_step(&self.group, &self.joint_pk, &self.ephemeral.secret, input, rng))
    }
}

/// Phase 4: every server signs the hash of the final cleartext list; once every signature
/// has arrived, clients can be shown the cleartexts with the full signature vector.
pub fn sign_final_cleartexts(signing_key: &SigningKey, cleartexts: &[GroupElement]) -> Signature {
    let encoded: Vec<Vec<u8>> = cleartexts.iter().map(|c| c.to_bytes()).collect();
    let refs: Vec<&[u8]> = encoded.iter().map(|b| b.as_slice()).collect();
    let digest = sha256(&refs);
    signing_key.sign(&digest)
}

pub fn verify_final_cleartext_signatures(
    cleartexts: &[GroupElement],
    server_verifying_keys: &[VerifyingKey],
    signatures: &[Signature],
) -> bool {
    if server_verifying_keys.len() != signatures.len() {
        return false;
    }
    let encoded: Vec<Vec<u8>> = cleartexts.iter().map(|c| c.to_bytes()).collect();
    let refs: Vec<&[u8]> = encoded.iter().map(|b| b.as_slice()).collect();
    let digest = sha256(&refs);
    server_verifying_keys
        .iter()
        .zip(signatures.iter())
        .all(|(key, signature)| key.verify_strict(&digest, signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    /// Simulates a full two-server chain end to end: key setup, one client submission,
    /// two shuffle steps, and signature exchange over the resulting cleartext.
    #[test]
    fn two_server_chain_recovers_client_plaintext() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(201);

        let eph1 = EphemeralKeys::generate(&group, &mut rng);
        let eph2 = EphemeralKeys::generate(&group, &mut rng);
        let server_keys = vec![eph1.public.clone(), eph2.public.clone()];
        let joint_pk = joint_public_key(&group, &server_keys);

        let run1 = ShuffleRun {
            kind: ShuffleKind::NeffDataShuffle,
            group: group.clone(),
            joint_pk: joint_pk.clone(),
            ephemeral: EphemeralKeys {
                secret: eph1.secret.clone(),
                public: eph1.public.clone(),
            },
            server_public_keys: server_keys.clone(),
        };
        let run2 = ShuffleRun {
            kind: ShuffleKind::NeffDataShuffle,
            group: group.clone(),
            joint_pk: joint_pk.clone(),
            ephemeral: EphemeralKeys {
                secret: eph2.secret.clone(),
                public: eph2.public.clone(),
            },
            server_public_keys: server_keys.clone(),
        };

        let plaintext = group.pow_g(&Scalar::from_u64(99, &group));
        let submission = client_submit(&group, &joint_pk, &plaintext, &mut rng);

        let step1 = run1.verify_and_step(None, &[submission.clone()], None, &mut rng).unwrap();
        let step2 = run2.verify_and_step(Some(0), &[submission], Some(&step1), &mut rng).unwrap();

        assert_eq!(step2.output.len(), 1);
        assert_eq!(step2.output[0].phi, plaintext);
    }

    #[test]
    fn key_setup_signatures_must_all_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(202);
        let group = IntegerGroup::toy();
        let eph1 = EphemeralKeys::generate(&group, &mut rng);
        let eph2 = EphemeralKeys::generate(&group, &mut rng);
        let digest = key_setup_digest(&[eph1.public, eph2.public]);

        let key1 = SigningKey::generate(&mut rng);
        let key2 = SigningKey::generate(&mut rng);
        let sig1 = key1.sign(&digest);
        let wrong_sig = key1.sign(b"not the digest");

        assert!(verify_key_setup_signatures(&digest, &[key1.verifying_key(), key2.verifying_key()], &[sig1, wrong_sig]).is_err());
    }
}
