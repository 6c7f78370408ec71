/*!
One server's shuffle step: apply a fresh random permutation, re-encryption, and partial
decryption to a list of ciphertexts, and produce the non-interactive proof a later server
(or a client) can verify without learning the permutation (spec §4.4, "Proof structure").
*/

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::crypto::elgamal::{self, Ciphertext};
use crate::crypto::group_math::{GroupElement, IntegerGroup, Scalar};
use crate::crypto::hash::sha3_transcript;
use crate::crypto::zkp::{self, DleqProof, ShuffleProof};

/// The output of one server's shuffle step: the permuted, re-encrypted, partially-decrypted
/// ciphertexts; the permutation-and-reencryption proof; and, per output, the decryption
/// share this server removed plus the `(T_i, s_i)`-style proof that the share was correct.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShuffleStep {
    pub output: Vec<Ciphertext>,
    pub proof: ShuffleProof,
    pub decryption_shares: Vec<GroupElement>,
    pub decryption_proofs: Vec<DleqProof>,
}

/// The second Pedersen generator used for permutation commitments. `p = 2q + 1`, so squaring
/// any non-identity residue mod `p` lands in the order-`q` subgroup; hashing a counter into a
/// candidate and squaring it therefore produces an element of the right subgroup with no
/// party ever able to compute its discrete log relative to `g`, the same try-and-increment
/// approach as the original's `Crypto/BlogDrop/BlogDropUtils.cpp::GetHashedGenerator`.
fn second_generator(group: &IntegerGroup) -> GroupElement {
    for counter in 0u64.. {
        let digest = sha3_transcript(&[b"dissent-shuffle-second-generator", &counter.to_be_bytes()]);
        let candidate = BigUint::from_bytes_be(&digest) % &group.p;
        if candidate.is_zero() {
            continue;
        }
        let h = candidate.modpow(&BigUint::from(2u8), &group.p);
        if h != BigUint::one() {
            return GroupElement(h);
        }
    }
    unreachable!("subgroup of order q has more than one element for any realistic p")
}

fn ciphertexts_digest(group: &IntegerGroup, list: &[Ciphertext]) -> Scalar {
    let encoded: Vec<Vec<u8>> = list
        .iter()
        .flat_map(|ct| [ct.gamma.to_bytes(), ct.phi.to_bytes()])
        .collect();
    let refs: Vec<&[u8]> = encoded.iter().map(|b| b.as_slice()).collect();
    let digest = sha3_transcript(&refs);
    group.scalar_from_bytes(&digest)
}

fn product(group: &IntegerGroup, elements: impl Iterator<Item = GroupElement>) -> GroupElement {
    elements.fold(group.identity(), |acc, e| group.mul(&acc, &e))
}

/// Produces a fresh permutation-reencryption-and-partial-decryption step over `input` under
/// the joint public key `joint_pk`, using this server's shuffle-phase secret key.
pub fn produce_step(
    group: &IntegerGroup,
    joint_pk: &GroupElement,
    server_secret_key: &Scalar,
    input: &[Ciphertext],
    rng: &mut dyn CryptoRngCore,
) -> ShuffleStep {
    let k = input.len();
    let permutation = random_permutation(k, rng);
    let randomizers: Vec<Scalar> = (0..k).map(|_| elgamal::random_factor(group, rng)).collect();

    let mut reencrypted = vec![
        Ciphertext {
            gamma: group.identity(),
            phi: group.identity(),
        };
        k
    ];
    for i in 0..k {
        reencrypted[permutation[i]] = elgamal::reencrypt(group, joint_pk, &input[i], &randomizers[i]);
    }

    let mut output = Vec::with_capacity(k);
    let mut decryption_shares = Vec::with_capacity(k);
    let mut decryption_proofs = Vec::with_capacity(k);
    for ct in &reencrypted {
        let (decrypted, share) = elgamal::partial_decrypt(group, ct, server_secret_key);
        let proof = zkp::prove_dleq(group, &group.generator(), &ct.gamma, server_secret_key, rng);
        output.push(decrypted);
        decryption_shares.push(share);
        decryption_proofs.push(proof);
    }

    let gamma_challenge = ciphertexts_digest(group, input);
    let h = second_generator(group);

    let mut d = Vec::with_capacity(k);
    let mut commitment_randomizers = Vec::with_capacity(k);
    for &position in &permutation {
        let label = Scalar::from_u64((position + 1) as u64, group);
        let r_i = group.random_scalar(rng);
        let d_i = group.mul(&group.pow_g(&label), &group.pow(&h, &r_i));
        d.push(d_i);
        commitment_randomizers.push(r_i);
    }
    let tau = commitment_randomizers
        .iter()
        .fold(Scalar::from_u64(0, group), |acc, r| group.scalar_add(&acc, r));

    let w: Vec<Scalar> = permutation
        .iter()
        .map(|&position| {
            let label = Scalar::from_u64((position + 1) as u64, group);
            group.scalar_sub(&label, &gamma_challenge)
        })
        .collect();
    let k_shuffle = zkp::prove_k_shuffle(group, &h, &w, rng);

    let aggregate_r = randomizers
        .iter()
        .fold(Scalar::from_u64(0, group), |acc, r| group.scalar_add(&acc, r));
    let reencryption_knowledge = zkp::prove_dleq(group, &group.generator(), joint_pk, &aggregate_r, rng);

    ShuffleStep {
        output,
        proof: ShuffleProof {
            gamma: gamma_challenge,
            d,
            tau,
            k_shuffle,
            reencryption_knowledge,
        },
        decryption_shares,
        decryption_proofs,
    }
}

/// Verifies that `step.output` is a valid shuffle-and-partial-decryption of `input` under
/// `joint_pk` by the server whose shuffle-phase public key is `server_pk`, per `step.proof`
/// and `step.decryption_proofs`, without learning the permutation used.
pub fn verify_step(
    group: &IntegerGroup,
    joint_pk: &GroupElement,
    server_pk: &GroupElement,
    input: &[Ciphertext],
    step: &ShuffleStep,
) -> bool {
    let k = input.len();
    if step.output.len() != k
        || step.proof.d.len() != k
        || step.decryption_shares.len() != k
        || step.decryption_proofs.len() != k
    {
        return false;
    }

    for i in 0..k {
        if !zkp::verify_dleq(
            group,
            &group.generator(),
            &step.output[i].gamma,
            server_pk,
            &step.decryption_shares[i],
            &step.decryption_proofs[i],
        ) {
            return false;
        }
    }

    // Reconstruct the pre-decryption (permuted, re-encrypted only) list from the output and
    // the revealed shares, since partial decryption only divides `phi` and leaves `gamma`
    // untouched.
    let reencrypted: Vec<Ciphertext> = step
        .output
        .iter()
        .zip(step.decryption_shares.iter())
        .map(|(ct, share)| Ciphertext {
            gamma: ct.gamma.clone(),
            phi: group.mul(&ct.phi, share),
        })
        .collect();

    let expected_gamma = ciphertexts_digest(group, input);
    if step.proof.gamma != expected_gamma {
        return false;
    }

    let h = second_generator(group);

    let z: Vec<Scalar> = (0..k)
        .map(|i| group.scalar_sub(&Scalar::from_u64((i + 1) as u64, group), &step.proof.gamma))
        .collect();
    if !zkp::verify_k_shuffle(group, &h, &z, &step.proof.k_shuffle) {
        return false;
    }

    let sum_labels: u64 = (1..=k as u64).sum();
    let product_d = product(group, step.proof.d.iter().cloned());
    let expected_product = group.mul(
        &group.pow_g(&Scalar::from_u64(sum_labels, group)),
        &group.pow(&h, &step.proof.tau),
    );
    if product_d != expected_product {
        return false;
    }

    let l_gamma = group.div(
        &product(group, reencrypted.iter().map(|ct| ct.gamma.clone())),
        &product(group, input.iter().map(|ct| ct.gamma.clone())),
    );
    let l_phi = group.div(
        &product(group, reencrypted.iter().map(|ct| ct.phi.clone())),
        &product(group, input.iter().map(|ct| ct.phi.clone())),
    );
    zkp::verify_dleq(
        group,
        &group.generator(),
        joint_pk,
        &l_gamma,
        &l_phi,
        &step.proof.reencryption_knowledge,
    )
}

fn random_permutation(k: usize, rng: &mut dyn CryptoRngCore) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..k).collect();
    for i in (1..k).rev() {
        let j = (rng.next_u32() as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn honest_shuffle_step_verifies() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(101);

        let server_sk = group.random_scalar(&mut rng);
        let server_pk = group.pow_g(&server_sk);
        let other_sk = group.random_scalar(&mut rng);
        let joint_pk = group.mul(&server_pk, &group.pow_g(&other_sk));

        let input: Vec<Ciphertext> = (0..4)
            .map(|i| {
                let plaintext = group.pow_g(&Scalar::from_u64(i + 1, &group));
                elgamal::encrypt(&group, &joint_pk, &plaintext, &elgamal::random_factor(&group, &mut rng))
            })
            .collect();

        let step = produce_step(&group, &joint_pk, &server_sk, &input, &mut rng);
        assert!(verify_step(&group, &joint_pk, &server_pk, &input, &step));
    }

    #[test]
    fn tampered_output_fails_verification() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(102);
        let server_sk = group.random_scalar(&mut rng);
        let server_pk = group.pow_g(&server_sk);

        let input: Vec<Ciphertext> = (0..3)
            .map(|i| {
                let plaintext = group.pow_g(&Scalar::from_u64(i + 1, &group));
                elgamal::encrypt(&group, &server_pk, &plaintext, &elgamal::random_factor(&group, &mut rng))
            })
            .collect();

        let mut step = produce_step(&group, &server_pk, &server_sk, &input, &mut rng);
        step.output[0] = elgamal::reencrypt(&group, &server_pk, &step.output[0], &Scalar::from_u64(7, &group));
        assert!(!verify_step(&group, &server_pk, &server_pk, &input, &step));
    }

    #[test]
    fn wrong_server_key_fails_decryption_proof() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(103);
        let server_sk = group.random_scalar(&mut rng);
        let server_pk = group.pow_g(&server_sk);
        let impostor_pk = group.pow_g(&group.random_scalar(&mut rng));

        let input: Vec<Ciphertext> = (0..2)
            .map(|i| {
                let plaintext = group.pow_g(&Scalar::from_u64(i + 1, &group));
                elgamal::encrypt(&group, &server_pk, &plaintext, &elgamal::random_factor(&group, &mut rng))
            })
            .collect();

        let step = produce_step(&group, &server_pk, &server_sk, &input, &mut rng);
        assert!(!verify_step(&group, &server_pk, &impostor_pk, &input, &step));
    }
}
