/*!
Non-interactive zero-knowledge proofs for the Neff shuffle (C2, consumed by C7).

The shuffle's transcript (spec glossary: `Gamma`, `A`/`C`/`U`/`W`/`(Delta_0,
Delta_1)` for the reencryption equality, `D`/`sigma`/`tau` for the
permutation-of-products equality, `Theta`/`alpha` for the simple k-shuffle
sub-proof) is realized here with two building blocks rather than one field per
named transcript component: a discrete-log-equality (Chaum-Pedersen) proof
for decryption shares and for the aggregate reencryption-knowledge check, and
a telescoped-commitment proof (the "simple k-shuffle") for the
permutation-validity check. Both are made non-interactive by Fiat-Shamir
hashing with [`crate::crypto::hash::sha3_transcript`], following the same
commit/challenge/response shape the original implementation's
`CppShuffleRound` transcript uses.
*/

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::group_math::{GroupElement, IntegerGroup, Scalar};
use super::hash::sha3_transcript;

/// Proof of knowledge of `x` such that `a = g^x` and `b = h^x`, for two bases `g`, `h`.
/// Used both for a server's partial-decryption share (base `g`, its long-term public key;
/// base `gamma`, its decryption share) and for the aggregate reencryption-knowledge check
/// (base `g`; base the joint public key `Y`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DleqProof {
    pub commit_g: GroupElement,
    pub commit_h: GroupElement,
    pub response: Scalar,
}

pub fn prove_dleq(
    group: &IntegerGroup,
    g: &GroupElement,
    h: &GroupElement,
    x: &Scalar,
    rng: &mut dyn CryptoRngCore,
) -> DleqProof {
    let k = group.random_scalar(rng);
    let commit_g = group.pow(g, &k);
    let commit_h = group.pow(h, &k);
    let a = group.pow(g, x);
    let b = group.pow(h, x);
    let challenge = fiat_shamir_scalar(group, &[g, h, &a, &b, &commit_g, &commit_h]);
    let response = group.scalar_add(&k, &group.scalar_mul(&challenge, x));
    DleqProof {
        commit_g,
        commit_h,
        response,
    }
}

pub fn verify_dleq(
    group: &IntegerGroup,
    g: &GroupElement,
    h: &GroupElement,
    a: &GroupElement,
    b: &GroupElement,
    proof: &DleqProof,
) -> bool {
    let challenge = fiat_shamir_scalar(group, &[g, h, a, b, &proof.commit_g, &proof.commit_h]);
    let lhs_g = group.pow(g, &proof.response);
    let rhs_g = group.mul(&proof.commit_g, &group.pow(a, &challenge));
    let lhs_h = group.pow(h, &proof.response);
    let rhs_h = group.mul(&proof.commit_h, &group.pow(b, &challenge));
    lhs_g == rhs_g && lhs_h == rhs_h
}

fn fiat_shamir_scalar(group: &IntegerGroup, elements: &[&GroupElement]) -> Scalar {
    let bytes: Vec<Vec<u8>> = elements.iter().map(|e| e.to_bytes()).collect();
    let refs: Vec<&[u8]> = bytes.iter().map(|b| b.as_slice()).collect();
    let digest = sha3_transcript(&refs);
    group.scalar_from_bytes(&digest)
}

/// The "simple k-shuffle" sub-proof: proves that secret exponents `w_1..w_k` known to the
/// prover are a permutation of the public exponents `z_1..z_k`, without revealing which.
///
/// Construction: the prover telescopes commitments `Theta_i = Theta_{i-1}^{w_i} * h^{u_i}`
/// for fresh blinding `u_i`; since `{w_i}` is a multiset-permutation of `{z_i}`, the product
/// `Theta_k` must equal `Theta_0^{prod(z)} * h^{sum(u_i * suffix(z, i+1))}` if and only if the
/// claim holds, which the verifier checks with no knowledge of the permutation itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KShuffleProof {
    pub theta0: GroupElement,
    /// `Theta_1 .. Theta_k`, in order; `theta.last()` is the final aggregate commitment.
    pub theta: Vec<GroupElement>,
    /// The blinding values `u_1 .. u_k` used at each telescoping step.
    pub alpha: Vec<Scalar>,
}

pub fn prove_k_shuffle(group: &IntegerGroup, h: &GroupElement, w: &[Scalar], rng: &mut dyn CryptoRngCore) -> KShuffleProof {
    let u0 = group.random_scalar(rng);
    let theta0 = group.pow(h, &u0);
    let mut prev = theta0.clone();
    let mut theta = Vec::with_capacity(w.len());
    let mut alpha = Vec::with_capacity(w.len());
    for w_i in w {
        let u_i = group.random_scalar(rng);
        prev = group.mul(&group.pow(&prev, w_i), &group.pow(h, &u_i));
        theta.push(prev.clone());
        alpha.push(u_i);
    }
    KShuffleProof { theta0, theta, alpha }
}

pub fn verify_k_shuffle(group: &IntegerGroup, h: &GroupElement, z: &[Scalar], proof: &KShuffleProof) -> bool {
    let k = z.len();
    if proof.theta.len() != k || proof.alpha.len() != k {
        return false;
    }
    // suffix[i] = z[i] * z[i+1] * ... * z[k-1], suffix[k] = 1 (empty product)
    let mut suffix = vec![Scalar::from_u64(1, group)];
    for z_i in z.iter().rev() {
        let next = group.scalar_mul(z_i, suffix.last().expect("non-empty"));
        suffix.push(next);
    }
    suffix.reverse(); // suffix[i] now corresponds to product of z[i..]

    let product_z = suffix[0].clone();
    let mut v = Scalar::from_u64(0, group);
    for (i, alpha_i) in proof.alpha.iter().enumerate() {
        let multiplier = &suffix[i + 1];
        v = group.scalar_add(&v, &group.scalar_mul(alpha_i, multiplier));
    }

    let expected = group.mul(&group.pow(&proof.theta0, &product_z), &group.pow(h, &v));
    match proof.theta.last() {
        Some(final_theta) => *final_theta == expected,
        None => false,
    }
}

/// The shuffle round's full proof for one server's permutation-and-partial-decryption step.
///
/// `d`/`tau` carry the permutation commitments and their aggregate opening (the
/// "permutation-of-products equality": any valid permutation of `1..=k` sums to the same
/// constant, `k(k+1)/2`, as the identity permutation); `k_shuffle` is the accompanying
/// "simple k-shuffle" argument that strengthens this into a full permutation proof;
/// `reencryption_knowledge` proves the aggregate reencryption randomness without revealing
/// the per-item mapping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShuffleProof {
    pub gamma: Scalar,
    pub d: Vec<GroupElement>,
    pub tau: Scalar,
    pub k_shuffle: KShuffleProof,
    pub reencryption_knowledge: DleqProof,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn dleq_proof_verifies_for_honest_prover() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let g = group.generator();
        let h = group.pow_g(&group.random_scalar(&mut rng));
        let x = group.random_scalar(&mut rng);
        let a = group.pow(&g, &x);
        let b = group.pow(&h, &x);
        let proof = prove_dleq(&group, &g, &h, &x, &mut rng);
        assert!(verify_dleq(&group, &g, &h, &a, &b, &proof));
    }

    #[test]
    fn dleq_proof_rejects_mismatched_exponents() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(32);
        let g = group.generator();
        let h = group.pow_g(&group.random_scalar(&mut rng));
        let x = group.random_scalar(&mut rng);
        let y = group.random_scalar(&mut rng);
        let a = group.pow(&g, &x);
        let b = group.pow(&h, &y);
        let proof = prove_dleq(&group, &g, &h, &x, &mut rng);
        assert!(!verify_dleq(&group, &g, &h, &a, &b, &proof));
    }

    #[test]
    fn k_shuffle_proof_accepts_a_genuine_permutation() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(33);
        let h = group.pow_g(&group.random_scalar(&mut rng));
        let gamma = group.random_scalar(&mut rng);

        let k = 5usize;
        let z: Vec<Scalar> = (1..=k as u64)
            .map(|i| group.scalar_sub(&Scalar::from_u64(i, &group), &gamma))
            .collect();

        let permutation = [3usize, 1, 4, 0, 2];
        let w: Vec<Scalar> = permutation
            .iter()
            .map(|&i| group.scalar_sub(&Scalar::from_u64((i + 1) as u64, &group), &gamma))
            .collect();

        let proof = prove_k_shuffle(&group, &h, &w, &mut rng);
        assert!(verify_k_shuffle(&group, &h, &z, &proof));
    }

    #[test]
    fn k_shuffle_proof_rejects_a_non_permutation() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(34);
        let h = group.pow_g(&group.random_scalar(&mut rng));
        let gamma = group.random_scalar(&mut rng);

        let k = 4usize;
        let z: Vec<Scalar> = (1..=k as u64)
            .map(|i| group.scalar_sub(&Scalar::from_u64(i, &group), &gamma))
            .collect();

        // Not a permutation: repeats index 1 twice instead of covering 1..=4.
        let bogus = [0usize, 0, 2, 3];
        let w: Vec<Scalar> = bogus
            .iter()
            .map(|&i| group.scalar_sub(&Scalar::from_u64((i + 1) as u64, &group), &gamma))
            .collect();

        let proof = prove_k_shuffle(&group, &h, &w, &mut rng);
        assert!(!verify_k_shuffle(&group, &h, &z, &proof));
    }
}
