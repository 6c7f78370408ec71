/*!
Layered ElGamal encryption under the servers' joint public key (C2, consumed by C7).

A client seed or data element is encrypted once under the product of every
server's public element, then partially decrypted by each server in subgroup
order as the shuffle proceeds, matching the threshold-decryption structure the
original Neff-shuffle-derived `NeffShuffleRound` relies on rather than a true
onion scheme (no server ever fully decrypts on its own).
*/

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::group_math::{GroupElement, IntegerGroup, Scalar};

/// An ElGamal ciphertext: `gamma = g^r`, `phi = m * Y^r` for joint public key `Y`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub gamma: GroupElement,
    pub phi: GroupElement,
}

/// Encrypts `plaintext` under the joint public key `joint_pk`, using randomness `r`.
pub fn encrypt(
    group: &IntegerGroup,
    joint_pk: &GroupElement,
    plaintext: &GroupElement,
    r: &Scalar,
) -> Ciphertext {
    let gamma = group.pow_g(r);
    let phi = group.mul(plaintext, &group.pow(joint_pk, r));
    Ciphertext { gamma, phi }
}

/// Re-randomizes `ciphertext` in place under the same joint public key, using fresh
/// randomness `r`. Used by each server during its shuffle step.
pub fn reencrypt(
    group: &IntegerGroup,
    joint_pk: &GroupElement,
    ciphertext: &Ciphertext,
    r: &Scalar,
) -> Ciphertext {
    Ciphertext {
        gamma: group.mul(&ciphertext.gamma, &group.pow_g(r)),
        phi: group.mul(&ciphertext.phi, &group.pow(joint_pk, r)),
    }
}

/// One server's partial decryption: strips that server's share `pk_i = g^{sk_i}` from `phi`,
/// returning the updated ciphertext and the decryption share `d_i = gamma^{sk_i}` that the
/// accompanying discrete-log-equality proof (`crypto::zkp::DleqProof`) attests to.
pub fn partial_decrypt(group: &IntegerGroup, ciphertext: &Ciphertext, secret_key: &Scalar) -> (Ciphertext, GroupElement) {
    let share = group.pow(&ciphertext.gamma, secret_key);
    let phi = group.div(&ciphertext.phi, &share);
    (
        Ciphertext {
            gamma: ciphertext.gamma.clone(),
            phi,
        },
        share,
    )
}

/// Picks a fresh randomizer for an encryption or re-encryption step.
pub fn random_factor(group: &IntegerGroup, rng: &mut dyn CryptoRngCore) -> Scalar {
    group.random_scalar(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn encrypt_reencrypt_and_full_partial_decrypt_recovers_plaintext() {
        let group = IntegerGroup::toy();
        let mut rng = ChaCha20Rng::seed_from_u64(21);

        let sk1 = group.random_scalar(&mut rng);
        let sk2 = group.random_scalar(&mut rng);
        let pk1 = group.pow_g(&sk1);
        let pk2 = group.pow_g(&sk2);
        let joint_pk = group.mul(&pk1, &pk2);

        let plaintext = group.pow_g(&Scalar::from_u64(42, &group));
        let r = random_factor(&group, &mut rng);
        let ct = encrypt(&group, &joint_pk, &plaintext, &r);

        let r2 = random_factor(&group, &mut rng);
        let ct = reencrypt(&group, &joint_pk, &ct, &r2);

        let (ct, _share1) = partial_decrypt(&group, &ct, &sk1);
        let (ct, _share2) = partial_decrypt(&group, &ct, &sk2);

        assert_eq!(ct.phi, plaintext);
    }
}
