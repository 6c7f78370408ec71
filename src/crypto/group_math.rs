/*!
The finite cyclic group used by the Neff shuffle and its DSA-style server keys (C2).

Per spec §9 ("Group choice is parameterizable... keep the abstraction so tests can
substitute a toy group"), every function that needs the group takes [`IntegerGroup`] as a
plain parameter rather than reaching for a process-wide instance, so tests substitute
[`IntegerGroup::toy`] at the call site and production code uses
[`IntegerGroup::rfc3526_2048`] — a safe-prime multiplicative group (the classical choice
for DSA/ElGamal, grounded in `original_source/src/Crypto/AbstractGroup/
IntegerGroup.{hpp,cpp}`).
*/

use std::fmt;

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

/// An element of the group (a residue mod `p`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupElement(pub(crate) BigUint);

impl fmt::Debug for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupElement({:x})", self.0)
    }
}

impl GroupElement {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

/// An exponent (a residue mod `q`, the subgroup order).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scalar(pub(crate) BigUint);

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({:x})", self.0)
    }
}

impl Scalar {
    pub fn from_u64(value: u64, group: &IntegerGroup) -> Self {
        Scalar(BigUint::from(value) % &group.q)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

/// A safe-prime multiplicative group: `p` prime, `q = (p - 1) / 2` the subgroup order,
/// `g` a generator of the order-`q` subgroup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegerGroup {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
}

impl IntegerGroup {
    /// The 2048-bit MODP group from RFC 3526 ("Group 14"), used as a safe prime with
    /// `q = (p-1)/2`. This is the production parameter set.
    pub fn rfc3526_2048() -> Self {
        const HEX_P: &str = concat!(
            "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E0",
            "88A67CC74020BBEA63B139B22514A08798E3404DDEF9519B3CD3A43",
            "1B302B0A6DF25F14374FE1356D6D51C245E485B576625E7EC6F44C4",
            "2E9A637ED6B0BFF5CB6F406B7EDEE386BFB5A899FA5AE9F24117C4B",
            "1FE649286651ECE45B3DC2007CB8A163BF0598DA48361C55D39A69",
            "163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB9ED52907",
            "7096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE",
            "3BE39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2B",
            "CBF6955817183995497CEA956AE515D2261898FA051015728E5A8A",
            "AAC42DAD33170D04507A33A85521ABDF1CBA64ECFB850458DBEF0A",
            "8AEA71575D060C7DB3970F85A6E1E4C7ABF5AE8CDB0933D71E8C94",
            "E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864D87602733EC8",
            "6A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E208",
            "E24FA074E5AB3143DB5BFCE0FD108E4B82D120A93AD2CAFFFFFFFF",
            "FFFFFFFF",
        );
        let p = BigUint::parse_bytes(HEX_P.as_bytes(), 16).expect("valid hex literal");
        let q = (&p - BigUint::one()) / BigUint::from(2u8);
        let g = BigUint::from(2u8);
        Self { p, q, g }
    }

    /// A small toy group for deterministic, fast-running tests.
    /// `p = 2*q + 1` with both `p` and `q` prime, `g` a generator of the order-`q` subgroup.
    pub fn toy() -> Self {
        // p = 2*3539 + 1 = 7079 (prime), q = 3539 (prime).
        let p = BigUint::from(7079u32);
        let q = BigUint::from(3539u32);
        let g = BigUint::from(3u32);
        Self { p, q, g }
    }

    pub fn identity(&self) -> GroupElement {
        GroupElement(BigUint::one())
    }

    pub fn generator(&self) -> GroupElement {
        GroupElement(self.g.clone())
    }

    pub fn pow(&self, base: &GroupElement, exponent: &Scalar) -> GroupElement {
        GroupElement(base.0.modpow(&exponent.0, &self.p))
    }

    pub fn pow_g(&self, exponent: &Scalar) -> GroupElement {
        self.pow(&self.generator(), exponent)
    }

    pub fn mul(&self, a: &GroupElement, b: &GroupElement) -> GroupElement {
        GroupElement((&a.0 * &b.0) % &self.p)
    }

    pub fn inverse(&self, a: &GroupElement) -> GroupElement {
        // a^{p-2} mod p, valid because p is prime (Fermat's little theorem).
        let exponent = &self.p - BigUint::from(2u8);
        GroupElement(a.0.modpow(&exponent, &self.p))
    }

    pub fn div(&self, a: &GroupElement, b: &GroupElement) -> GroupElement {
        self.mul(a, &self.inverse(b))
    }

    pub fn random_scalar(&self, rng: &mut dyn CryptoRngCore) -> Scalar {
        Scalar(rng.gen_biguint_below(&self.q))
    }

    pub fn scalar_add(&self, a: &Scalar, b: &Scalar) -> Scalar {
        Scalar((&a.0 + &b.0) % &self.q)
    }

    pub fn scalar_sub(&self, a: &Scalar, b: &Scalar) -> Scalar {
        let (q, a0, b0) = (&self.q, &a.0, &b.0);
        Scalar(((a0 + q) - (b0 % q)) % q)
    }

    pub fn scalar_mul(&self, a: &Scalar, b: &Scalar) -> Scalar {
        Scalar((&a.0 * &b.0) % &self.q)
    }

    /// Reduces an arbitrary byte string into a scalar via big-endian interpretation mod `q`.
    pub fn scalar_from_bytes(&self, bytes: &[u8]) -> Scalar {
        Scalar(BigUint::from_bytes_be(bytes).mod_floor(&self.q))
    }
}

/// A DSA-style keypair over an [`IntegerGroup`]: a secret exponent and its public element.
#[derive(Clone, Debug)]
pub struct DsaKeyPair {
    pub secret: Scalar,
    pub public: GroupElement,
}

impl DsaKeyPair {
    pub fn generate(group: &IntegerGroup, rng: &mut dyn CryptoRngCore) -> Self {
        let secret = group.random_scalar(rng);
        let public = group.pow_g(&secret);
        Self { secret, public }
    }
}
