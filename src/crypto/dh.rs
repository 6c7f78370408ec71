/*!
Pairwise Diffie-Hellman key agreement (C2).

Every client-server pair derives one shared secret over the lifetime of a
session; it seeds that pair's slice of the DC-net keystream (C8) and is the
witness the blame sub-protocol proves knowledge of without revealing it
(C8 `blame`). Grounded in `original_source/src/Crypto/DiffieHellman.{hpp,cpp}`,
which performs the same agreement over the same kind of multiplicative group.
*/

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::group_math::{GroupElement, IntegerGroup, Scalar};
use super::hash::sha256;

/// A Diffie-Hellman public value: a group element shared with the original spec's "DH bytes".
pub type DhPublic = GroupElement;

/// A long-term or per-session Diffie-Hellman keypair.
#[derive(Clone)]
pub struct DhKeyPair {
    secret: Scalar,
    pub public: DhPublic,
}

impl DhKeyPair {
    pub fn generate(group: &IntegerGroup, rng: &mut dyn CryptoRngCore) -> Self {
        let secret = group.random_scalar(rng);
        let public = group.pow_g(&secret);
        Self { secret, public }
    }

    /// Derives the shared secret with a peer's public value, hashing the agreed group element
    /// down to a fixed-size key suitable for seeding the bulk round's PRG.
    pub fn agree(&self, group: &IntegerGroup, their_public: &DhPublic) -> SharedSecret {
        let shared_element = group.pow(their_public, &self.secret);
        SharedSecret(sha256(&[&shared_element.to_bytes()]))
    }
}

/// A 256-bit secret shared between exactly two participants. Zeroized on drop; never
/// serialized.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SharedSecret(pub(crate) [u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A serializable DH public key, paired with the [`IntegerGroup`] it is valid under. Used only
/// where the wire format needs to be decoupled from the in-memory [`GroupElement`]
/// representation (currently nowhere; kept for symmetry with [`DhPublic`]).
#[derive(Clone, Serialize, Deserialize)]
pub struct DhPublicBytes(pub Vec<u8>);
