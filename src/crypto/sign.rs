/*!
Long-term signing (C2). Every server-to-server and server-to-client control message that
must survive to be shown to a third party (shuffle transcripts, blame verdicts, disconnect
announcements) is signed with the participant's long-term Ed25519 key, mirroring the
original implementation's `CppPrivateKey`/`CppPublicKey` usage at the `Connections` layer.
*/

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;

use crate::error::LocalError;

pub fn generate_signing_key(rng: &mut dyn CryptoRngCore) -> SigningKey {
    SigningKey::generate(rng)
}

/// Signs `message`, returning the bytes to attach to the outgoing wire message.
pub fn sign(key: &SigningKey, message: &[u8]) -> Signature {
    key.sign(message)
}

/// Verifies `signature` over `message` under `key`, returning a [`LocalError`] wrapper because
/// a signature failure on a message we otherwise trust the transport to have delivered intact
/// is itself evidence of misbehavior, not a bug in this node — callers that need a provable
/// fault should convert the failure into a [`crate::error::ProtocolError`] at the call site.
pub fn verify(key: &VerifyingKey, message: &[u8], signature: &Signature) -> Result<(), LocalError> {
    key.verify_strict(message, signature)
        .map_err(|err| LocalError::new(format!("signature verification failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn sign_then_verify_round_trips() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let key = generate_signing_key(&mut rng);
        let sig = sign(&key, b"hello");
        assert!(verify(&key.verifying_key(), b"hello", &sig).is_ok());
        assert!(verify(&key.verifying_key(), b"tampered", &sig).is_err());
    }
}
