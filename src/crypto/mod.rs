/*!
Cryptographic primitives (C2): hashing, long-term signing, Diffie-Hellman agreement,
keystream expansion, the ElGamal layer the shuffle runs over, and the shuffle's
zero-knowledge proofs. Every other module reaches the underlying group arithmetic only
through [`group_math`], so a toy group can stand in for tests without touching callers.
*/

pub mod dh;
pub mod elgamal;
pub mod group_math;
pub mod hash;
pub mod prg;
pub mod sign;
pub mod zkp;
