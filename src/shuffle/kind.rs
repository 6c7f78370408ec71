/*!
Which element is being shuffled (spec §4.4: "used both for the data shuffle and the key
shuffle"). The two productions differ only in what payload is wrapped in the ElGamal
ciphertext and which wire tags they use ([`crate::message::Body::KeySubmit`] and friends vs
[`crate::message::Body::MsgSubmit`] and friends); the transcript and per-server step are
identical code either way.
*/

/// Which production of the shuffle is running. `NullShuffle` skips the cryptographic work
/// entirely and is only valid in a single-server configuration, for tests that want to
/// exercise round plumbing without paying for modular exponentiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShuffleKind {
    /// Anonymizes each server's per-session Diffie-Hellman public key ahead of a bulk round,
    /// so clients can seed their keystreams without servers learning which client is which.
    NeffKeyShuffle,
    /// Anonymizes client application payloads directly.
    NeffDataShuffle,
    /// No-op passthrough, for tests only.
    NullShuffle,
}

impl ShuffleKind {
    pub fn wire_label(self) -> &'static str {
        match self {
            ShuffleKind::NeffKeyShuffle => "key",
            ShuffleKind::NeffDataShuffle => "data",
            ShuffleKind::NullShuffle => "null",
        }
    }
}
