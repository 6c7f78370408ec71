/*!
Error types shared across the crate.

Follows the same split the teacher execution engine uses: a [`LocalError`]
for bugs in this node's own bookkeeping (never attributable to a peer), and a
[`RemoteError`] for a peer message that fails a check we cannot turn into
evidence a third party could verify. Provable faults (the ones that can be
turned into an `Evidence` and shown to someone who doesn't trust us) are
represented by [`ProtocolError`] instead.
*/

use std::fmt;

/// A bug in local state or an invariant violation; not attributable to any peer.
#[derive(displaydoc::Display, Debug, Clone)]
#[displaydoc("local error: {0}")]
pub struct LocalError(String);

impl LocalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::error::Error for LocalError {}

/// A peer's message failed a check, but the failure cannot be proven to a third party.
#[derive(displaydoc::Display, Debug, Clone)]
#[displaydoc("remote error: {0}")]
pub struct RemoteError(String);

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::error::Error for RemoteError {}

/// A provable protocol fault: a commit/reveal mismatch, a rejected shuffle transcript,
/// a signature failure over a message we can still show to someone else, or a blame verdict.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    pub description: String,
    /// Index of the party this error is attributed to, if known at construction time.
    pub culprit: Option<u32>,
}

impl ProtocolError {
    pub fn new(description: impl Into<String>, culprit: Option<u32>) -> Self {
        Self {
            description: description.into(),
            culprit,
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.culprit {
            Some(idx) => write!(f, "protocol error (party {idx}): {}", self.description),
            None => write!(f, "protocol error: {}", self.description),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// What went wrong processing one message, as returned from a round's `receive_message`-style entry point.
#[derive(Debug)]
pub enum ReceiveError {
    Local(LocalError),
    Remote(RemoteError),
    Protocol(ProtocolError),
}

impl From<LocalError> for ReceiveError {
    fn from(error: LocalError) -> Self {
        Self::Local(error)
    }
}

impl From<RemoteError> for ReceiveError {
    fn from(error: RemoteError) -> Self {
        Self::Remote(error)
    }
}

impl From<ProtocolError> for ReceiveError {
    fn from(error: ProtocolError) -> Self {
        Self::Protocol(error)
    }
}
