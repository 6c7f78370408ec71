/*!
The network adapter contract (C5, consumed; spec §4.2).

`round_base` builds verifiable (signed) broadcast on top of this plain transport; the
transport itself only promises best-effort ordered unicast and a flat broadcast to
currently-connected members, not Byzantine atomic broadcast — the protocol tolerates
equivocation through commitments rather than relying on broadcast atomicity.
*/

use crate::error::LocalError;
use crate::group::ParticipantId;

/// Delivered to a round when a peer connects or disconnects mid-round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(ParticipantId),
    Disconnected(ParticipantId),
}

/// The transport a round is driven by. Implementations may be a real socket layer or
/// [`crate::testing::InMemoryNetwork`] wrapped to satisfy this trait.
pub trait Network {
    /// Best-effort ordered delivery to `peer`. The transport handles retries within a
    /// session but does not guarantee delivery.
    fn send(&mut self, peer: ParticipantId, payload: &[u8]) -> Result<(), LocalError>;

    /// Sends to every currently-connected member.
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), LocalError>;

    /// Currently-connected members this node can reach.
    fn connected_peers(&self) -> Vec<ParticipantId>;
}
