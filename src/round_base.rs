/*!
The lifecycle and broadcast helpers shared by both round families (C6, spec §4.3).

`RoundBase` owns everything a round needs regardless of which protocol it is running: the
group, local identity, round id, network handle, the data-producer/consumer callbacks that
connect a round to the application sending and receiving anonymous messages, and the
terminal-outcome bookkeeping. `shuffle::protocol` and `bulk::round` each hold one and drive
it; neither reimplements verifiable broadcast or termination bookkeeping.
*/

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use tracing::{debug, warn};

use crate::crypto::dh::DhKeyPair;
use crate::error::LocalError;
use crate::group::{Group, ParticipantId};
use crate::network::Network;
use crate::outcome::RoundOutcome;
use crate::round_id::RoundId;

/// A callback producing up to `max` bytes of outbound plaintext for this round to carry
/// anonymously, or an empty vector if the application has nothing to send right now.
pub type DataProducer = Box<dyn FnMut(usize) -> Vec<u8> + Send>;

/// A callback receiving bytes of plaintext this round has anonymously delivered.
pub type DataConsumer = Box<dyn FnMut(Vec<u8>) + Send>;

/// Why a round stopped before completing on its own.
#[derive(Debug, Clone)]
pub enum StopReason {
    ServerDisconnected(ParticipantId),
    ProtocolFault { description: String, culprit: Option<u32> },
    Requested,
}

pub struct RoundBase<N: Network> {
    pub group: Group,
    pub local_index: usize,
    signing_key: SigningKey,
    pub dh_keypair: DhKeyPair,
    pub round_id: RoundId,
    network: N,
    get_data: DataProducer,
    push_data: DataConsumer,
    successful: bool,
    interrupted: bool,
    bad_members: Vec<u32>,
    finished: bool,
    outcome: Option<RoundOutcome>,
}

impl<N: Network> RoundBase<N> {
    pub fn new(
        group: Group,
        local_index: usize,
        signing_key: SigningKey,
        dh_keypair: DhKeyPair,
        round_id: RoundId,
        network: N,
        get_data: DataProducer,
        push_data: DataConsumer,
    ) -> Self {
        Self {
            group,
            local_index,
            signing_key,
            dh_keypair,
            round_id,
            network,
            get_data,
            push_data,
            successful: false,
            interrupted: false,
            bad_members: Vec::new(),
            finished: false,
            outcome: None,
        }
    }

    pub fn local_id(&self) -> ParticipantId {
        self.group.get_id(self.local_index).expect("local_index always valid")
    }

    pub fn local_verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn pull_outbound_data(&mut self, max: usize) -> Vec<u8> {
        (self.get_data)(max)
    }

    pub fn deliver_cleartext(&mut self, bytes: Vec<u8>) {
        (self.push_data)(bytes);
    }

    /// Starts the round. A no-op placeholder for symmetry with `stop`/`on_finished`: the
    /// round-specific state machine is driven by the caller, not by `RoundBase` itself.
    pub fn start(&mut self) {
        debug!(round_id = ?self.round_id, local_index = self.local_index, "round starting");
        self.finished = false;
        self.outcome = None;
    }

    /// A peer reconnected mid-round. Per spec §B.4, reconnection of a *client* is a no-op
    /// (the bulk round simply sees it submit again next phase); this hook exists so callers
    /// don't have to special-case "nothing to do" at the call site.
    pub fn on_connect(&mut self, peer: ParticipantId) {
        debug!(round_id = ?self.round_id, peer = ?peer, "peer connected");
    }

    /// A peer disconnected mid-round (spec §4.2, §B.4). A disconnected server ends the round
    /// with [`StopReason::ServerDisconnected`] (no one is blamed, the session will retry);
    /// a disconnected client has no effect on the round itself — it simply stops being able
    /// to submit, and its slot closes next phase like any other missed submission.
    pub fn on_disconnect(&mut self, peer: ParticipantId) -> Option<StopReason> {
        let is_server = self.group.get_index(&peer).is_some_and(|idx| self.group.is_server(idx));
        if is_server {
            warn!(round_id = ?self.round_id, server = ?peer, "server disconnected mid-round");
            Some(StopReason::ServerDisconnected(peer))
        } else {
            debug!(round_id = ?self.round_id, client = ?peer, "client disconnected mid-round");
            None
        }
    }

    /// Stops the round for `reason`. Disconnection stops are never blamed; protocol faults
    /// name their culprit. Idempotent: once a round has finished, further calls (by any
    /// reason) return the outcome already recorded rather than mutating state again.
    pub fn stop(&mut self, reason: StopReason) -> RoundOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        self.finished = true;
        let outcome = match reason {
            StopReason::ServerDisconnected(_) | StopReason::Requested => {
                self.interrupted = true;
                warn!(round_id = ?self.round_id, "round stopped: transport interruption");
                RoundOutcome::interrupted("transport stop")
            }
            StopReason::ProtocolFault { description, culprit } => {
                self.successful = false;
                if let Some(idx) = culprit {
                    self.bad_members.push(idx);
                }
                warn!(round_id = ?self.round_id, culprit = ?culprit, reason = %description, "round stopped: protocol fault");
                RoundOutcome::blaming(self.bad_members.clone(), description)
            }
        };
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Idempotent like [`Self::stop`]: a round already finished keeps its original outcome.
    pub fn finish_successfully(&mut self) -> RoundOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        self.finished = true;
        self.successful = true;
        debug!(round_id = ?self.round_id, "round finished successfully");
        let outcome = RoundOutcome::success();
        self.outcome = Some(outcome.clone());
        outcome
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Signs `payload` and sends it to every member of the server subgroup.
    pub fn verifiable_broadcast_to_servers(&mut self, payload: &[u8]) -> Result<(), LocalError> {
        let signed = self.sign_envelope(payload);
        for server in self.group.servers() {
            if server.id != self.local_id() {
                self.network.send(server.id, &signed)?;
            }
        }
        Ok(())
    }

    /// Signs `payload` and sends it to every client this server currently has a connection
    /// to (the network layer's `connected_peers` is the source of truth for "currently").
    pub fn verifiable_broadcast_to_clients(&mut self, payload: &[u8]) -> Result<(), LocalError> {
        let signed = self.sign_envelope(payload);
        let connected: std::collections::BTreeSet<_> = self.network.connected_peers().into_iter().collect();
        for client in self.group.clients() {
            if connected.contains(&client.id) {
                self.network.send(client.id, &signed)?;
            }
        }
        Ok(())
    }

    /// Signs `payload` and unicasts it to `peer`.
    pub fn verifiable_send(&mut self, peer: ParticipantId, payload: &[u8]) -> Result<(), LocalError> {
        let signed = self.sign_envelope(payload);
        self.network.send(peer, &signed)
    }

    fn sign_envelope(&self, payload: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(payload);
        let mut out = Vec::with_capacity(payload.len() + 64);
        out.extend_from_slice(&signature.to_bytes());
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::group_math::IntegerGroup;
    use crate::testing::{test_identity, test_signing_key};

    /// A network stub that just counts sends, for exercising `RoundBase` lifecycle in
    /// isolation from any real transport.
    #[derive(Default)]
    struct CountingNetwork {
        sent: Vec<(ParticipantId, Vec<u8>)>,
        peers: Vec<ParticipantId>,
    }

    impl Network for CountingNetwork {
        fn send(&mut self, peer: ParticipantId, payload: &[u8]) -> Result<(), LocalError> {
            self.sent.push((peer, payload.to_vec()));
            Ok(())
        }
        fn broadcast(&mut self, payload: &[u8]) -> Result<(), LocalError> {
            for peer in self.peers.clone() {
                self.send(peer, payload)?;
            }
            Ok(())
        }
        fn connected_peers(&self) -> Vec<ParticipantId> {
            self.peers.clone()
        }
    }

    fn make_round_base(local_index: usize) -> RoundBase<CountingNetwork> {
        let members: Vec<_> = (0..3).map(test_identity).collect();
        let ids: Vec<_> = members.iter().map(|m| m.id).collect();
        let group = Group::new(members, 2);
        let round_id = RoundId::derive(b"n", &group, b"p");
        let mut rng = crate::testing::test_rng(99);
        let dh = DhKeyPair::generate(&IntegerGroup::toy(), &mut rng);
        let network = CountingNetwork {
            sent: Vec::new(),
            peers: ids,
        };
        RoundBase::new(
            group,
            local_index,
            test_signing_key(local_index as u32),
            dh,
            round_id,
            network,
            Box::new(|_| Vec::new()),
            Box::new(|_| {}),
        )
    }

    #[test]
    fn stop_is_idempotent() {
        let mut base = make_round_base(0);
        let first = base.stop(StopReason::ProtocolFault {
            description: "equivocation".into(),
            culprit: Some(1),
        });
        let second = base.stop(StopReason::Requested);
        assert_eq!(first.bad_members, second.bad_members);
        assert_eq!(first.successful, second.successful);
        assert_eq!(second.bad_members, vec![1]);
    }

    #[test]
    fn finish_after_stop_keeps_the_original_outcome() {
        let mut base = make_round_base(0);
        base.stop(StopReason::Requested);
        let outcome = base.finish_successfully();
        assert!(outcome.interrupted);
        assert!(!outcome.successful);
    }

    #[test]
    fn disconnecting_a_server_yields_a_stop_reason() {
        let mut base = make_round_base(2);
        let server_id = base.group.get_id(0).unwrap();
        assert!(matches!(base.on_disconnect(server_id), Some(StopReason::ServerDisconnected(_))));
    }

    #[test]
    fn disconnecting_a_client_is_a_no_op() {
        let mut base = make_round_base(0);
        let client_id = base.group.get_id(2).unwrap();
        assert!(base.on_disconnect(client_id).is_none());
    }

    #[test]
    fn verifiable_broadcast_to_servers_skips_self() {
        let mut base = make_round_base(0);
        base.verifiable_broadcast_to_servers(b"hello").unwrap();
        let sent_to: Vec<_> = base.network.sent.iter().map(|(peer, _)| *peer).collect();
        assert!(!sent_to.contains(&base.local_id()));
    }
}
