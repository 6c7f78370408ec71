/*!
Test-only scaffolding (spec §A.4): deterministic identities, a toy crypto group, a virtual
clock, and an in-memory network, so round and protocol tests never touch real sockets or
real-time sleeps. Mirrors the role the teacher's `dev` module plays for its own protocol
tests, built for this crate's fixed round family instead of an arbitrary hosted protocol.
*/

#![cfg(any(test, feature = "testing"))]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ed25519_dalek::SigningKey;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::crypto::dh::DhKeyPair;
use crate::crypto::group_math::IntegerGroup;
use crate::group::{Identity, ParticipantId};

/// A deterministic signing keypair plus its derived identity, for a given index. Reusing the
/// same index always yields the same keys, so scenario tests can be replayed byte-for-byte.
pub fn test_identity(index: u32) -> Identity {
    let mut rng = ChaCha20Rng::seed_from_u64(u64::from(index) + 1);
    let signing_key = SigningKey::generate(&mut rng);
    let group = IntegerGroup::toy();
    let dh = DhKeyPair::generate(&group, &mut rng);
    Identity {
        id: ParticipantId::from_verifying_key(&signing_key.verifying_key()),
        verifying_key: signing_key.verifying_key(),
        dh_public: dh.public,
    }
}

/// A signing keypair alongside the test identity it was derived from, for tests that need to
/// actually sign messages (rather than just referencing the public identity).
pub fn test_signing_key(index: u32) -> SigningKey {
    let mut rng = ChaCha20Rng::seed_from_u64(u64::from(index) + 1);
    SigningKey::generate(&mut rng)
}

/// A rng seeded deterministically from an arbitrary label, for tests that need their own
/// randomness source without reaching for a shared global one.
pub fn test_rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

/// A clock under the test's direct control: time only ever moves when `advance` is called,
/// so timer-driven tests (missed shuffle windows, bulk round deadlines) are not flaky under
/// load. Grounded in the original implementation's `Timer::VirtualRun` / `UseVirtualTime` mode.
#[derive(Clone, Default)]
pub struct VirtualClock {
    now_ms: Rc<RefCell<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        *self.now_ms.borrow()
    }

    pub fn advance(&self, delta_ms: u64) {
        *self.now_ms.borrow_mut() += delta_ms;
    }
}

/// An in-memory, ordered delivery queue between participants, standing in for the real
/// network transport (C5) in tests. Messages are delivered in send order; nothing here
/// models loss or reordering, since those are exercised by constructing adversarial
/// scenarios explicitly rather than by randomizing the transport.
#[derive(Default)]
pub struct InMemoryNetwork {
    inboxes: std::collections::BTreeMap<ParticipantId, VecDeque<(ParticipantId, Vec<u8>)>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, from: ParticipantId, to: ParticipantId, payload: Vec<u8>) {
        self.inboxes.entry(to).or_default().push_back((from, payload));
    }

    pub fn broadcast(&mut self, from: ParticipantId, to: &[ParticipantId], payload: Vec<u8>) {
        for &recipient in to {
            if recipient != from {
                self.send(from, recipient, payload.clone());
            }
        }
    }

    pub fn recv(&mut self, who: &ParticipantId) -> Option<(ParticipantId, Vec<u8>)> {
        self.inboxes.get_mut(who).and_then(|queue| queue.pop_front())
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.values().all(VecDeque::is_empty)
    }
}

/// What one run of [`run_bulk_scenario_happy_path`] produced: the published cleartext for
/// every phase, and what each client's own slot derandomized to (phase-major, then
/// client-major), for the caller to check against the payloads it handed in.
pub struct BulkScenarioResult {
    pub cleartexts: Vec<Vec<u8>>,
    pub recovered_payloads: Vec<Vec<Vec<u8>>>,
    pub anonymous_verifying_keys: Vec<ed25519_dalek::VerifyingKey>,
}

/// Runs a multi-phase CSBulk aggregate end to end, entirely in memory, the way the happy path
/// of spec §8 Scenario A does: every client keeps one fixed-size slot open for the whole run,
/// every server serves a disjoint share of the clients, and every phase's cleartext is
/// recovered by XORing every client's and every server's ciphertext together (C8's
/// `bulk::ciphertext` functions; the slot layout is `bulk::slot::SlotMessage`). `payload_for`
/// is called once per `(client_idx, phase)` to get that slot's plaintext content.
pub fn run_bulk_scenario_happy_path(
    num_servers: usize,
    num_clients: usize,
    num_phases: usize,
    slot_payload_len: usize,
    mut payload_for: impl FnMut(usize, usize) -> Vec<u8>,
) -> BulkScenarioResult {
    use crate::bulk::ciphertext::{client_ciphertext, combine, per_phase_seed, server_ciphertext};
    use crate::bulk::slot::{SlotMessage, RANDOMIZER_SEED_LEN};
    use crate::config::SlotIntegrity;
    use crate::round_id::{Phase, RoundId};

    const SLOT_HEADER_LEN: usize = 13; // accusation(1) + phase(4) + next_length(4) + payload_len(4)
    const SLOT_SIGNATURE_LEN: usize = 64; // ed25519

    let group = IntegerGroup::toy();
    let mut rng = test_rng(9001);

    let server_dh: Vec<_> = (0..num_servers).map(|_| DhKeyPair::generate(&group, &mut rng)).collect();
    let client_dh: Vec<_> = (0..num_clients).map(|_| DhKeyPair::generate(&group, &mut rng)).collect();
    let anonymous_keys: Vec<_> = (0..num_clients).map(|_| SigningKey::generate(&mut rng)).collect();
    let served_by: Vec<usize> = (0..num_clients).map(|i| i % num_servers.max(1)).collect();

    let members: Vec<_> = (0..num_servers + num_clients).map(|i| test_identity(i as u32)).collect();
    let roster = crate::group::Group::new(members, num_servers);
    let round_id = RoundId::derive(b"bulk-scenario", &roster, b"params");

    let slot_len = RANDOMIZER_SEED_LEN + SLOT_HEADER_LEN + slot_payload_len + SLOT_SIGNATURE_LEN;
    let bitfield_bytes = num_clients.div_ceil(8);
    let aggregate_len = bitfield_bytes + num_clients * slot_len;
    let slot_offset = |client_idx: usize| bitfield_bytes + client_idx * slot_len;

    let mut cleartexts = Vec::with_capacity(num_phases);
    let mut recovered_payloads = Vec::with_capacity(num_phases);

    for phase in 0..num_phases {
        let phase_id = Phase(phase as u64);

        let client_cts: Vec<Vec<u8>> = (0..num_clients)
            .map(|i| {
                let per_server_seeds: Vec<[u8; 32]> = server_dh
                    .iter()
                    .map(|server| per_phase_seed(&client_dh[i].agree(&group, &server.public), phase_id, &round_id))
                    .collect();
                let slot_message = SlotMessage {
                    accusation: false,
                    phase: phase as u32,
                    next_length: slot_len as u32,
                    payload: payload_for(i, phase),
                };
                let slot_bytes = slot_message.randomize(&anonymous_keys[i], SlotIntegrity::Signed, slot_len, &mut rng);
                client_ciphertext(&per_server_seeds, aggregate_len, Some((slot_offset(i), &slot_bytes)))
            })
            .collect();

        let server_cts: Vec<Vec<u8>> = (0..num_servers)
            .map(|s| {
                let per_client_seeds: Vec<[u8; 32]> = (0..num_clients)
                    .filter(|&i| served_by[i] == s)
                    .map(|i| per_phase_seed(&server_dh[s].agree(&group, &client_dh[i].public), phase_id, &round_id))
                    .collect();
                server_ciphertext(&per_client_seeds, aggregate_len)
            })
            .collect();

        let cleartext = combine(client_cts.into_iter().chain(server_cts), aggregate_len);

        let mut phase_payloads = Vec::with_capacity(num_clients);
        for i in 0..num_clients {
            let slot_bytes = &cleartext[slot_offset(i)..slot_offset(i) + slot_len];
            let recovered = SlotMessage::derandomize_and_verify(
                slot_bytes,
                SlotIntegrity::Signed,
                Some(&anonymous_keys[i].verifying_key()),
            );
            phase_payloads.push(recovered.map(|m| m.payload).unwrap_or_default());
        }
        recovered_payloads.push(phase_payloads);
        cleartexts.push(cleartext);
    }

    let anonymous_verifying_keys = anonymous_keys.iter().map(SigningKey::verifying_key).collect();
    BulkScenarioResult {
        cleartexts,
        recovered_payloads,
        anonymous_verifying_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_deterministic() {
        let a = test_identity(5);
        let b = test_identity(5);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn in_memory_network_delivers_in_order() {
        let alice = test_identity(0).id;
        let bob = test_identity(1).id;
        let mut net = InMemoryNetwork::new();
        net.send(alice, bob, b"first".to_vec());
        net.send(alice, bob, b"second".to_vec());
        assert_eq!(net.recv(&bob).unwrap().1, b"first");
        assert_eq!(net.recv(&bob).unwrap().1, b"second");
        assert!(net.recv(&bob).is_none());
    }

    /// Spec §8 Scenario A: 3 servers, 5 clients, 3 phases of fixed-size payloads; every
    /// client's own slot must decode to exactly what it wrote, every phase.
    #[test]
    fn happy_path_bulk_scenario_recovers_every_clients_payload() {
        let result = run_bulk_scenario_happy_path(3, 5, 3, 32, |client_idx, phase| {
            vec![(client_idx * 31 + phase * 7 + 1) as u8; 32]
        });

        assert_eq!(result.cleartexts.len(), 3);
        for phase in 0..3 {
            for client_idx in 0..5 {
                let expected = vec![(client_idx * 31 + phase * 7 + 1) as u8; 32];
                assert_eq!(result.recovered_payloads[phase][client_idx], expected);
            }
        }
    }

    #[test]
    fn happy_path_bulk_scenario_is_deterministic_across_runs() {
        let payload_for = |client_idx: usize, phase: usize| vec![(client_idx + phase) as u8; 16];
        let a = run_bulk_scenario_happy_path(2, 4, 2, 16, payload_for);
        let b = run_bulk_scenario_happy_path(2, 4, 2, 16, payload_for);
        assert_eq!(a.cleartexts, b.cleartexts);
    }

    /// A single flipped bit in a client's published slot breaks its signature, the same
    /// detection step that starts blame in a running round (spec §4.5 step 7).
    #[test]
    fn a_corrupted_slot_fails_its_own_signature_check() {
        let mut result = run_bulk_scenario_happy_path(2, 3, 1, 16, |client_idx, _phase| vec![client_idx as u8; 16]);
        assert_eq!(result.recovered_payloads[0][1], vec![1u8; 16]);

        // Flip one bit inside client 1's slot region of the published cleartext.
        let bitfield_bytes = 3usize.div_ceil(8);
        let slot_len = 32 + 13 + 16 + 64;
        let victim_offset = bitfield_bytes + slot_len;
        result.cleartexts[0][victim_offset] ^= 0x01;

        let recovered = crate::bulk::slot::SlotMessage::derandomize_and_verify(
            &result.cleartexts[0][victim_offset..victim_offset + slot_len],
            crate::config::SlotIntegrity::Signed,
            Some(&result.anonymous_verifying_keys[1]),
        );
        assert!(recovered.is_none(), "a flipped bit must break the slot's own signature check");
    }

    #[test]
    fn virtual_clock_only_advances_explicitly() {
        let clock = VirtualClock::new();
        assert_eq!(clock.now_ms(), 0);
        clock.advance(1_000);
        assert_eq!(clock.now_ms(), 1_000);
    }
}
