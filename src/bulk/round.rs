/*!
The CSBulk phase protocol (C8 — spec §4.5, "the central core"): admission, client-list
exchange, commit, reveal, validate, publish, and cleartext processing, cycling back to
admission for the next phase. Blame is entered by force-jumping the state machine out of
this cycle (spec §4.1, "`set_state` — force-jump used for blame entry").

As in `shuffle::protocol`, the phase-protocol logic is exposed as small, directly testable
functions and a state-machine wiring helper; `round_base`/`network` carry the actual bytes.
*/

use tracing::{debug, trace};

use crate::round_id::Phase;
use crate::state_machine::StateMachine;

/// The states a bulk round cycles through once per phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BulkState {
    Admission,
    ClientListExchange,
    Commit,
    Reveal,
    Validate,
    Publish,
    ProcessCleartext,
    Blame,
}

/// The message kind each cyclic state is waiting on. `ProcessCleartext` has no trigger
/// message of its own: it runs as soon as `Publish` completes, over data already collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkMsgKind {
    ClientCiphertext,
    ServerClientList,
    ServerCommit,
    ServerCiphertext,
    ServerValidation,
    ServerCleartext,
    ServerBlameBits,
    ServerRebuttalOrVerdict,
    ClientRebuttal,
    ServerVerdictSignature,
}

/// Builds the per-phase state machine wiring described by spec §4.5: a cycle through the
/// seven phase-protocol steps, returning to `Admission` (and bumping the phase counter) once
/// `ProcessCleartext` completes without triggering blame.
pub fn build_state_machine() -> StateMachine<BulkState, BulkMsgKind> {
    let mut sm = StateMachine::new(BulkState::Admission);
    sm.add_state(BulkState::Admission, Some(BulkMsgKind::ClientCiphertext));
    sm.add_state(BulkState::ClientListExchange, Some(BulkMsgKind::ServerClientList));
    sm.add_state(BulkState::Commit, Some(BulkMsgKind::ServerCommit));
    sm.add_state(BulkState::Reveal, Some(BulkMsgKind::ServerCiphertext));
    sm.add_state(BulkState::Validate, Some(BulkMsgKind::ServerValidation));
    sm.add_state(BulkState::Publish, Some(BulkMsgKind::ServerCleartext));
    sm.add_state(BulkState::ProcessCleartext, None);
    sm.add_state(BulkState::Blame, Some(BulkMsgKind::ServerBlameBits));

    sm.add_transition(BulkState::Admission, BulkState::ClientListExchange);
    sm.add_transition(BulkState::ClientListExchange, BulkState::Commit);
    sm.add_transition(BulkState::Commit, BulkState::Reveal);
    sm.add_transition(BulkState::Reveal, BulkState::Validate);
    sm.add_transition(BulkState::Validate, BulkState::Publish);
    sm.add_transition(BulkState::Publish, BulkState::ProcessCleartext);
    // No explicit transition out of ProcessCleartext: state_complete cycles it back to
    // Admission (bumping the phase), unless the round force-jumps to Blame first.
    sm.set_cycle_state(BulkState::Admission);

    sm
}

/// Tracks the hard and flex admission deadlines for one phase's client-submission window
/// (spec §4.5 step 1). The flex deadline only arms once the threshold fraction of the
/// expected client set has submitted; either deadline firing closes admission.
pub struct AdmissionWindow {
    phase_started_ms: u64,
    hard_deadline_ms: u64,
    flex_fraction: (u32, u32),
    expected_clients: usize,
    submitted: usize,
    threshold_reached_at_ms: Option<u64>,
}

impl AdmissionWindow {
    pub fn new(phase_started_ms: u64, hard_deadline_ms: u64, flex_fraction: (u32, u32), expected_clients: usize) -> Self {
        Self {
            phase_started_ms,
            hard_deadline_ms,
            flex_fraction,
            expected_clients,
            submitted: 0,
            threshold_reached_at_ms: None,
        }
    }

    /// Records one more accepted submission at `now_ms`, arming the flex deadline the moment
    /// the threshold fraction is first reached.
    pub fn record_submission(&mut self, now_ms: u64) {
        self.submitted += 1;
        trace!(submitted = self.submitted, expected = self.expected_clients, "client ciphertext accepted");
        if self.threshold_reached_at_ms.is_none() && self.threshold_met() {
            debug!(now_ms, submitted = self.submitted, "admission threshold reached, arming flex deadline");
            self.threshold_reached_at_ms = Some(now_ms);
        }
    }

    fn threshold_met(&self) -> bool {
        let (num, den) = self.flex_fraction;
        self.submitted as u64 * den as u64 >= self.expected_clients as u64 * num as u64
    }

    /// Whether admission should close at `now_ms`: either the hard deadline elapsed, or the
    /// flex deadline (armed for the same elapsed-since-phase-start duration it took to reach
    /// the threshold) has now elapsed a second time since being armed.
    pub fn should_close(&self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.phase_started_ms) >= self.hard_deadline_ms {
            return true;
        }
        match self.threshold_reached_at_ms {
            Some(armed_at) => {
                let time_to_threshold = armed_at.saturating_sub(self.phase_started_ms);
                now_ms.saturating_sub(armed_at) >= time_to_threshold
            }
            None => false,
        }
    }
}

/// Resolves overlapping client-list bits across servers (spec §4.5 step 2): the first
/// server, in subgroup order, to have accepted a given client wins; every other server's
/// claim to that client is dropped.
pub fn resolve_overlapping_served(server_reports: &[Vec<bool>]) -> Vec<usize> {
    let Some(client_count) = server_reports.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut served_by = vec![None; client_count];
    for (server_idx, report) in server_reports.iter().enumerate() {
        for (client_idx, &served) in report.iter().enumerate() {
            if served && served_by[client_idx].is_none() {
                served_by[client_idx] = Some(server_idx);
            }
        }
    }
    served_by.into_iter().flatten().collect()
}

/// Parses the processed cleartext (spec §4.5 step 7): the leading bit-field announcing
/// next-phase slot openings, followed by the concatenated payload bytes of every
/// currently-open slot.
pub fn split_bitfield(cleartext: &[u8], bitfield_bytes: usize) -> (&[u8], &[u8]) {
    cleartext.split_at(bitfield_bytes.min(cleartext.len()))
}

pub fn bitfield_bit(bitfield: &[u8], slot_idx: usize) -> bool {
    let byte_idx = slot_idx / 8;
    let shift = slot_idx % 8;
    bitfield.get(byte_idx).map(|b| (b >> shift) & 1 == 1).unwrap_or(false)
}

/// Advances a client's own next-phase slot-opening decision into the shared bit-field, at
/// its slot index.
pub fn set_bitfield_bit(bitfield: &mut [u8], slot_idx: usize, open: bool) {
    let byte_idx = slot_idx / 8;
    let shift = slot_idx % 8;
    if let Some(byte) = bitfield.get_mut(byte_idx) {
        if open {
            *byte |= 1 << shift;
        } else {
            *byte &= !(1 << shift);
        }
    }
}

/// What the round does after processing one phase's cleartext (spec §4.5 step 7 / §4.5
/// "Blame sub-protocol" entry point).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleartextOutcome {
    /// The owner's slot decoded as expected; continue to the next phase normally.
    Continue,
    /// The owner's own slot did not match what it wrote; blame must start.
    MismatchDetected { phase: Phase },
}

/// Compares a client's own slot (as it was written) against what actually came out of the
/// published cleartext at its offset, per spec §4.5 step 7's final check.
pub fn check_own_slot(written: &[u8], published_at_offset: &[u8], phase: Phase) -> CleartextOutcome {
    if written == published_at_offset {
        CleartextOutcome::Continue
    } else {
        debug!(?phase, "own slot corrupted, entering blame");
        CleartextOutcome::MismatchDetected { phase }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_deadline_closes_admission_even_without_threshold() {
        let window = AdmissionWindow::new(0, 30_000, (2, 3), 10);
        assert!(!window.should_close(29_999));
        assert!(window.should_close(30_000));
    }

    #[test]
    fn flex_deadline_closes_admission_after_threshold_plus_elapsed_time() {
        let mut window = AdmissionWindow::new(0, 30_000, (2, 3), 9);
        // Threshold is 6/9 clients; reached at t=5_000.
        for _ in 0..6 {
            window.record_submission(5_000);
        }
        assert!(!window.should_close(9_999));
        assert!(window.should_close(10_000));
    }

    #[test]
    fn overlapping_client_claims_resolve_to_first_server_in_order() {
        let reports = vec![vec![true, false, true], vec![true, true, false]];
        let served_by = resolve_overlapping_served(&reports);
        assert_eq!(served_by, vec![0, 1, 0]);
    }

    #[test]
    fn bitfield_bits_round_trip() {
        let mut bitfield = vec![0u8; 2];
        set_bitfield_bit(&mut bitfield, 3, true);
        set_bitfield_bit(&mut bitfield, 9, true);
        assert!(bitfield_bit(&bitfield, 3));
        assert!(bitfield_bit(&bitfield, 9));
        assert!(!bitfield_bit(&bitfield, 0));
        set_bitfield_bit(&mut bitfield, 3, false);
        assert!(!bitfield_bit(&bitfield, 3));
    }

    #[test]
    fn mismatched_own_slot_triggers_blame() {
        let outcome = check_own_slot(b"written", b"differen", Phase(4));
        assert_eq!(outcome, CleartextOutcome::MismatchDetected { phase: Phase(4) });
        assert_eq!(check_own_slot(b"same", b"same", Phase(0)), CleartextOutcome::Continue);
    }

    #[test]
    fn state_machine_cycles_through_every_phase_step() {
        use crate::group::ParticipantId;

        let mut sm = build_state_machine();
        let dummy_sender = crate::testing::test_identity(0).id;
        let envelope = |kind: BulkMsgKind, sender: ParticipantId| crate::state_machine::Envelope {
            kind,
            phase: Phase(0),
            sender,
            payload: Vec::new(),
        };

        assert!(sm.accept(envelope(BulkMsgKind::ClientCiphertext, dummy_sender)).is_some());
        sm.state_complete();
        assert_eq!(sm.current_state(), &BulkState::ClientListExchange);

        assert!(sm.accept(envelope(BulkMsgKind::ServerClientList, dummy_sender)).is_some());
        sm.state_complete();
        assert_eq!(sm.current_state(), &BulkState::Commit);

        assert!(sm.accept(envelope(BulkMsgKind::ServerCommit, dummy_sender)).is_some());
        sm.state_complete();
        assert_eq!(sm.current_state(), &BulkState::Reveal);

        assert!(sm.accept(envelope(BulkMsgKind::ServerCiphertext, dummy_sender)).is_some());
        sm.state_complete();
        assert_eq!(sm.current_state(), &BulkState::Validate);

        assert!(sm.accept(envelope(BulkMsgKind::ServerValidation, dummy_sender)).is_some());
        sm.state_complete();
        assert_eq!(sm.current_state(), &BulkState::Publish);

        assert!(sm.accept(envelope(BulkMsgKind::ServerCleartext, dummy_sender)).is_some());
        sm.state_complete();
        assert_eq!(sm.current_state(), &BulkState::ProcessCleartext);

        assert_eq!(sm.phase(), Phase(0));
        sm.state_complete();
        assert_eq!(sm.current_state(), &BulkState::Admission);
        assert_eq!(sm.phase(), Phase(1));
    }

    #[test]
    fn blame_force_jump_leaves_the_normal_cycle() {
        let mut sm = build_state_machine();
        sm.set_state(BulkState::Blame);
        assert_eq!(sm.current_state(), &BulkState::Blame);
    }
}
