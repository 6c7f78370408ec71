/*!
The control backbone of every round (C3, spec §4.1): named states, a directed transition
table, a distinguished "cycle state" that multi-phase rounds return to (implicitly bumping
the phase counter), and message buffering for messages that arrive before the state machine
is ready for them.

This module owns only the bookkeeping; dispatching to a handler is left to the round
implementation (`shuffle::protocol`, `bulk::round`), which matches on its own state enum
after calling [`StateMachine::accept`] or [`StateMachine::state_complete`] to learn which
buffered messages are now releasable. The teacher's equivalent lets a `Round` register
boxed handler closures per state; here, with a small fixed family of round types known at
compile time, a match arm in the round's own code plays that role instead.
*/

use std::collections::{BTreeMap, VecDeque};

use crate::group::ParticipantId;
use crate::round_id::Phase;

/// One state's registration: whether it expects a triggering message kind, and whether
/// reaching it via `state_complete` should cycle back into the machine's cycle state
/// (bumping the phase) rather than following the ordinary transition table.
#[derive(Clone, Debug)]
struct StateDef<K> {
    trigger: Option<K>,
}

/// A message envelope as seen by the state machine: enough to decide whether it is
/// dispatchable now, must be buffered for a future phase, or discarded as stale.
#[derive(Clone, Debug)]
pub struct Envelope<K> {
    pub kind: K,
    pub phase: Phase,
    pub sender: ParticipantId,
    pub payload: Vec<u8>,
}

/// Generic state machine over a round-specific state enum `S` and message-kind enum `K`.
pub struct StateMachine<S, K> {
    states: BTreeMap<S, StateDef<K>>,
    transitions: BTreeMap<S, S>,
    cycle_state: Option<S>,
    current: S,
    phase: Phase,
    /// Messages for the current phase whose kind didn't match the state active when they
    /// arrived; replayed whenever the current state changes.
    pending_this_phase: VecDeque<Envelope<K>>,
    /// Messages for phases ahead of the current one; replayed whenever the phase advances.
    pending_future_phases: BTreeMap<Phase, Vec<Envelope<K>>>,
}

impl<S, K> StateMachine<S, K>
where
    S: Clone + Ord,
    K: Clone + Eq,
{
    pub fn new(initial: S) -> Self {
        Self {
            states: BTreeMap::new(),
            transitions: BTreeMap::new(),
            cycle_state: None,
            current: initial,
            phase: Phase::default(),
            pending_this_phase: VecDeque::new(),
            pending_future_phases: BTreeMap::new(),
        }
    }

    pub fn add_state(&mut self, name: S, trigger_msg_kind: Option<K>) {
        self.states.insert(name, StateDef { trigger: trigger_msg_kind });
    }

    pub fn add_transition(&mut self, from: S, to: S) {
        self.transitions.insert(from, to);
    }

    /// The state `state_complete` returns to after the terminal state of a phase, implicitly
    /// advancing the phase counter every time it is entered this way.
    pub fn set_cycle_state(&mut self, name: S) {
        self.cycle_state = Some(name);
    }

    pub fn current_state(&self) -> &S {
        &self.current
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Force-jumps to `name` without consulting the transition table (blame entry, fatal
    /// termination). Returns any buffered messages for the current phase now releasable.
    pub fn set_state(&mut self, name: S) -> Vec<Envelope<K>> {
        self.current = name;
        self.release_matching_pending()
    }

    /// Called by the round once the current state's work is done. Follows the transition
    /// table, or cycles back into the cycle state (bumping the phase) if the current state
    /// has no explicit successor and a cycle state is configured.
    pub fn state_complete(&mut self) -> Vec<Envelope<K>> {
        if let Some(next) = self.transitions.get(&self.current).cloned() {
            self.current = next;
        } else if let Some(cycle) = self.cycle_state.clone() {
            self.current = cycle;
            self.advance_phase();
        }
        self.release_matching_pending()
    }

    fn advance_phase(&mut self) {
        self.phase = self.phase.next();
        if let Some(envelopes) = self.pending_future_phases.remove(&self.phase) {
            self.pending_this_phase.extend(envelopes);
        }
    }

    /// Feeds one incoming envelope (already checked for the correct round id by the caller).
    /// Returns it immediately if it is dispatchable now; otherwise buffers it and returns
    /// nothing. Envelopes for a phase behind the current one are silently discarded, as any
    /// handler for them no longer exists (spec §4.1) — blame's explicit-phase consumption is
    /// handled by the blame module directly, bypassing this buffer entirely.
    pub fn accept(&mut self, envelope: Envelope<K>) -> Option<Envelope<K>> {
        if envelope.phase < self.phase {
            return None;
        }
        if envelope.phase > self.phase {
            self.pending_future_phases.entry(envelope.phase).or_default().push(envelope);
            return None;
        }
        match self.states.get(&self.current).and_then(|def| def.trigger.as_ref()) {
            Some(expected) if *expected == envelope.kind => Some(envelope),
            _ => {
                self.pending_this_phase.push_back(envelope);
                None
            }
        }
    }

    fn release_matching_pending(&mut self) -> Vec<Envelope<K>> {
        let Some(expected) = self.states.get(&self.current).and_then(|def| def.trigger.clone()) else {
            return Vec::new();
        };
        let mut remaining = VecDeque::new();
        let mut released = Vec::new();
        while let Some(envelope) = self.pending_this_phase.pop_front() {
            if envelope.kind == expected {
                released.push(envelope);
            } else {
                remaining.push_back(envelope);
            }
        }
        self.pending_this_phase = remaining;
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_identity;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
    enum St {
        WaitA,
        WaitB,
        Done,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        A,
        B,
    }

    fn envelope(kind: Kind, phase: u64) -> Envelope<Kind> {
        Envelope {
            kind,
            phase: Phase(phase),
            sender: test_identity(0).id,
            payload: Vec::new(),
        }
    }

    #[test]
    fn out_of_kind_messages_are_buffered_until_their_state() {
        let mut sm = StateMachine::new(St::WaitA);
        sm.add_state(St::WaitA, Some(Kind::A));
        sm.add_state(St::WaitB, Some(Kind::B));
        sm.add_state(St::Done, None);
        sm.add_transition(St::WaitA, St::WaitB);
        sm.add_transition(St::WaitB, St::Done);

        // B arrives before we've reached WaitB: buffered, not dispatched.
        assert!(sm.accept(envelope(Kind::B, 0)).is_none());
        // A arrives while we're in WaitA: dispatched immediately.
        assert!(sm.accept(envelope(Kind::A, 0)).is_some());

        let released = sm.state_complete();
        assert_eq!(sm.current_state(), &St::WaitB);
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].kind, Kind::B);
    }

    #[test]
    fn future_phase_messages_wait_for_the_phase_to_advance() {
        let mut sm = StateMachine::new(St::WaitA);
        sm.add_state(St::WaitA, Some(Kind::A));
        sm.set_cycle_state(St::WaitA);

        assert!(sm.accept(envelope(Kind::A, 1)).is_none());
        assert_eq!(sm.phase(), Phase(0));

        let released = sm.state_complete();
        assert_eq!(sm.phase(), Phase(1));
        assert_eq!(released.len(), 1);
    }

    #[test]
    fn past_phase_messages_are_discarded() {
        let mut sm = StateMachine::new(St::WaitA);
        sm.add_state(St::WaitA, Some(Kind::A));
        sm.set_cycle_state(St::WaitA);
        sm.state_complete(); // phase -> 1
        assert!(sm.accept(envelope(Kind::A, 0)).is_none());
    }
}
