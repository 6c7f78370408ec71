/*!
Per-phase blame storage (C9, spec §4.6). Each server retains a fixed window of past
phases' submitted ciphertexts, slot offsets, and its own per-client keystream contribution,
so a deferred accusation can still be checked against what actually happened; entries older
than the window are dropped as new phases complete.
*/

use std::collections::BTreeMap;

use crate::round_id::Phase;

/// Everything a server keeps about one phase, for as long as the phase stays in the
/// retained window.
#[derive(Clone, Debug, Default)]
pub struct PhaseEntry {
    /// Each client's submitted ciphertext, by client index.
    pub client_ciphertexts: BTreeMap<usize, Vec<u8>>,
    /// Which server accepted which client's submission this phase (spec §4.5 step 2).
    pub served_by: BTreeMap<usize, usize>,
    /// Byte offset of each slot index within the aggregate.
    pub slot_offsets: BTreeMap<usize, usize>,
    pub aggregate_len: usize,
    /// This server's own PRG keystream contribution, by client index, kept so a later
    /// accusation can recompute the "expected" bit without re-deriving every DH secret.
    pub own_keystream_shares: BTreeMap<usize, Vec<u8>>,
}

/// A ring of the most recently completed phases, bounded by
/// [`crate::config::RoundParams::retained_phases`].
pub struct PhaseLog {
    retained: u32,
    entries: BTreeMap<Phase, PhaseEntry>,
}

impl PhaseLog {
    pub fn new(retained: u32) -> Self {
        Self {
            retained,
            entries: BTreeMap::new(),
        }
    }

    /// Records `entry` for `phase`, then evicts anything older than the retained window.
    /// Keeps exactly `retained` phases: `phase` itself plus the `retained - 1` before it.
    pub fn record(&mut self, phase: Phase, entry: PhaseEntry) {
        self.entries.insert(phase, entry);
        let cutoff = phase.0.saturating_sub(u64::from(self.retained).saturating_sub(1));
        self.entries.retain(|p, _| p.0 >= cutoff);
    }

    pub fn get(&self, phase: Phase) -> Option<&PhaseEntry> {
        self.entries.get(&phase)
    }

    /// Whether `phase` is still inside the retained window relative to the most recently
    /// recorded phase (spec §4.5, "the blame phase must still be in the retained window").
    pub fn is_retained(&self, phase: Phase) -> bool {
        self.entries.contains_key(&phase)
    }

    pub fn oldest_retained(&self) -> Option<Phase> {
        self.entries.keys().next().copied()
    }
}
