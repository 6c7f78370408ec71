/*!
The CSBulk round (C8, spec §4.5 — "the central core") and its supporting phase log (C9):
DC-net-style aggregation of client ciphertexts into a shared cleartext, keyed by slots
assigned during a prior Neff shuffle, with a blame sub-protocol that attributes any
corruption to a specific client or server.
*/

pub mod blame;
pub mod ciphertext;
pub mod phase_log;
pub mod round;
pub mod slot;

pub use phase_log::{PhaseEntry, PhaseLog};
pub use round::{AdmissionWindow, BulkMsgKind, BulkState};
pub use slot::SlotMessage;
