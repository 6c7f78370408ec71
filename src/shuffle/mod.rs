/*!
The Neff verifiable shuffle (C7, spec §4.4): a chain of servers jointly permute and
rerandomize a list of encrypted client inputs, with a non-interactively verifiable
transcript at every step. Used both to anonymize application payloads (`NeffDataShuffle`)
and to anonymize servers' per-session DH public keys ahead of a bulk round
(`NeffKeyShuffle`).
*/

pub mod kind;
pub mod protocol;
pub mod transcript;

pub use kind::ShuffleKind;
pub use protocol::{EphemeralKeys, ShuffleRun};
pub use transcript::ShuffleStep;
