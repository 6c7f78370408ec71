/*!
Sender-anonymous group broadcast over a fixed server/client membership.

This crate is the anonymity core of a Dissent-style system: a small,
anytrust committee of servers and a larger set of clients run a sequence of
**rounds** that publish messages such that no coalition short of every
server can link a published message to its submitter, and a Byzantine
minority can be caught and named rather than silently corrupting the
output.

Two round families cover the protocol:

- [`shuffle`] — a Neff-style verifiable shuffle, used both to anonymize a
  batch of client payloads directly and to anonymize the ephemeral keys a
  [`bulk`] round uses to assign anonymous slots.
- [`bulk`] — a DC-net-style bulk round: clients and servers jointly XOR
  per-phase keystreams into a shared cleartext, with a blame sub-protocol
  that attributes any corruption to a specific client or server.

Everything both round families share — the participant roster
([`group`]), the cryptographic building blocks ([`crypto`]), the generic
state-machine control flow ([`state_machine`]), timers ([`timer`]), the
network contract a transport implements ([`network`]), round lifecycle and
verifiable broadcast ([`round_base`]), wire messages ([`message`]), round
identifiers ([`round_id`]), the error/outcome boundary crossed into the
enclosing session orchestrator ([`error`], [`outcome`]), and negotiated
parameters ([`config`]) — lives at the crate root next to them.

Transport, long-term key storage, the session orchestrator that sequences
rounds and admits late clients, and the SOCKS tunnel that feeds plaintext
streams in and out are all out of scope: this crate only implements the
round engine they drive.
*/

pub mod bulk;
pub mod config;
pub mod crypto;
pub mod error;
pub mod group;
pub mod message;
pub mod network;
pub mod outcome;
pub mod round_base;
pub mod round_id;
pub mod shuffle;
pub mod state_machine;
pub mod timer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{LocalError, ProtocolError, ReceiveError, RemoteError};
pub use group::{Group, Identity, ParticipantId, Roster};
pub use outcome::RoundOutcome;
pub use round_id::{Phase, RoundId};
