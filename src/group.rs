/*!
The immutable participant roster (C1).

A [`Group`] is the ordered view of a [`Roster`] used by a single round: a
contiguous prefix is the server subgroup, the rest are clients. This mirrors
the split in the original implementation between `Identity::Roster` (the
long-term identity store) and `Anonymity::Group` (the per-round ordered
view), so the same roster can back several concurrently-running rounds.
*/

use std::collections::BTreeMap;
use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 160-bit participant identifier, derived from the participant's long-term
/// verification key. Total ordering is by byte value, per spec §3.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId([u8; 20]);

impl ParticipantId {
    /// Derives an id from a long-term verification key (SHA-256, truncated to 160 bits).
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", hex_encode(&self.0))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// One participant's long-term identity material: verification key and Diffie-Hellman public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: ParticipantId,
    pub verifying_key: VerifyingKey,
    pub dh_public: crate::crypto::dh::DhPublic,
}

/// The long-term identity store for the full membership, independent of any one round.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<Identity>,
}

impl Roster {
    pub fn new(members: Vec<Identity>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Identity] {
        &self.members
    }
}

/// An immutable, ordered participant roster for one round: a server-subgroup prefix
/// followed by the remaining clients.
#[derive(Debug, Clone)]
pub struct Group {
    roster: Vec<Identity>,
    server_count: usize,
    index_of: BTreeMap<ParticipantId, usize>,
}

impl Group {
    /// Builds a group from an already totally-ordered roster and a server subgroup size.
    pub fn new(roster: Vec<Identity>, server_count: usize) -> Self {
        assert!(server_count <= roster.len(), "server subgroup larger than the group");
        let index_of = roster
            .iter()
            .enumerate()
            .map(|(idx, member)| (member.id, idx))
            .collect();
        Self {
            roster,
            server_count,
            index_of,
        }
    }

    pub fn count(&self) -> usize {
        self.roster.len()
    }

    pub fn server_count(&self) -> usize {
        self.server_count
    }

    pub fn client_count(&self) -> usize {
        self.roster.len() - self.server_count
    }

    pub fn is_server(&self, idx: usize) -> bool {
        idx < self.server_count
    }

    pub fn get_index(&self, id: &ParticipantId) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    pub fn get_id(&self, idx: usize) -> Option<ParticipantId> {
        self.roster.get(idx).map(|member| member.id)
    }

    pub fn get_identity(&self, idx: usize) -> Option<&Identity> {
        self.roster.get(idx)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.index_of.contains_key(id)
    }

    pub fn servers(&self) -> &[Identity] {
        &self.roster[..self.server_count]
    }

    pub fn clients(&self) -> &[Identity] {
        &self.roster[self.server_count..]
    }

    /// The next id in group order after `id`, wrapping around. Used for "subgroup order" walks
    /// in the shuffle and blame protocols.
    pub fn next(&self, id: &ParticipantId) -> Option<ParticipantId> {
        let idx = self.get_index(id)?;
        let next_idx = (idx + 1) % self.roster.len();
        self.get_id(next_idx)
    }

    /// The id in group order before `id`, wrapping around.
    pub fn previous(&self, id: &ParticipantId) -> Option<ParticipantId> {
        let idx = self.get_index(id)?;
        let prev_idx = (idx + self.roster.len() - 1) % self.roster.len();
        self.get_id(prev_idx)
    }

    /// The next server after server index `idx`, wrapping within the server subgroup only.
    pub fn next_server(&self, idx: usize) -> usize {
        (idx + 1) % self.server_count
    }

    pub fn is_subset_of(&self, other: &Group) -> bool {
        self.roster.iter().all(|member| other.contains(&member.id))
    }

    /// Returns a new group with the given member removed. Groups are immutable in place;
    /// this always allocates a fresh one.
    pub fn without_member(&self, id: &ParticipantId) -> Self {
        let roster: Vec<_> = self.roster.iter().filter(|member| member.id != *id).cloned().collect();
        let server_count = if self.get_index(id).map(|idx| idx < self.server_count).unwrap_or(false) {
            self.server_count - 1
        } else {
            self.server_count
        };
        Self::new(roster, server_count)
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.server_count == other.server_count
            && self.roster.len() == other.roster.len()
            && self
                .roster
                .iter()
                .zip(other.roster.iter())
                .all(|(a, b)| a.id == b.id && a.verifying_key == b.verifying_key)
    }
}

impl Eq for Group {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_identity;

    #[test]
    fn next_and_previous_wrap_around() {
        let members: Vec<_> = (0..5).map(test_identity).collect();
        let ids: Vec<_> = members.iter().map(|m| m.id).collect();
        let group = Group::new(members, 3);

        assert_eq!(group.next(&ids[4]), Some(ids[0]));
        assert_eq!(group.previous(&ids[0]), Some(ids[4]));
        assert_eq!(group.next(&ids[1]), Some(ids[2]));
    }

    #[test]
    fn server_subgroup_split() {
        let members: Vec<_> = (0..5).map(test_identity).collect();
        let group = Group::new(members, 2);
        assert_eq!(group.servers().len(), 2);
        assert_eq!(group.clients().len(), 3);
        assert!(group.is_server(0));
        assert!(group.is_server(1));
        assert!(!group.is_server(2));
    }

    #[test]
    fn without_member_shrinks_server_count_when_relevant() {
        let members: Vec<_> = (0..4).map(test_identity).collect();
        let ids: Vec<_> = members.iter().map(|m| m.id).collect();
        let group = Group::new(members, 2);
        let shrunk = group.without_member(&ids[0]);
        assert_eq!(shrunk.count(), 3);
        assert_eq!(shrunk.server_count(), 1);

        let unaffected = group.without_member(&ids[3]);
        assert_eq!(unaffected.server_count(), 2);
    }
}
