use crate::model::{Participant, PeerId, ProtocolParseError};

/// Ordered participant list of a room.
///
/// Authoritative on the hub, reconciled from USERLIST snapshots on spokes.
/// Position 0 is shown as the host; it carries no privilege.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    participants: Vec<Participant>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the peer was already present.
    pub fn add(&mut self, participant: Participant) -> bool {
        if self.contains(&participant.peer_id) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    pub fn remove(&mut self, peer_id: &PeerId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.peer_id == peer_id)?;
        Some(self.participants.remove(index))
    }

    /// Replaces the list with `snapshot`, appending `local` if the snapshot
    /// omits it. Duplicates keep their first occurrence.
    pub fn replace_all(&mut self, snapshot: Vec<Participant>, local: &Participant) {
        let mut merged = Vec::with_capacity(snapshot.len() + 1);
        for participant in snapshot
            .into_iter()
            .chain(std::iter::once(local.clone()))
        {
            if !merged
                .iter()
                .any(|p: &Participant| p.peer_id == participant.peer_id)
            {
                merged.push(participant);
            }
        }
        self.participants = merged;
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.first()
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.peer_id == peer_id)
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.get(peer_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn to_vec(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    /// JSON text carried by a USERLIST envelope.
    pub fn to_snapshot(&self) -> String {
        // A list of plain string structs always serializes.
        serde_json::to_string(&self.participants).unwrap_or_else(|_| "[]".to_owned())
    }

    pub fn parse_snapshot(snapshot: &str) -> Result<Vec<Participant>, ProtocolParseError> {
        serde_json::from_str(snapshot).map_err(ProtocolParseError::UserList)
    }
}
