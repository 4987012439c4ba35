use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct Participant {
    #[serde(rename = "peerId")]
    pub peer_id: PeerId,
    #[serde(rename = "username")]
    pub display_name: String,
}

impl Participant {
    pub fn new(peer_id: PeerId, display_name: impl Into<String>) -> Self {
        Self {
            peer_id,
            display_name: display_name.into(),
        }
    }
}
