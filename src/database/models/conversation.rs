use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::PublicAccount;

/// A two-party thread. Participants are kept in canonical (sorted) order so
/// the unordered pair maps to exactly one stored key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub participants: [Uuid; 2],
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn pair_key(a: Uuid, b: Uuid) -> [Uuid; 2] {
        if a <= b {
            [a, b]
        } else {
            [b, a]
        }
    }

    pub fn includes(&self, account_id: Uuid) -> bool {
        self.participants.contains(&account_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub participants: Vec<PublicAccount>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
