//! Conversations and chat messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;
use crate::error::{DomainError, DomainResult};
use crate::types::MediaType;

/// The two participants of a conversation, stored in canonical order.
///
/// Building the pair from `(a, b)` or `(b, a)` yields the same value, so a
/// unique index on `(user1_id, user2_id)` makes lookups direction-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationPair {
    first: Uuid,
    second: Uuid,
}

impl ConversationPair {
    pub fn new(a: Uuid, b: Uuid) -> DomainResult<Self> {
        if a == b {
            return Err(DomainError::Invalid {
                field: "other_user_id",
                message: "You cannot start a conversation with yourself",
            });
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    pub fn first(&self) -> Uuid {
        self.first
    }

    pub fn second(&self) -> Uuid {
        self.second
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.first == user_id || self.second == user_id
    }

    /// The participant that is not `user_id`
    pub fn other(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.first {
            Some(self.second)
        } else if user_id == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

/// A message inside a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A message is unread for everyone except its sender until seen
    pub fn is_unread_for(&self, reader_id: Uuid) -> bool {
        !self.seen && self.sender_id != reader_id
    }
}

/// Mark every message from the other party as seen.
///
/// Returns the ids that changed, which the caller persists.
pub fn mark_seen_by(messages: &mut [ChatMessage], reader_id: Uuid) -> Vec<Uuid> {
    messages
        .iter_mut()
        .filter(|m| m.is_unread_for(reader_id))
        .map(|m| {
            m.seen = true;
            m.id
        })
        .collect()
}

pub fn unread_count(messages: &[ChatMessage], reader_id: Uuid) -> usize {
    messages.iter().filter(|m| m.is_unread_for(reader_id)).count()
}

/// The participant shown opposite the current user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub company_name: Option<String>,
    pub responsible_name: Option<String>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
}

/// Preview of the latest message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: Uuid,
}

/// A conversation as listed for one participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user: ChatParticipant,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender_id: Uuid, seen: bool) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::nil(),
            sender_id,
            sender_name: "Ama".to_string(),
            content: "Bonjour".to_string(),
            media_type: MediaType::Text,
            media_url: None,
            seen,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_pair_is_order_independent() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(
            ConversationPair::new(a, b).unwrap(),
            ConversationPair::new(b, a).unwrap()
        );
    }

    #[test]
    fn test_pair_refuses_self() {
        let a = Uuid::new_v4();
        assert!(ConversationPair::new(a, a).is_err());
    }

    #[test]
    fn test_other_participant() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let pair = ConversationPair::new(a, b).unwrap();
        assert_eq!(pair.other(a), Some(b));
        assert_eq!(pair.other(b), Some(a));
        assert_eq!(pair.other(Uuid::new_v4()), None);
    }

    #[test]
    fn test_reader_marks_only_incoming_messages() {
        let (reader, other) = (Uuid::new_v4(), Uuid::new_v4());
        let mut messages = vec![
            message(other, false),
            message(reader, false),
            message(other, false),
            message(other, true),
        ];

        assert_eq!(unread_count(&messages, reader), 2);
        let changed = mark_seen_by(&mut messages, reader);

        assert_eq!(changed, vec![messages[0].id, messages[2].id]);
        assert!(messages[0].seen && messages[2].seen);
        assert!(!messages[1].seen, "own message stays unseen");
        assert_eq!(unread_count(&messages, reader), 0);
        assert_eq!(unread_count(&messages, other), 1);
    }
}
