//! Chat tests
//!
//! Property-based and unit tests for:
//! - Conversation pairs do not depend on argument order
//! - Reading a conversation marks only the other party's messages as seen

use chrono::Utc;
use proptest::prelude::*;
use shared::{mark_seen_by, unread_count, ChatMessage, ConversationPair, MediaType};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// (sent by first user, already seen) flags for a message history
fn history_strategy() -> impl Strategy<Value = Vec<(bool, bool)>> {
    prop::collection::vec((any::<bool>(), any::<bool>()), 0..40)
}

fn build_history(flags: &[(bool, bool)], a: Uuid, b: Uuid) -> Vec<ChatMessage> {
    let conversation_id = Uuid::new_v4();
    flags
        .iter()
        .map(|(from_a, seen)| ChatMessage {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: if *from_a { a } else { b },
            sender_name: if *from_a { "Ama" } else { "Kossi" }.to_string(),
            content: "Bonjour".to_string(),
            media_type: MediaType::Text,
            media_url: None,
            seen: *seen,
            created_at: Utc::now(),
        })
        .collect()
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Opening A->B and B->A yields the same pair
    #[test]
    fn test_pair_is_symmetric(a in uuid_strategy(), b in uuid_strategy()) {
        prop_assume!(a != b);
        let ab = ConversationPair::new(a, b).unwrap();
        let ba = ConversationPair::new(b, a).unwrap();

        prop_assert_eq!(ab, ba);
        prop_assert!(ab.first() < ab.second());
        prop_assert!(ab.contains(a) && ab.contains(b));
        prop_assert_eq!(ab.other(a), Some(b));
        prop_assert_eq!(ab.other(b), Some(a));
    }

    /// The reader sees every message from the other party, and only those
    #[test]
    fn test_reading_marks_other_party_messages(flags in history_strategy()) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut messages = build_history(&flags, a, b);
        let before = messages.clone();

        let changed = mark_seen_by(&mut messages, b);

        for (old, new) in before.iter().zip(&messages) {
            if old.sender_id == a {
                prop_assert!(new.seen);
            } else {
                prop_assert_eq!(old.seen, new.seen);
            }
        }

        let expected: Vec<Uuid> = before
            .iter()
            .filter(|m| m.sender_id == a && !m.seen)
            .map(|m| m.id)
            .collect();
        prop_assert_eq!(changed, expected);
        prop_assert_eq!(unread_count(&messages, b), 0);
    }

    /// Reading twice changes nothing the second time
    #[test]
    fn test_reading_is_idempotent(flags in history_strategy()) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut messages = build_history(&flags, a, b);

        mark_seen_by(&mut messages, b);
        prop_assert!(mark_seen_by(&mut messages, b).is_empty());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_conversation_with_self_is_refused() {
    let a = Uuid::new_v4();
    assert!(ConversationPair::new(a, a).is_err());
}

#[test]
fn test_own_messages_stay_unseen() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let mut messages = build_history(&[(true, false), (false, false)], a, b);

    let changed = mark_seen_by(&mut messages, a);

    assert_eq!(changed, vec![messages[1].id]);
    assert!(!messages[0].seen);
    assert!(messages[1].seen);
    assert_eq!(unread_count(&messages, b), 1);
}

#[test]
fn test_stranger_is_not_part_of_pair() {
    let pair = ConversationPair::new(Uuid::new_v4(), Uuid::new_v4()).unwrap();
    let stranger = Uuid::new_v4();
    assert!(!pair.contains(stranger));
    assert_eq!(pair.other(stranger), None);
}
