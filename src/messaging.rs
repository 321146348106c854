//! Direct messages and the suggestion box.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub text: String,
    pub timestamp: i64,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    pub fn new(from_id: &str, to_id: &str, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4().simple()),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            text: text.into(),
            timestamp,
            read: false,
        }
    }

    /// Whether the message belongs to the conversation between `a` and `b`.
    pub fn between(&self, a: &str, b: &str) -> bool {
        (self.from_id == a && self.to_id == b) || (self.from_id == b && self.to_id == a)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    pub text: String,
    pub date: i64,
}

/// Messages addressed to `user_id` that have not been read.
pub fn unread_count(messages: &[Message], user_id: &str) -> usize {
    messages
        .iter()
        .filter(|m| m.to_id == user_id && !m.read)
        .count()
}

/// Direct message answering a suggestion, sent to its author.
pub fn suggestion_reply(suggestion: &Suggestion, from_id: &str, text: &str, now: i64) -> Message {
    Message::new(
        from_id,
        &suggestion.author_id,
        format!("RE: Suggestion - {}", text),
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_goes_to_author_with_prefix() {
        let s = Suggestion {
            id: "s1".into(),
            author_id: "e7".into(),
            author_name: "Eve".into(),
            text: "Standing desks".into(),
            date: 1,
        };
        let msg = suggestion_reply(&s, "dir-1", "Approved", 5);
        assert_eq!(msg.to_id, "e7");
        assert_eq!(msg.from_id, "dir-1");
        assert_eq!(msg.text, "RE: Suggestion - Approved");
        assert!(!msg.read);
        assert!(msg.id.starts_with("msg-"));
    }

    #[test]
    fn unread_counts_only_incoming() {
        let mut a = Message::new("x", "me", "hi", 1);
        let b = Message::new("me", "x", "yo", 2);
        let c = Message::new("y", "me", "ping", 3);
        assert_eq!(unread_count(&[a.clone(), b.clone(), c.clone()], "me"), 2);
        a.read = true;
        assert_eq!(unread_count(&[a, b, c], "me"), 1);
    }

    #[test]
    fn conversation_membership() {
        let m = Message::new("a", "b", "t", 0);
        assert!(m.between("a", "b"));
        assert!(m.between("b", "a"));
        assert!(!m.between("a", "c"));
    }
}
