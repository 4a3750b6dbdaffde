use std::collections::HashMap;

use campus_types::{ConversationId, UserId};

/// Per-user conversation id, learned lazily and kept for the session.
///
/// Inferred ids (from a fetched message) only fill an empty slot. Ids
/// returned by a send are authoritative and overwrite whatever was there.
/// Entries are never removed.
#[derive(Debug, Default, Clone)]
pub struct ConversationCache {
    ids: HashMap<UserId, ConversationId>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: UserId) -> Option<ConversationId> {
        self.ids.get(&user_id).copied()
    }

    /// Record an inferred id. Returns true if the slot was empty.
    pub fn infer(&mut self, user_id: UserId, conversation_id: ConversationId) -> bool {
        if self.ids.contains_key(&user_id) {
            return false;
        }
        self.ids.insert(user_id, conversation_id);
        true
    }

    /// Record the id assigned by the backend. Returns the previous value.
    pub fn confirm(&mut self, user_id: UserId, conversation_id: ConversationId) -> Option<ConversationId> {
        self.ids.insert(user_id, conversation_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_never_overwrites() {
        let mut cache = ConversationCache::new();
        assert!(cache.infer(42, 5));
        assert!(!cache.infer(42, 6));
        assert_eq!(cache.get(42), Some(5));
    }

    #[test]
    fn confirmation_takes_precedence() {
        let mut cache = ConversationCache::new();
        cache.infer(42, 5);
        assert_eq!(cache.confirm(42, 7), Some(5));
        assert_eq!(cache.get(42), Some(7));
        assert!(!cache.infer(42, 5));
        assert_eq!(cache.get(42), Some(7));
    }

    #[test]
    fn users_are_independent() {
        let mut cache = ConversationCache::new();
        cache.confirm(1, 10);
        assert_eq!(cache.get(2), None);
        assert_eq!(cache.len(), 1);
    }
}
