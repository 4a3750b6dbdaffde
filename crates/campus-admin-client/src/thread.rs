use std::collections::HashMap;

use campus_types::api::MessageRecord;
use campus_types::models::{ChatMessage, Participants};
use campus_types::{ConversationId, UserId};

use crate::conversations::ConversationCache;
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ThreadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Identifies one message fetch. Handed out by [`MessageThread::begin_fetch`]
/// and given back with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub user_id: UserId,
    pub conversation_id: Option<ConversationId>,
    pub limit: u32,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchApplied {
    Loaded {
        messages: usize,
        inferred: Option<ConversationId>,
    },
    Failed(String),
    /// Superseded by a newer fetch or by a different active user.
    Stale { latest: u64 },
}

/// The visible message thread of the active user.
///
/// Every fetch carries a sequence number from a single monotonic counter,
/// and the latest number issued per user is remembered. A response is
/// applied only if its user is still active and its number is the latest
/// for that user; anything else is dropped unapplied.
#[derive(Debug)]
pub struct MessageThread {
    active: Option<Participants>,
    phase: ThreadPhase,
    messages: Vec<ChatMessage>,
    next_seq: u64,
    latest: HashMap<UserId, u64>,
    limit: u32,
}

impl MessageThread {
    pub fn new(limit: u32) -> Self {
        Self {
            active: None,
            phase: ThreadPhase::Idle,
            messages: Vec::new(),
            next_seq: 0,
            latest: HashMap::new(),
            limit,
        }
    }

    pub fn active(&self) -> Option<&Participants> {
        self.active.as_ref()
    }

    pub fn active_user(&self) -> Option<UserId> {
        self.active.map(|p| p.counterpart)
    }

    pub fn phase(&self) -> &ThreadPhase {
        &self.phase
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Make `participants` the active thread. Switching users empties the
    /// visible list. Returns false if that user was already active.
    pub fn activate(&mut self, participants: Participants) -> bool {
        if self.active_user() == Some(participants.counterpart) {
            self.active = Some(participants);
            return false;
        }
        self.active = Some(participants);
        self.messages.clear();
        self.phase = ThreadPhase::Idle;
        true
    }

    pub fn deactivate(&mut self) {
        self.active = None;
        self.messages.clear();
        self.phase = ThreadPhase::Idle;
    }

    pub fn begin_fetch(&mut self, cache: &ConversationCache) -> Option<FetchTicket> {
        let user_id = self.active_user()?;
        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest.insert(user_id, seq);
        self.phase = ThreadPhase::Loading;
        Some(FetchTicket {
            user_id,
            conversation_id: cache.get(user_id),
            limit: self.limit,
            seq,
        })
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.active_user() == Some(ticket.user_id)
            && self.latest.get(&ticket.user_id) == Some(&ticket.seq)
    }

    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<MessageRecord>, ApiError>,
        cache: &mut ConversationCache,
    ) -> FetchApplied {
        if !self.is_current(&ticket) {
            let latest = self.latest.get(&ticket.user_id).copied().unwrap_or(0);
            return FetchApplied::Stale { latest };
        }
        let Some(participants) = self.active else {
            return FetchApplied::Stale { latest: 0 };
        };

        let records = match result {
            Ok(records) => records,
            Err(err) => {
                let message = err.user_message("load messages");
                self.phase = ThreadPhase::Failed(message.clone());
                return FetchApplied::Failed(message);
            }
        };

        let user_id = ticket.user_id;
        let mut inferred = None;
        if ticket.conversation_id.is_none() {
            if let Some(rec) = records.iter().find(|r| r.sender_id == user_id) {
                if cache.infer(user_id, rec.conversation_id) {
                    inferred = Some(rec.conversation_id);
                }
            }
        }

        // Without any conversation id, fall back to what the user wrote.
        let scope = ticket.conversation_id.or_else(|| cache.get(user_id));
        let mut messages: Vec<ChatMessage> = records
            .into_iter()
            .filter(|r| match scope {
                Some(conversation_id) => r.conversation_id == conversation_id,
                None => r.sender_id == user_id,
            })
            .map(|r| ChatMessage::from_record(r, &participants))
            .collect();
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)));

        let count = messages.len();
        self.messages = messages;
        self.phase = ThreadPhase::Loaded;
        FetchApplied::Loaded {
            messages: count,
            inferred,
        }
    }

    /// Append a message confirmed by a send. Ignored if `user_id` is no
    /// longer the active user.
    pub fn append(&mut self, user_id: UserId, message: ChatMessage) -> bool {
        if self.active_user() != Some(user_id) {
            return false;
        }
        self.messages.push(message);
        true
    }
}
