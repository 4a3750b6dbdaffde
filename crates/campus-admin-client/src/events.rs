//! Structured lifecycle events of the admin chat flow.
//!
//! The controller reports what it did through a [`ChatEventSink`] so a host
//! can route these to tracing or drop them.

use std::fmt;

use campus_types::{ConversationId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A directory page was merged into the list
    PageMerged {
        page: u32,
        added: usize,
        duplicates: usize,
        admins_skipped: usize,
    },
    /// A directory page request failed
    PageFailed { page: u32, cleared: bool, message: String },
    /// Facet options arrived
    FacetsLoaded { universities: usize, reset_selection: bool },
    /// Conversation id inferred from a fetched message
    ConversationInferred { user_id: UserId, conversation_id: ConversationId },
    /// Conversation id assigned by a send response
    ConversationConfirmed {
        user_id: UserId,
        conversation_id: ConversationId,
        replaced: Option<ConversationId>,
    },
    /// A thread fetch completed and was applied
    ThreadLoaded { user_id: UserId, messages: usize },
    /// A response arrived for a superseded request and was dropped
    StaleResponseDiscarded { user_id: UserId, seq: u64, latest: u64 },
    /// A message was accepted by the backend
    MessageSent { user_id: UserId, echoed: bool },
    /// Any cycle surfaced an error string to the admin
    Error { scope: &'static str, message: String },
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageMerged { page, added, duplicates, admins_skipped } => {
                write!(f, "page_merged page={} added={} duplicates={} admins_skipped={}", page, added, duplicates, admins_skipped)
            }
            Self::PageFailed { page, cleared, message } => {
                write!(f, "page_failed page={} cleared={} message={}", page, cleared, message)
            }
            Self::FacetsLoaded { universities, reset_selection } => {
                write!(f, "facets_loaded universities={} reset_selection={}", universities, reset_selection)
            }
            Self::ConversationInferred { user_id, conversation_id } => {
                write!(f, "conversation_inferred user={} conversation={}", user_id, conversation_id)
            }
            Self::ConversationConfirmed { user_id, conversation_id, replaced } => match replaced {
                Some(old) => write!(f, "conversation_confirmed user={} conversation={} replaced={}", user_id, conversation_id, old),
                None => write!(f, "conversation_confirmed user={} conversation={}", user_id, conversation_id),
            },
            Self::ThreadLoaded { user_id, messages } => {
                write!(f, "thread_loaded user={} messages={}", user_id, messages)
            }
            Self::StaleResponseDiscarded { user_id, seq, latest } => {
                write!(f, "stale_response_discarded user={} seq={} latest={}", user_id, seq, latest)
            }
            Self::MessageSent { user_id, echoed } => {
                write!(f, "message_sent user={} echoed={}", user_id, echoed)
            }
            Self::Error { scope, message } => {
                write!(f, "error scope={}: {}", scope, message)
            }
        }
    }
}

pub trait ChatEventSink: Send + Sync {
    fn emit(&self, event: ChatEvent);
}

/// Sink that forwards events to `tracing`.
pub struct TracingSink;

impl ChatEventSink for TracingSink {
    fn emit(&self, event: ChatEvent) {
        match &event {
            ChatEvent::StaleResponseDiscarded { .. } | ChatEvent::Error { .. } | ChatEvent::PageFailed { .. } => {
                tracing::warn!(component = "admin_chat", "{}", event);
            }
            ChatEvent::ConversationInferred { .. }
            | ChatEvent::ConversationConfirmed { .. }
            | ChatEvent::MessageSent { .. }
            | ChatEvent::FacetsLoaded { .. } => {
                tracing::info!(component = "admin_chat", "{}", event);
            }
            _ => {
                tracing::debug!(component = "admin_chat", "{}", event);
            }
        }
    }
}

/// Discards everything.
pub struct NullSink;

impl ChatEventSink for NullSink {
    fn emit(&self, _event: ChatEvent) {}
}
