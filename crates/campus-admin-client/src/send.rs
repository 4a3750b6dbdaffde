use campus_types::api::SendMessageResponse;
use campus_types::models::{ChatMessage, Participants};
use campus_types::{ConversationId, UserId};

use crate::conversations::ConversationCache;
use crate::error::ApiError;
use crate::thread::MessageThread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub receiver_id: UserId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendApplied {
    Sent {
        /// False when the backend omitted the message and a local echo was shown.
        echoed: bool,
        conversation_id: Option<ConversationId>,
        /// Cached id overwritten by the backend-assigned one.
        replaced: Option<ConversationId>,
    },
    Failed(String),
}

/// Draft text plus the single in-flight send.
#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
    in_flight: bool,
    error: Option<String>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight
    }

    /// Validate and reserve a send. Blank drafts, a missing receiver, or a
    /// send already in flight give `None` and leave all state untouched.
    pub fn begin_send(&mut self, receiver_id: Option<UserId>) -> Option<SendRequest> {
        let receiver_id = receiver_id?;
        let text = self.draft.trim();
        if text.is_empty() || self.in_flight {
            return None;
        }
        let request = SendRequest {
            receiver_id,
            text: text.to_string(),
        };
        self.in_flight = true;
        self.error = None;
        Some(request)
    }

    pub fn apply_send(
        &mut self,
        request: &SendRequest,
        result: Result<SendMessageResponse, ApiError>,
        cache: &mut ConversationCache,
        thread: &mut MessageThread,
    ) -> SendApplied {
        self.in_flight = false;

        let resp = match result {
            Ok(resp) => resp,
            Err(err) => {
                // Draft is kept so the admin can retry.
                let message = err.user_message("send messages");
                self.error = Some(message.clone());
                return SendApplied::Failed(message);
            }
        };

        let receiver = request.receiver_id;
        let replaced = resp
            .conversation_id
            .and_then(|id| cache.confirm(receiver, id))
            .filter(|old| Some(*old) != resp.conversation_id);
        let conversation_id = resp.conversation_id.or_else(|| cache.get(receiver));

        let participants = thread
            .active()
            .copied()
            .filter(|p| p.counterpart == receiver)
            .unwrap_or_else(|| Participants::new(None, receiver));

        let echoed = resp.message_data.is_some();
        let message = match resp.message_data {
            Some(rec) => ChatMessage::from_record(rec, &participants),
            None => ChatMessage::local_echo(request.text.clone(), conversation_id, &participants),
        };
        thread.append(receiver, message);

        self.draft.clear();
        self.error = None;
        SendApplied::Sent {
            echoed,
            conversation_id,
            replaced,
        }
    }
}
