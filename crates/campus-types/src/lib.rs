pub mod api;
pub mod models;

/// Marketplace user id as issued by the backend.
pub type UserId = i64;

/// Backend-assigned id of an admin <-> user conversation.
pub type ConversationId = i64;

pub type MessageId = i64;
