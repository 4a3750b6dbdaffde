use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ConversationId, MessageId, UserId};

// -- JWT Claims --

/// Bearer token claims. Shared by the mock backend (issuing and checking
/// tokens) and by anything that needs to mint a dev token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

// -- User directory --

/// One row of `GET /api/admin/get_all_users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<String>,
    #[serde(default)]
    pub dormitory_name: Option<String>,
    #[serde(default)]
    pub product_count: Option<u32>,
    #[serde(default)]
    pub sold_counter: Option<u32>,
    #[serde(default)]
    pub university_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPageResponse {
    pub data: Vec<UserRecord>,
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Some deployments wrap the paginator under a `users` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserPageEnvelope {
    Nested { users: UserPageResponse },
    Flat(UserPageResponse),
}

impl UserPageEnvelope {
    pub fn into_page(self) -> UserPageResponse {
        match self {
            Self::Nested { users } => users,
            Self::Flat(page) => page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPageQuery {
    pub page: u32,
    pub per_page: u32,
}

// -- Facets --

/// One entry of `GET /api/admin/dormitories_and_university_/names`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniversityDormitories {
    pub university_name: String,
    #[serde(default)]
    pub dormitories: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FacetEnvelope {
    Wrapped { data: Vec<UniversityDormitories> },
    Bare(Vec<UniversityDormitories>),
}

impl FacetEnvelope {
    pub fn into_entries(self) -> Vec<UniversityDormitories> {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(entries) => entries,
        }
    }
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageQuery {
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_username: Option<String>,
    pub message_text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageListResponse {
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: UserId,
    pub message_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_data: Option<MessageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// -- Errors --

/// Body of a non-2xx response. Both fields are optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<IndexMap<String, Vec<String>>>,
}

impl ErrorBody {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            errors: None,
        }
    }
}
