use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info};

use campus_types::api::{
    Claims, ErrorBody, MessageListResponse, MessageQuery, SendMessageRequest, SendMessageResponse,
    UserPageResponse,
};

use crate::AppState;
use crate::auth::{Failure, failure};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

/// GET /api/admin/get_all_users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let slice = state.store.users_page(params.page, params.per_page).await;
    debug!(page = slice.current_page, rows = slice.users.len(), "Listing users");
    Json(UserPageResponse {
        data: slice.users,
        current_page: slice.current_page,
        last_page: slice.last_page,
        per_page: Some(params.per_page.clamp(1, 100)),
        total: Some(slice.total),
    })
}

/// GET /api/admin/dormitories_and_university_/names
pub async fn facet_names(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.facets().await)
}

/// GET /api/admin/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let limit = query.limit.min(200);
    let messages = state
        .store
        .messages(claims.sub, limit, query.conversation_id)
        .await;
    Json(MessageListResponse { messages })
}

/// POST /api/admin/messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, Failure> {
    let text = req.message_text.trim();
    if text.is_empty() {
        let mut errors = IndexMap::new();
        errors.insert(
            "message_text".to_string(),
            vec!["The message text field is required.".to_string()],
        );
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                message: Some("The message text field is required.".to_string()),
                errors: Some(errors),
            }),
        ));
    }

    let receiver = state
        .store
        .user(req.receiver_id)
        .await
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Receiver not found."))?;
    if receiver.role.eq_ignore_ascii_case("admin") {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Administrators cannot message other administrators.",
        ));
    }

    let record = state.store.send(claims.sub, receiver.id, text.to_string()).await;
    info!(
        admin = claims.sub,
        receiver = receiver.id,
        conversation = record.conversation_id,
        "Message stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            conversation_id: Some(record.conversation_id),
            message_data: state.options.echo_sent_messages.then_some(record),
            message: Some("Message sent successfully.".to_string()),
        }),
    ))
}
