//! In-memory stand-in for the marketplace admin API: the user directory,
//! university/dormitory names and admin <-> user messages, behind bearer
//! tokens that must carry the admin role.

pub mod auth;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::store::MockStore;

pub type AppState = Arc<AppStateInner>;

#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Include the stored message in send responses. When false the client
    /// has to synthesize its own echo.
    pub echo_sent_messages: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            echo_sent_messages: true,
        }
    }
}

pub struct AppStateInner {
    pub store: MockStore,
    pub jwt_secret: String,
    pub options: MockOptions,
}

impl AppStateInner {
    pub fn new(store: MockStore, jwt_secret: impl Into<String>, options: MockOptions) -> AppState {
        Arc::new(Self {
            store,
            jwt_secret: jwt_secret.into(),
            options,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/get_all_users", get(routes::list_users))
        .route(
            "/api/admin/dormitories_and_university_/names",
            get(routes::facet_names),
        )
        .route(
            "/api/admin/messages",
            get(routes::get_messages).post(routes::send_message),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
