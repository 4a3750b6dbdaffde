use std::future::Future;
use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use campus_types::api::{
    FacetEnvelope, MessageListResponse, MessageQuery, MessageRecord, SendMessageRequest,
    SendMessageResponse, UserPageEnvelope, UserPageQuery,
};
use campus_types::models::{DirectoryUser, FacetOptions};
use campus_types::{ConversationId, UserId};

use crate::config::ClientConfig;
use crate::error::{ApiError, excerpt};
use crate::session::SessionStore;

/// One page of the user directory, already mapped to the domain model.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPage {
    pub users: Vec<DirectoryUser>,
    pub current_page: u32,
    pub last_page: u32,
}

/// The four admin endpoints the chat screen talks to.
pub trait AdminBackend: Send + Sync {
    fn list_users(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<UserPage, ApiError>> + Send;

    fn facet_options(&self) -> impl Future<Output = Result<FacetOptions, ApiError>> + Send;

    /// Up to `limit` recent messages, scoped to `conversation_id` when known.
    fn messages(
        &self,
        limit: u32,
        conversation_id: Option<ConversationId>,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, ApiError>> + Send;

    fn send_message(
        &self,
        receiver_id: UserId,
        text: &str,
    ) -> impl Future<Output = Result<SendMessageResponse, ApiError>> + Send;

    /// The signed-in admin's own user id, if the session knows it.
    fn admin_id(&self) -> Option<UserId> {
        None
    }
}

/// [`AdminBackend`] over HTTP with reqwest.
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        // Applies to every request: a hung backend surfaces as ApiError::Timeout.
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/admin/{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let session = self.session.read().ok_or(ApiError::NoSession)?;
        Ok(req.header(AUTHORIZATION, session.authorization()))
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let body = resp.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), %url, "Admin API error response");
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(
                status = status.as_u16(),
                %url,
                error = %e,
                body = %excerpt(&body),
                "Malformed admin API response"
            );
            ApiError::Decode(e.to_string())
        })
    }
}

impl AdminBackend for HttpBackend {
    async fn list_users(&self, page: u32, per_page: u32) -> Result<UserPage, ApiError> {
        debug!(page, per_page, "GET get_all_users");
        let req = self
            .http
            .get(self.endpoint("get_all_users"))
            .query(&UserPageQuery { page, per_page });
        let page = self
            .execute::<UserPageEnvelope>(self.authorized(req)?)
            .await?
            .into_page();

        Ok(UserPage {
            users: page.data.into_iter().map(DirectoryUser::from).collect(),
            current_page: page.current_page,
            last_page: page.last_page,
        })
    }

    async fn facet_options(&self) -> Result<FacetOptions, ApiError> {
        debug!("GET dormitories_and_university_/names");
        let req = self
            .http
            .get(self.endpoint("dormitories_and_university_/names"));
        let envelope = self.execute::<FacetEnvelope>(self.authorized(req)?).await?;
        Ok(FacetOptions::from_entries(envelope.into_entries()))
    }

    async fn messages(
        &self,
        limit: u32,
        conversation_id: Option<ConversationId>,
    ) -> Result<Vec<MessageRecord>, ApiError> {
        debug!(limit, ?conversation_id, "GET messages");
        let req = self
            .http
            .get(self.endpoint("messages"))
            .query(&MessageQuery {
                limit,
                conversation_id,
            });
        let list = self.execute::<MessageListResponse>(self.authorized(req)?).await?;
        Ok(list.messages)
    }

    async fn send_message(
        &self,
        receiver_id: UserId,
        text: &str,
    ) -> Result<SendMessageResponse, ApiError> {
        debug!(receiver_id, "POST messages");
        let req = self
            .http
            .post(self.endpoint("messages"))
            .json(&SendMessageRequest {
                receiver_id,
                message_text: text.to_string(),
            });
        self.execute(self.authorized(req)?).await
    }

    fn admin_id(&self) -> Option<UserId> {
        self.session.read().and_then(|s| s.user_id)
    }
}
