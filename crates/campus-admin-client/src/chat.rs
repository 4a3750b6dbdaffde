use std::sync::Arc;

use campus_types::UserId;
use campus_types::models::{DirectoryUser, Participants};

use crate::backend::AdminBackend;
use crate::config::ClientConfig;
use crate::conversations::ConversationCache;
use crate::directory::{PageApplied, UserDirectory};
use crate::events::{ChatEvent, ChatEventSink, TracingSink};
use crate::facets::FacetResolver;
use crate::send::{Composer, SendApplied};
use crate::thread::{FetchApplied, MessageThread};

/// The admin chat screen without the screen: owns every piece of state the
/// page holds and runs each request/response cycle against the backend.
///
/// Each `async` method runs one whole cycle. Hosts that need to overlap
/// requests (switching users while a fetch is outstanding) drive the
/// `begin_*`/`apply_*` halves on [`MessageThread`] directly; the sequence
/// guard there is what keeps a late response off the wrong thread.
pub struct AdminChat<B> {
    backend: B,
    directory: UserDirectory,
    facets: FacetResolver,
    conversations: ConversationCache,
    thread: MessageThread,
    composer: Composer,
    sink: Arc<dyn ChatEventSink>,
}

impl<B: AdminBackend> AdminChat<B> {
    pub fn new(backend: B, config: &ClientConfig) -> Self {
        Self {
            backend,
            directory: UserDirectory::new(config.page_size),
            facets: FacetResolver::new(),
            conversations: ConversationCache::new(),
            thread: MessageThread::new(config.message_limit),
            composer: Composer::new(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ChatEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn facets(&self) -> &FacetResolver {
        &self.facets
    }

    pub fn facets_mut(&mut self) -> &mut FacetResolver {
        &mut self.facets
    }

    pub fn conversations(&self) -> &ConversationCache {
        &self.conversations
    }

    pub fn thread(&self) -> &MessageThread {
        &self.thread
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Directory rows that pass the current facets.
    pub fn visible_users(&self) -> Vec<&DirectoryUser> {
        self.facets.narrow(self.directory.users())
    }

    // -- Facets --

    /// One-shot load of university/dormitory options. No-op once loaded.
    pub async fn load_facets(&mut self) -> bool {
        if !self.facets.begin_load() {
            return false;
        }
        let result = self.backend.facet_options().await;
        let reset_selection = self.facets.apply_load(result);

        match (self.facets.error(), self.facets.options()) {
            (Some(message), _) => self.sink.emit(ChatEvent::Error {
                scope: "facets",
                message: message.to_string(),
            }),
            (None, Some(options)) => self.sink.emit(ChatEvent::FacetsLoaded {
                universities: options.universities().count(),
                reset_selection,
            }),
            (None, None) => {}
        }
        true
    }

    // -- Directory --

    pub async fn load_next_page(&mut self) -> Option<PageApplied> {
        let page = self.directory.begin_page()?;
        let result = self
            .backend
            .list_users(page, self.directory.page_size())
            .await;
        let applied = self.directory.apply_page(page, result);

        match &applied {
            PageApplied::Merged(stats) => self.sink.emit(ChatEvent::PageMerged {
                page,
                added: stats.added,
                duplicates: stats.duplicates,
                admins_skipped: stats.admins_skipped,
            }),
            PageApplied::Failed { cleared, message } => self.sink.emit(ChatEvent::PageFailed {
                page,
                cleared: *cleared,
                message: message.clone(),
            }),
            PageApplied::Stale => {}
        }
        Some(applied)
    }

    /// Fetch page 1 again, keeping the rows already shown. Overlapping rows
    /// are merged by id; a failure here empties the list.
    pub async fn reload_directory(&mut self) -> Option<PageApplied> {
        if self.directory.is_loading() {
            return None;
        }
        self.directory.restart();
        self.load_next_page().await
    }

    /// Infinite-scroll hook: loads the next page when close to the bottom.
    pub async fn on_scroll(&mut self, remaining_px: f64) -> Option<PageApplied> {
        if !self.directory.should_fetch_more(remaining_px) {
            return None;
        }
        self.load_next_page().await
    }

    // -- Thread --

    /// Make `user_id` the active user. Returns true if the selection changed.
    pub fn select_user(&mut self, user_id: UserId) -> bool {
        let participants = Participants::new(self.backend.admin_id(), user_id);
        self.thread.activate(participants)
    }

    pub fn clear_selection(&mut self) {
        self.thread.deactivate();
    }

    pub async fn open_thread(&mut self, user_id: UserId) -> Option<FetchApplied> {
        self.select_user(user_id);
        self.refresh_thread().await
    }

    /// Fetch the active user's recent messages.
    pub async fn refresh_thread(&mut self) -> Option<FetchApplied> {
        let ticket = self.thread.begin_fetch(&self.conversations)?;
        let result = self
            .backend
            .messages(ticket.limit, ticket.conversation_id)
            .await;
        let applied = self
            .thread
            .apply_fetch(ticket, result, &mut self.conversations);

        match &applied {
            FetchApplied::Loaded { messages, inferred } => {
                if let Some(conversation_id) = inferred {
                    self.sink.emit(ChatEvent::ConversationInferred {
                        user_id: ticket.user_id,
                        conversation_id: *conversation_id,
                    });
                }
                self.sink.emit(ChatEvent::ThreadLoaded {
                    user_id: ticket.user_id,
                    messages: *messages,
                });
            }
            FetchApplied::Failed(message) => self.sink.emit(ChatEvent::Error {
                scope: "thread",
                message: message.clone(),
            }),
            FetchApplied::Stale { latest } => self.sink.emit(ChatEvent::StaleResponseDiscarded {
                user_id: ticket.user_id,
                seq: ticket.seq,
                latest: *latest,
            }),
        }
        Some(applied)
    }

    // -- Send --

    /// Send the current draft to the active user. `None` when there was
    /// nothing to send. If the send changed the active user's conversation
    /// id, the thread is fetched again under the new id.
    pub async fn send(&mut self) -> Option<SendApplied> {
        let request = self.composer.begin_send(self.thread.active_user())?;
        let before = self.conversations.get(request.receiver_id);

        let result = self
            .backend
            .send_message(request.receiver_id, &request.text)
            .await;
        let applied = self.composer.apply_send(
            &request,
            result,
            &mut self.conversations,
            &mut self.thread,
        );

        match &applied {
            SendApplied::Sent {
                echoed,
                conversation_id,
                replaced,
            } => {
                match conversation_id {
                    Some(id) if before != Some(*id) => self.sink.emit(ChatEvent::ConversationConfirmed {
                        user_id: request.receiver_id,
                        conversation_id: *id,
                        replaced: *replaced,
                    }),
                    _ => {}
                }
                self.sink.emit(ChatEvent::MessageSent {
                    user_id: request.receiver_id,
                    echoed: *echoed,
                });
            }
            SendApplied::Failed(message) => self.sink.emit(ChatEvent::Error {
                scope: "send",
                message: message.clone(),
            }),
        }

        let after = self.conversations.get(request.receiver_id);
        if after != before && self.thread.active_user() == Some(request.receiver_id) {
            self.refresh_thread().await;
        }
        Some(applied)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use campus_types::api::{MessageRecord, SendMessageResponse, UniversityDormitories};
    use campus_types::models::{FacetOptions, SenderRef};
    use campus_types::ConversationId;

    use super::*;
    use crate::backend::UserPage;
    use crate::error::ApiError;
    use crate::facets::Selection;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Users(u32, u32),
        Facets,
        Messages(u32, Option<ConversationId>),
        Send(UserId, String),
    }

    #[derive(Default)]
    struct Scripted {
        pages: Mutex<VecDeque<Result<UserPage, ApiError>>>,
        facets: Mutex<VecDeque<Result<FacetOptions, ApiError>>>,
        messages: Mutex<VecDeque<Result<Vec<MessageRecord>, ApiError>>>,
        sends: Mutex<VecDeque<Result<SendMessageResponse, ApiError>>>,
        calls: Mutex<Vec<Call>>,
    }

    fn next<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>) -> Result<T, ApiError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("unscripted call".into())))
    }

    impl Scripted {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AdminBackend for Scripted {
        async fn list_users(&self, page: u32, per_page: u32) -> Result<UserPage, ApiError> {
            self.calls.lock().unwrap().push(Call::Users(page, per_page));
            next(&self.pages)
        }

        async fn facet_options(&self) -> Result<FacetOptions, ApiError> {
            self.calls.lock().unwrap().push(Call::Facets);
            next(&self.facets)
        }

        async fn messages(
            &self,
            limit: u32,
            conversation_id: Option<ConversationId>,
        ) -> Result<Vec<MessageRecord>, ApiError> {
            self.calls.lock().unwrap().push(Call::Messages(limit, conversation_id));
            next(&self.messages)
        }

        async fn send_message(&self, receiver_id: UserId, text: &str) -> Result<SendMessageResponse, ApiError> {
            self.calls.lock().unwrap().push(Call::Send(receiver_id, text.to_string()));
            next(&self.sends)
        }

        fn admin_id(&self) -> Option<UserId> {
            Some(1)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ChatEvent>>);

    impl ChatEventSink for Recorder {
        fn emit(&self, event: ChatEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn user(id: UserId) -> DirectoryUser {
        DirectoryUser {
            id,
            display_name: format!("user{id}"),
            email: format!("user{id}@example.edu"),
            role: "user".into(),
            status: None,
            avatar_url: None,
            university_name: Some("MIT".into()),
            dormitory_name: None,
            last_login_at: None,
            product_count: 0,
            sold_counter: 0,
        }
    }

    fn rec(id: i64, conversation_id: ConversationId, sender_id: UserId) -> MessageRecord {
        MessageRecord {
            id,
            conversation_id,
            sender_id,
            sender_username: None,
            message_text: format!("m{id}"),
            created_at: format!("2025-01-01 10:00:{:02}", id),
        }
    }

    fn chat(backend: Scripted) -> (AdminChat<Scripted>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let config = ClientConfig {
            page_size: 3,
            ..ClientConfig::default()
        };
        let chat = AdminChat::new(backend, &config).with_sink(recorder.clone());
        (chat, recorder)
    }

    #[tokio::test]
    async fn directory_pages_merge_without_duplicates() {
        let backend = Scripted::default();
        backend.pages.lock().unwrap().extend([
            Ok(UserPage { users: vec![user(1), user(2), user(3)], current_page: 1, last_page: 2 }),
            Ok(UserPage { users: vec![user(3), user(4)], current_page: 2, last_page: 2 }),
        ]);
        let (mut chat, recorder) = chat(backend);

        chat.load_next_page().await.unwrap();
        assert!(chat.on_scroll(500.0).await.is_none());
        chat.on_scroll(40.0).await.unwrap();
        assert!(chat.on_scroll(0.0).await.is_none());

        let ids: Vec<_> = chat.directory().users().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(chat.backend().calls(), vec![Call::Users(1, 3), Call::Users(2, 3)]);
        assert!(recorder.0.lock().unwrap().contains(&ChatEvent::PageMerged {
            page: 2,
            added: 1,
            duplicates: 1,
            admins_skipped: 0,
        }));
    }

    #[tokio::test]
    async fn thread_infers_conversation_then_send_overrides_it() {
        let backend = Scripted::default();
        backend.messages.lock().unwrap().extend([
            Ok(vec![rec(1, 5, 42), rec(2, 6, 99)]),
            Ok(vec![rec(3, 7, 42)]),
        ]);
        backend.sends.lock().unwrap().push_back(Ok(SendMessageResponse {
            conversation_id: Some(7),
            message_data: None,
            message: None,
        }));
        let (mut chat, recorder) = chat(backend);

        let applied = chat.open_thread(42).await.unwrap();
        assert_eq!(applied, FetchApplied::Loaded { messages: 1, inferred: Some(5) });
        assert_eq!(chat.conversations().get(42), Some(5));

        chat.composer_mut().set_draft("hello");
        let sent = chat.send().await.unwrap();
        assert_eq!(
            sent,
            SendApplied::Sent { echoed: false, conversation_id: Some(7), replaced: Some(5) }
        );
        assert_eq!(chat.conversations().get(42), Some(7));

        // Conversation id changed, so the thread was fetched again under 7.
        assert_eq!(
            chat.backend().calls(),
            vec![
                Call::Messages(50, None),
                Call::Send(42, "hello".into()),
                Call::Messages(50, Some(7)),
            ]
        );
        assert_eq!(chat.thread().messages().len(), 1);
        assert_eq!(chat.thread().messages()[0].sender, SenderRef::User);

        let events = recorder.0.lock().unwrap();
        assert!(events.contains(&ChatEvent::ConversationInferred { user_id: 42, conversation_id: 5 }));
        assert!(events.contains(&ChatEvent::ConversationConfirmed {
            user_id: 42,
            conversation_id: 7,
            replaced: Some(5),
        }));
    }

    #[tokio::test]
    async fn send_into_known_conversation_appends_without_refetch() {
        let backend = Scripted::default();
        backend.messages.lock().unwrap().push_back(Ok(vec![rec(1, 9, 42)]));
        backend.sends.lock().unwrap().push_back(Ok(SendMessageResponse {
            conversation_id: Some(9),
            message_data: Some(MessageRecord {
                id: 2,
                conversation_id: 9,
                sender_id: 1,
                sender_username: None,
                message_text: "ok".into(),
                created_at: "2025-01-01 10:01:00".into(),
            }),
            message: None,
        }));
        let (mut chat, _) = chat(backend);

        chat.open_thread(42).await;
        chat.composer_mut().set_draft("ok");
        chat.send().await.unwrap();

        assert_eq!(chat.backend().calls().len(), 2);
        let texts: Vec<_> = chat.thread().messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m1", "ok"]);
        assert_eq!(chat.composer().draft(), "");
    }

    #[tokio::test]
    async fn send_without_conversation_id_does_not_refetch() {
        let backend = Scripted::default();
        backend.messages.lock().unwrap().push_back(Ok(vec![rec(1, 5, 42)]));
        backend.sends.lock().unwrap().push_back(Ok(SendMessageResponse::default()));
        let (mut chat, recorder) = chat(backend);

        chat.open_thread(42).await;
        chat.composer_mut().set_draft("ping");
        let sent = chat.send().await.unwrap();

        assert_eq!(
            sent,
            SendApplied::Sent { echoed: false, conversation_id: Some(5), replaced: None }
        );
        assert_eq!(chat.conversations().get(42), Some(5));
        assert_eq!(
            chat.backend().calls(),
            vec![Call::Messages(50, None), Call::Send(42, "ping".into())]
        );
        let texts: Vec<_> = chat.thread().messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m1", "ping"]);
        assert!(!recorder
            .0
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, ChatEvent::ConversationConfirmed { .. })));
    }

    #[tokio::test]
    async fn clearing_selection_empties_thread_and_blocks_send() {
        let backend = Scripted::default();
        backend.messages.lock().unwrap().push_back(Ok(vec![rec(1, 5, 42)]));
        let (mut chat, _) = chat(backend);

        chat.open_thread(42).await;
        assert_eq!(chat.thread().messages().len(), 1);

        chat.clear_selection();
        assert_eq!(chat.thread().active_user(), None);
        assert!(chat.thread().messages().is_empty());
        assert!(chat.refresh_thread().await.is_none());

        chat.composer_mut().set_draft("anyone?");
        assert!(chat.send().await.is_none());
        assert_eq!(chat.backend().calls(), vec![Call::Messages(50, None)]);
        // The cache outlives the selection.
        assert_eq!(chat.conversations().get(42), Some(5));
    }

    #[tokio::test]
    async fn reload_merges_overlap_and_failure_clears() {
        let backend = Scripted::default();
        backend.pages.lock().unwrap().extend([
            Ok(UserPage { users: vec![user(1), user(2)], current_page: 1, last_page: 2 }),
            Ok(UserPage { users: vec![user(2), user(3)], current_page: 1, last_page: 2 }),
            Err(ApiError::Timeout),
        ]);
        let (mut chat, _) = chat(backend);

        chat.load_next_page().await;
        let applied = chat.reload_directory().await.unwrap();
        assert_eq!(
            applied,
            PageApplied::Merged(crate::directory::MergeStats { added: 1, duplicates: 1, admins_skipped: 0 })
        );
        let ids: Vec<_> = chat.directory().users().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let applied = chat.reload_directory().await.unwrap();
        assert_eq!(
            applied,
            PageApplied::Failed { cleared: true, message: "Failed to load users.".into() }
        );
        assert!(chat.directory().users().is_empty());
        assert_eq!(
            chat.backend().calls(),
            vec![Call::Users(1, 3), Call::Users(1, 3), Call::Users(1, 3)]
        );
    }

    #[tokio::test]
    async fn blank_draft_makes_no_call() {
        let (mut chat, _) = chat(Scripted::default());
        chat.select_user(42);
        chat.composer_mut().set_draft("   ");
        assert!(chat.send().await.is_none());
        assert!(chat.backend().calls().is_empty());
        assert_eq!(chat.composer().draft(), "   ");
        assert_eq!(chat.composer().error(), None);
    }

    #[tokio::test]
    async fn send_failure_keeps_draft_and_reports() {
        let backend = Scripted::default();
        backend.sends.lock().unwrap().push_back(Err(ApiError::Validation {
            message: None,
            errors: Default::default(),
        }));
        let (mut chat, recorder) = chat(backend);
        chat.select_user(42);
        chat.composer_mut().set_draft("hi");

        let applied = chat.send().await.unwrap();
        assert_eq!(applied, SendApplied::Failed("Validation Error".into()));
        assert_eq!(chat.composer().draft(), "hi");
        assert_eq!(chat.composer().error(), Some("Validation Error"));
        assert!(recorder.0.lock().unwrap().contains(&ChatEvent::Error {
            scope: "send",
            message: "Validation Error".into(),
        }));
    }

    #[tokio::test]
    async fn facets_load_once_and_narrow_directory() {
        let backend = Scripted::default();
        backend.facets.lock().unwrap().push_back(Ok(FacetOptions::from_entries(vec![
            UniversityDormitories {
                university_name: "MIT".into(),
                dormitories: vec!["Baker House".into()],
            },
        ])));
        let mut harvard = user(2);
        harvard.university_name = Some("Harvard".into());
        backend.pages.lock().unwrap().push_back(Ok(UserPage {
            users: vec![user(1), harvard],
            current_page: 1,
            last_page: 1,
        }));
        let (mut chat, _) = chat(backend);

        assert!(chat.load_facets().await);
        assert!(!chat.load_facets().await);
        chat.load_next_page().await;

        assert!(chat.facets_mut().select_university(Selection::named("MIT")));
        let visible: Vec<_> = chat.visible_users().iter().map(|u| u.id).collect();
        assert_eq!(visible, vec![1]);
        assert_eq!(chat.backend().calls(), vec![Call::Facets, Call::Users(1, 3)]);
    }
}
