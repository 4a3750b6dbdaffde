use std::collections::HashMap;

use tokio::sync::RwLock;

use campus_types::api::{MessageRecord, UniversityDormitories, UserRecord};
use campus_types::{ConversationId, MessageId, UserId};

/// Initial contents of a [`MockStore`].
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub users: Vec<UserRecord>,
    pub facets: Vec<UniversityDormitories>,
    /// (admin, user, sender, text, created_at)
    pub messages: Vec<(UserId, UserId, UserId, String, String)>,
}

impl Seed {
    pub fn user(mut self, id: UserId, name: &str, role: &str, university: Option<&str>, dormitory: Option<&str>) -> Self {
        self.users.push(UserRecord {
            id,
            full_name: name.to_string(),
            email: format!("{}@campus.test", name.to_lowercase().replace(' ', ".")),
            role: role.to_string(),
            status: Some("active".to_string()),
            profile_picture: None,
            last_login_at: None,
            dormitory_name: dormitory.map(String::from),
            product_count: Some(0),
            sold_counter: Some(0),
            university_name: university.map(String::from),
        });
        self
    }

    pub fn university(mut self, name: &str, dormitories: &[&str]) -> Self {
        self.facets.push(UniversityDormitories {
            university_name: name.to_string(),
            dormitories: dormitories.iter().map(|d| d.to_string()).collect(),
        });
        self
    }

    pub fn message(mut self, admin: UserId, user: UserId, sender: UserId, text: &str, created_at: &str) -> Self {
        self.messages
            .push((admin, user, sender, text.to_string(), created_at.to_string()));
        self
    }

    /// Small campus used by the binary.
    pub fn demo() -> Self {
        Self::default()
            .university("MIT", &["Baker House", "Simmons Hall", "Next House"])
            .university("Stanford", &["Roble Hall", "Branner Hall"])
            .user(1, "Site Admin", "admin", None, None)
            .user(2, "Ada Byron", "user", Some("MIT"), Some("Baker House"))
            .user(3, "Grace Hopper", "user", Some("MIT"), Some("Simmons Hall"))
            .user(4, "Alan Turing", "user", Some("Stanford"), Some("Roble Hall"))
            .user(5, "Edsger Dijkstra", "user", Some("Stanford"), Some("Branner Hall"))
            .user(6, "Barbara Liskov", "user", Some("MIT"), Some("Next House"))
            .message(1, 2, 2, "Hi, my listing was removed?", "2025-03-01 09:00:00")
            .message(1, 2, 1, "It was flagged as a duplicate. Please repost it once.", "2025-03-01 09:05:00")
    }
}

#[derive(Debug)]
struct StoreInner {
    users: Vec<UserRecord>,
    facets: Vec<UniversityDormitories>,
    /// (admin, user) -> conversation
    conversations: HashMap<(UserId, UserId), ConversationId>,
    messages: Vec<MessageRecord>,
    next_conversation: ConversationId,
    next_message: MessageId,
}

impl StoreInner {
    fn conversation_for(&mut self, admin: UserId, user: UserId) -> ConversationId {
        if let Some(id) = self.conversations.get(&(admin, user)) {
            return *id;
        }
        let id = self.next_conversation;
        self.next_conversation += 1;
        self.conversations.insert((admin, user), id);
        id
    }

    fn push_message(&mut self, conversation_id: ConversationId, sender_id: UserId, text: String, created_at: String) -> MessageRecord {
        let sender_username = self
            .users
            .iter()
            .find(|u| u.id == sender_id)
            .map(|u| u.full_name.clone());
        let record = MessageRecord {
            id: self.next_message,
            conversation_id,
            sender_id,
            sender_username,
            message_text: text,
            created_at,
        };
        self.next_message += 1;
        self.messages.push(record.clone());
        record
    }
}

/// In-memory users, facets and conversations.
#[derive(Debug)]
pub struct MockStore {
    inner: RwLock<StoreInner>,
}

pub struct UserSlice {
    pub users: Vec<UserRecord>,
    pub current_page: u32,
    pub last_page: u32,
    pub total: u64,
}

impl MockStore {
    pub fn from_seed(seed: Seed) -> Self {
        let mut inner = StoreInner {
            users: seed.users,
            facets: seed.facets,
            conversations: HashMap::new(),
            messages: Vec::new(),
            next_conversation: 1,
            next_message: 1,
        };
        for (admin, user, sender, text, created_at) in seed.messages {
            let conversation_id = inner.conversation_for(admin, user);
            inner.push_message(conversation_id, sender, text, created_at);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub async fn users_page(&self, page: u32, per_page: u32) -> UserSlice {
        let inner = self.inner.read().await;
        let per_page = per_page.clamp(1, 100);
        let total = inner.users.len() as u64;
        let last_page = (total.div_ceil(u64::from(per_page))).max(1) as u32;
        let page = page.max(1);
        let start = u64::from(page - 1).saturating_mul(u64::from(per_page));
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        let users = inner
            .users
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();
        UserSlice {
            users,
            current_page: page,
            last_page,
            total,
        }
    }

    pub async fn facets(&self) -> Vec<UniversityDormitories> {
        self.inner.read().await.facets.clone()
    }

    pub async fn user(&self, id: UserId) -> Option<UserRecord> {
        self.inner
            .read()
            .await
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }

    /// Most recent first, capped at `limit`. Only conversations the admin
    /// takes part in are visible; without a conversation id all of them are
    /// included.
    pub async fn messages(&self, admin: UserId, limit: u32, conversation_id: Option<ConversationId>) -> Vec<MessageRecord> {
        let inner = self.inner.read().await;
        let mine: Vec<ConversationId> = inner
            .conversations
            .iter()
            .filter(|((a, _), _)| *a == admin)
            .map(|(_, id)| *id)
            .filter(|id| conversation_id.is_none_or(|wanted| wanted == *id))
            .collect();
        let mut rows: Vec<MessageRecord> = inner
            .messages
            .iter()
            .filter(|m| mine.contains(&m.conversation_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit as usize);
        rows
    }

    pub async fn send(&self, admin: UserId, receiver: UserId, text: String) -> MessageRecord {
        let mut inner = self.inner.write().await;
        let conversation_id = inner.conversation_for(admin, receiver);
        let created_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        inner.push_message(conversation_id, admin, text, created_at)
    }

    pub async fn conversation(&self, admin: UserId, user: UserId) -> Option<ConversationId> {
        self.inner
            .read()
            .await
            .conversations
            .get(&(admin, user))
            .copied()
    }
}
