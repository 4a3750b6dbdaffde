use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{MessageRecord, UniversityDormitories, UserRecord};
use crate::{ConversationId, MessageId, UserId};

/// Parse a backend timestamp. The API emits RFC 3339, but rows that come
/// straight from MySQL/SQLite are "YYYY-MM-DD HH:MM:SS" without a zone and
/// are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .ok()
}

/// A marketplace user as shown in the admin messaging directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub status: Option<String>,
    pub avatar_url: Option<String>,
    pub university_name: Option<String>,
    pub dormitory_name: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub product_count: u32,
    pub sold_counter: u32,
}

impl DirectoryUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

impl From<UserRecord> for DirectoryUser {
    fn from(rec: UserRecord) -> Self {
        let last_login_at = rec.last_login_at.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warn!("Unparseable last_login_at '{}' on user {}", raw, rec.id);
            }
            parsed
        });
        Self {
            id: rec.id,
            display_name: rec.full_name,
            email: rec.email,
            role: rec.role,
            status: rec.status,
            avatar_url: rec.profile_picture,
            university_name: rec.university_name,
            dormitory_name: rec.dormitory_name,
            last_login_at,
            product_count: rec.product_count.unwrap_or(0),
            sold_counter: rec.sold_counter.unwrap_or(0),
        }
    }
}

/// University name -> ordered dormitory names, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetOptions {
    universities: IndexMap<String, IndexSet<String>>,
}

impl FacetOptions {
    pub fn from_entries(entries: Vec<UniversityDormitories>) -> Self {
        let mut universities: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for entry in entries {
            // Duplicate university rows are merged rather than overwritten.
            universities
                .entry(entry.university_name)
                .or_default()
                .extend(entry.dormitories);
        }
        Self { universities }
    }

    pub fn universities(&self) -> impl Iterator<Item = &str> {
        self.universities.keys().map(String::as_str)
    }

    pub fn contains_university(&self, university: &str) -> bool {
        self.universities.contains_key(university)
    }

    pub fn dormitories(&self, university: &str) -> Option<&IndexSet<String>> {
        self.universities.get(university)
    }

    pub fn has_dormitory(&self, university: &str, dormitory: &str) -> bool {
        self.dormitories(university)
            .is_some_and(|dorms| dorms.contains(dormitory))
    }
}

/// Who wrote a message, relative to the two participants of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRef {
    Admin,
    User,
}

/// The two sides of an admin <-> user thread.
///
/// `admin` is optional because the session token does not always carry the
/// admin's own user id. A sender matching `admin` is the admin side, one
/// matching `counterpart` is the user side. Anyone else (another admin
/// answering in the same conversation) is counted on the admin side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participants {
    pub admin: Option<UserId>,
    pub counterpart: UserId,
}

impl Participants {
    pub fn new(admin: Option<UserId>, counterpart: UserId) -> Self {
        Self { admin, counterpart }
    }

    pub fn classify(&self, sender_id: UserId) -> SenderRef {
        match self.admin {
            Some(admin) if admin == sender_id => SenderRef::Admin,
            _ if sender_id == self.counterpart => SenderRef::User,
            _ => SenderRef::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `None` for a locally synthesized echo the backend never returned.
    pub id: Option<MessageId>,
    pub conversation_id: Option<ConversationId>,
    pub sender_id: Option<UserId>,
    pub sender: SenderRef,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn from_record(rec: MessageRecord, participants: &Participants) -> Self {
        let sent_at = parse_timestamp(&rec.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on message {}", rec.created_at, rec.id);
            DateTime::default()
        });
        Self {
            id: Some(rec.id),
            conversation_id: Some(rec.conversation_id),
            sender_id: Some(rec.sender_id),
            sender: participants.classify(rec.sender_id),
            text: rec.message_text,
            sent_at,
        }
    }

    /// Stand-in for a sent message when the backend did not echo it back.
    pub fn local_echo(
        text: String,
        conversation_id: Option<ConversationId>,
        participants: &Participants,
    ) -> Self {
        Self {
            id: None,
            conversation_id,
            sender_id: participants.admin,
            sender: SenderRef::Admin,
            text,
            sent_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: MessageId, conversation_id: ConversationId, sender_id: UserId) -> MessageRecord {
        MessageRecord {
            id,
            conversation_id,
            sender_id,
            sender_username: None,
            message_text: format!("m{id}"),
            created_at: "2025-03-01 10:00:00".into(),
        }
    }

    #[test]
    fn sender_polarity_follows_counterpart() {
        let participants = Participants::new(Some(1), 42);
        assert_eq!(participants.classify(42), SenderRef::User);
        assert_eq!(participants.classify(1), SenderRef::Admin);
        assert_eq!(participants.classify(7), SenderRef::Admin);

        // Without the admin's own id the counterpart rule still holds.
        let unknown_admin = Participants::new(None, 42);
        assert_eq!(unknown_admin.classify(42), SenderRef::User);
        assert_eq!(unknown_admin.classify(1), SenderRef::Admin);

        let msg = ChatMessage::from_record(record(5, 9, 42), &participants);
        assert_eq!(msg.sender, SenderRef::User);
        assert_eq!(msg.conversation_id, Some(9));
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive() {
        let a = parse_timestamp("2025-03-01T10:00:00Z").unwrap();
        let b = parse_timestamp("2025-03-01 10:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        let mut rec = record(1, 1, 42);
        rec.created_at = "not a date".into();
        let msg = ChatMessage::from_record(rec, &Participants::new(None, 42));
        assert_eq!(msg.sent_at, DateTime::<Utc>::default());
    }

    #[test]
    fn facet_options_merge_duplicate_universities() {
        let facets = FacetOptions::from_entries(vec![
            UniversityDormitories {
                university_name: "MIT".into(),
                dormitories: vec!["Baker House".into(), "Next House".into()],
            },
            UniversityDormitories {
                university_name: "Stanford".into(),
                dormitories: vec!["Roble".into()],
            },
            UniversityDormitories {
                university_name: "MIT".into(),
                dormitories: vec!["Baker House".into(), "Simmons".into()],
            },
        ]);

        assert_eq!(facets.universities().collect::<Vec<_>>(), vec!["MIT", "Stanford"]);
        let mit: Vec<_> = facets.dormitories("MIT").unwrap().iter().cloned().collect();
        assert_eq!(mit, vec!["Baker House", "Next House", "Simmons"]);
        assert!(facets.has_dormitory("Stanford", "Roble"));
        assert!(!facets.has_dormitory("Stanford", "Baker House"));
    }

    #[test]
    fn directory_user_from_record() {
        let user = DirectoryUser::from(UserRecord {
            id: 3,
            full_name: "Dana".into(),
            email: "dana@example.edu".into(),
            role: "Admin".into(),
            status: Some("active".into()),
            profile_picture: None,
            last_login_at: Some("2025-01-02 03:04:05".into()),
            dormitory_name: None,
            product_count: Some(4),
            sold_counter: None,
            university_name: Some("MIT".into()),
        });
        assert!(user.is_admin());
        assert_eq!(user.display_name, "Dana");
        assert_eq!(user.product_count, 4);
        assert_eq!(user.sold_counter, 0);
        assert!(user.last_login_at.is_some());
    }
}
