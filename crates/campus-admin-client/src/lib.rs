//! Headless engine behind the admin chat screen: user directory paging,
//! facet filters, conversation id discovery and the message fetch/send
//! cycles, all against the admin REST API.

pub mod backend;
pub mod chat;
pub mod config;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod events;
pub mod facets;
pub mod send;
pub mod session;
pub mod thread;

pub use backend::{AdminBackend, HttpBackend};
pub use chat::AdminChat;
pub use config::ClientConfig;
pub use error::ApiError;
