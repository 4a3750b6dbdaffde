use campus_types::api::ErrorBody;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

/// Failure of one admin API call.
///
/// Every fetch cycle catches these locally and turns them into an inline
/// string with [`ApiError::user_message`]; nothing is thrown past the panel
/// that issued the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// The body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Decode(String),

    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16, message: Option<String> },

    #[error("validation failed")]
    Validation {
        message: Option<String>,
        errors: IndexMap<String, Vec<String>>,
    },

    #[error("backend error (HTTP {status})")]
    Backend { status: u16, message: Option<String> },

    #[error("no session token available")]
    NoSession,
}

impl ApiError {
    /// Classify a non-2xx response from its status and raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = if body.trim().is_empty() {
            ErrorBody::default()
        } else {
            serde_json::from_str::<ErrorBody>(body).unwrap_or_else(|e| {
                warn!(status, error = %e, body = %excerpt(body), "Non-JSON error body");
                ErrorBody::default()
            })
        };

        match status {
            401 | 403 => Self::Unauthorized {
                status,
                message: parsed.message,
            },
            422 => Self::Validation {
                message: parsed.message,
                errors: parsed.errors.unwrap_or_default(),
            },
            _ => Self::Backend {
                status,
                message: parsed.message,
            },
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout | Self::Decode(_))
    }

    /// Admin-facing text for a failed `action` ("send messages", "load users", ...).
    pub fn user_message(&self, action: &str) -> String {
        match self {
            Self::Unauthorized { message: Some(m), .. } | Self::Backend { message: Some(m), .. } => {
                m.clone()
            }
            Self::Unauthorized { message: None, .. } => {
                format!("Unauthorized: only administrators can {action}.")
            }
            Self::Validation { message, errors } => {
                let base = message.as_deref().unwrap_or("Validation Error");
                if errors.is_empty() {
                    return base.to_string();
                }
                let fields: Vec<String> = errors
                    .iter()
                    .map(|(field, msgs)| format!("{field}: {}", msgs.join(", ")))
                    .collect();
                format!("{base} ({})", fields.join("; "))
            }
            Self::NoSession => "You are not signed in.".to_string(),
            Self::Network(_) | Self::Timeout | Self::Decode(_) | Self::Backend { message: None, .. } => {
                format!("Failed to {action}.")
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

pub(crate) fn excerpt(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
