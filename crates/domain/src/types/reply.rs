//! Reply (comment) types for community posts

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a reply.
///
/// `Pending` ids are generated locally for optimistic inserts and replaced by
/// the server id once the create request succeeds. Deserialization always
/// yields `Server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyId {
    Server(String),
    Pending(Uuid),
}

impl ReplyId {
    pub fn pending() -> Self {
        Self::Pending(Uuid::new_v4())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Server-side id, if the reply has been confirmed.
    pub fn server_id(&self) -> Option<&str> {
        match self {
            Self::Server(id) => Some(id),
            Self::Pending(_) => None,
        }
    }
}

impl fmt::Display for ReplyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => f.write_str(id),
            Self::Pending(id) => write!(f, "pending:{id}"),
        }
    }
}

/// Reply attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: ReplyId,
    pub post_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Reply {
    /// Locally-created reply awaiting server confirmation.
    pub fn pending(post_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: ReplyId::pending(),
            post_id: post_id.into(),
            content: content.into(),
            author: None,
            created_at: Some(Utc::now()),
        }
    }
}

/// Request body for creating or editing a reply.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyDraft<'a> {
    pub content: &'a str,
}
