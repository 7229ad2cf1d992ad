//! Comment data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{UserId, UserSummary},
    resources::ResourceId,
};

/// Comment ID type
pub type CommentId = Uuid;

/// Append-only comment on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub resource_id: ResourceId,
    pub user_id: UserId,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /resources/{id}/comments`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewComment {
    pub comment: Option<String>,
}

/// Comment with its author denormalized.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub resource_id: ResourceId,
    pub user: Option<UserSummary>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: Comment, author: Option<UserSummary>) -> Self {
        Self {
            id: comment.id,
            resource_id: comment.resource_id,
            user: author,
            comment: comment.comment,
            created_at: comment.created_at,
        }
    }
}
