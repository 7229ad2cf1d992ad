//! Message data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::{
    auth::{User, UserId},
    de,
    pagination::Pagination,
};

use super::errors::MessageError;

/// Message ID type
pub type MessageId = Uuid;

/// Text prefix the client uses to send a sticker.
pub const STICKER_PREFIX: &str = ":sticker:";

/// Chat feeds. Posting into or reading an unknown feed is rejected instead of
/// silently creating an empty one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sharing,
    Papers,
    Borrow,
    Laundry,
    Faculty,
    Ffcs,
    Hostel,
    Alumni,
    Others,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Sharing,
        Category::Papers,
        Category::Borrow,
        Category::Laundry,
        Category::Faculty,
        Category::Ffcs,
        Category::Hostel,
        Category::Alumni,
        Category::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sharing => "sharing",
            Category::Papers => "papers",
            Category::Borrow => "borrow",
            Category::Laundry => "laundry",
            Category::Faculty => "faculty",
            Category::Ffcs => "ffcs",
            Category::Hostel => "hostel",
            Category::Alumni => "alumni",
            Category::Others => "others",
        }
    }

    /// Human readable feed title.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Sharing => "Sharing Auto",
            Category::Papers => "Recent/Previous Papers",
            Category::Borrow => "Borrow / Lend",
            Category::Laundry => "Lost / Mixed Laundry",
            Category::Faculty => "Faculty Cabin Details",
            Category::Ffcs => "FFCS",
            Category::Hostel => "Hostel Issues",
            Category::Alumni => "Alumni Help",
            Category::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| MessageError::UnknownCategory(s.to_string()))
    }
}

/// Derived presentation hint for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Sticker,
    Image,
    Audio,
    Video,
    File,
}

/// Persisted chat post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub category: Category,
    pub text: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub sender: UserId,
    pub reply_to: Option<MessageId>,
    pub consent_for_contact: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self.media_type.as_deref() {
            Some("image") => MessageKind::Image,
            Some("audio") => MessageKind::Audio,
            Some("video") => MessageKind::Video,
            Some(_) => MessageKind::File,
            None if self.text.starts_with(STICKER_PREFIX) => MessageKind::Sticker,
            None => MessageKind::Text,
        }
    }
}

/// Text fields of a post; the optional file travels separately.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMessage {
    pub category: Option<String>,
    pub text: Option<String>,
    pub reply_to: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub consent_for_contact: bool,
}

/// Query string of the category feed.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FeedQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Sender identity. Contact fields are only filled when the post consents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderView {
    pub user_id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub student_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl SenderView {
    pub fn new(user: &User, reveal_contact: bool) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            student_id: user.student_id.clone(),
            email: reveal_contact.then(|| user.email.clone()),
            phone: reveal_contact.then(|| user.phone.clone()),
        }
    }
}

/// Author of a replied-to message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyAuthor {
    pub user_id: UserId,
    pub username: String,
    pub full_name: Option<String>,
}

impl From<&User> for ReplyAuthor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

/// One-level preview of the replied-to message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyPreview {
    pub id: MessageId,
    pub text: String,
    pub sender: Option<ReplyAuthor>,
    pub created_at: DateTime<Utc>,
}

/// Message with sender and reply preview denormalized.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub category: Category,
    pub kind: MessageKind,
    pub text: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub sender: Option<SenderView>,
    pub reply_to: Option<ReplyPreview>,
    pub consent_for_contact: bool,
    pub created_at: DateTime<Utc>,
}

/// One page of a category feed.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<MessageView>,
    pub pagination: Pagination,
}
