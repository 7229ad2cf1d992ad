//! Category chat feeds.
//!
//! Posts live in one of a fixed set of feeds and may carry a media file, a
//! reply pointer and the sender's consent to be contacted. Only the sender may
//! delete a post.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{MessageError, MessageResult};
pub use manager::MessageManager;
pub use models::{
    Category, FeedQuery, Message, MessageId, MessageKind, MessagePage, MessageView, PostMessage,
    ReplyAuthor, ReplyPreview, STICKER_PREFIX, SenderView,
};
