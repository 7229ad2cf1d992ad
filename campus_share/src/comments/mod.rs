//! Append-only comments on resources. Failures reuse [`ResourceError`](crate::resources::ResourceError).

pub mod manager;
pub mod models;

pub use manager::CommentManager;
pub use models::{Comment, CommentId, CommentView, NewComment};
