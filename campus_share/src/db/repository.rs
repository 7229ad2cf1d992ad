//! Repository trait definitions.
//!
//! Managers depend on these traits rather than on a concrete database so the
//! same logic runs over PostgreSQL and the in-memory store.

use async_trait::async_trait;

use super::StoreResult;
use crate::{
    auth::{Credentials, IdentityKeys, NewUser, User, UserId},
    comments::Comment,
    messages::{Category, Message, MessageId},
    resources::{Resource, ResourceFilter, ResourceId},
};

/// Credential store
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// First user colliding with any of the provided keys, ignoring `exclude`
    async fn find_conflict(
        &self,
        keys: &IdentityKeys,
        exclude: Option<UserId>,
    ) -> StoreResult<Option<User>>;

    /// Insert a new user
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Find user plus password hash by email (case-insensitive), username, student ID or phone
    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<Credentials>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Batch lookup; missing IDs are skipped
    async fn find_users(&self, user_ids: &[UserId]) -> StoreResult<Vec<User>>;

    /// Persist the mutable profile fields of `user`
    async fn update_user(&self, user: &User) -> StoreResult<()>;
}

/// Resource metadata store
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn insert_resource(&self, resource: &Resource) -> StoreResult<()>;

    async fn find_resource(&self, id: ResourceId) -> StoreResult<Option<Resource>>;

    /// Newest-first page
    async fn list_resources(&self, offset: i64, limit: i64) -> StoreResult<Vec<Resource>>;

    async fn count_resources(&self) -> StoreResult<i64>;

    /// Newest-first, unpaginated
    async fn search_resources(&self, filter: &ResourceFilter) -> StoreResult<Vec<Resource>>;

    /// Add one download and return the updated resource
    async fn increment_downloads(&self, id: ResourceId) -> StoreResult<Option<Resource>>;

    /// Persist title, description, subject, year and tags
    async fn update_resource(&self, resource: &Resource) -> StoreResult<()>;

    /// Delete a resource and its comments; returns whether it existed
    async fn delete_resource(&self, id: ResourceId) -> StoreResult<bool>;
}

/// Comment store
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;

    /// Newest-first
    async fn list_comments(&self, resource_id: ResourceId) -> StoreResult<Vec<Comment>>;
}

/// Chat message store
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert_message(&self, message: &Message) -> StoreResult<()>;

    async fn find_message(&self, id: MessageId) -> StoreResult<Option<Message>>;

    /// Batch lookup; missing IDs are skipped
    async fn find_messages(&self, ids: &[MessageId]) -> StoreResult<Vec<Message>>;

    /// Newest-first page of one category
    async fn list_messages(
        &self,
        category: Category,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Message>>;

    async fn count_messages(&self, category: Category) -> StoreResult<i64>;

    /// Delete a message, clearing replies that pointed at it; returns whether it existed
    async fn delete_message(&self, id: MessageId) -> StoreResult<bool>;
}
