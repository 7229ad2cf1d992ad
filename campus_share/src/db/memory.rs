//! In-memory implementation of the repository traits.
//!
//! Used when no database is configured in development and by the test suites.
//! Writes hold the lock for their whole read-modify-write so uniqueness and
//! download counts stay consistent under concurrent requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{
    StoreError, StoreResult,
    repository::{CommentRepository, MessageRepository, ResourceRepository, UserRepository},
};
use crate::{
    auth::{Credentials, IdentityKeys, NewUser, Role, User, UserId},
    comments::Comment,
    messages::{Category, Message, MessageId},
    resources::{Resource, ResourceFilter, ResourceId},
};

#[derive(Default)]
struct MemoryState {
    users: Vec<Credentials>,
    resources: Vec<Resource>,
    comments: Vec<Comment>,
    messages: Vec<Message>,
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Newest first; insertion order breaks timestamp ties.
fn newest_first<'a, T: Clone + 'a>(
    items: impl DoubleEndedIterator<Item = &'a T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut sorted: Vec<T> = items.rev().cloned().collect();
    sorted.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    sorted
}

fn page<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}

/// Unique field of `keys` already held by a user other than `exclude`.
fn taken_field(
    users: &[Credentials],
    keys: &IdentityKeys,
    exclude: Option<UserId>,
) -> Option<&'static str> {
    for user in users.iter().map(|c| &c.user).filter(|u| Some(u.id) != exclude) {
        let fields = [
            ("email", &keys.email, &user.email),
            ("username", &keys.username, &user.username),
            ("student_id", &keys.student_id, &user.student_id),
            ("phone", &keys.phone, &user.phone),
        ];
        if let Some((field, _, _)) = fields
            .iter()
            .find(|(_, key, value)| key.as_deref() == Some(value.as_str()))
        {
            return Some(*field);
        }
    }
    None
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_conflict(
        &self,
        keys: &IdentityKeys,
        exclude: Option<UserId>,
    ) -> StoreResult<Option<User>> {
        let state = self.state();
        let hit = |value: &String, key: &Option<String>| key.as_deref() == Some(value.as_str());

        Ok(state
            .users
            .iter()
            .map(|c| &c.user)
            .filter(|u| Some(u.id) != exclude)
            .find(|u| {
                hit(&u.email, &keys.email)
                    || hit(&u.username, &keys.username)
                    || hit(&u.student_id, &keys.student_id)
                    || hit(&u.phone, &keys.phone)
            })
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state();

        let keys = IdentityKeys {
            email: Some(user.email.clone()),
            username: Some(user.username.clone()),
            student_id: Some(user.student_id.clone()),
            phone: Some(user.phone.clone()),
        };
        if let Some(field) = taken_field(&state.users, &keys, None) {
            return Err(StoreError::Conflict(field.to_string()));
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            student_id: user.student_id,
            phone: user.phone,
            is_hosteller: user.is_hosteller,
            hostel: user.hostel,
            degree: user.degree,
            branch: user.branch,
            department: user.department,
            year: user.year,
            consent_for_contact: user.consent_for_contact,
            role: Role::Student,
            created_at: Utc::now(),
        };
        state.users.push(Credentials {
            user: created.clone(),
            password_hash: user.password_hash,
        });

        Ok(created)
    }

    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<Credentials>> {
        let state = self.state();
        let email = identifier.to_lowercase();

        let by_email = state.users.iter().find(|c| c.user.email == email);
        let found = by_email.or_else(|| {
            state.users.iter().find(|c| {
                c.user.username == identifier
                    || c.user.student_id == identifier
                    || c.user.phone == identifier
            })
        });

        Ok(found.cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let state = self.state();
        Ok(state
            .users
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| c.user.clone()))
    }

    async fn find_users(&self, user_ids: &[UserId]) -> StoreResult<Vec<User>> {
        let state = self.state();
        Ok(state
            .users
            .iter()
            .filter(|c| user_ids.contains(&c.user.id))
            .map(|c| c.user.clone())
            .collect())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state();

        let keys = IdentityKeys {
            student_id: Some(user.student_id.clone()),
            phone: Some(user.phone.clone()),
            ..Default::default()
        };
        if let Some(field) = taken_field(&state.users, &keys, Some(user.id)) {
            return Err(StoreError::Conflict(field.to_string()));
        }

        if let Some(stored) = state.users.iter_mut().find(|c| c.user.id == user.id) {
            let stored = &mut stored.user;
            stored.full_name = user.full_name.clone();
            stored.student_id = user.student_id.clone();
            stored.phone = user.phone.clone();
            stored.is_hosteller = user.is_hosteller;
            stored.hostel = user.hostel.clone();
            stored.degree = user.degree.clone();
            stored.branch = user.branch.clone();
            stored.department = user.department.clone();
            stored.year = user.year;
            stored.consent_for_contact = user.consent_for_contact;
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceRepository for MemoryStore {
    async fn insert_resource(&self, resource: &Resource) -> StoreResult<()> {
        self.state().resources.push(resource.clone());
        Ok(())
    }

    async fn find_resource(&self, id: ResourceId) -> StoreResult<Option<Resource>> {
        Ok(self.state().resources.iter().find(|r| r.id == id).cloned())
    }

    async fn list_resources(&self, offset: i64, limit: i64) -> StoreResult<Vec<Resource>> {
        let state = self.state();
        let sorted = newest_first(state.resources.iter(), |r| r.created_at);
        Ok(page(sorted, offset, limit))
    }

    async fn count_resources(&self) -> StoreResult<i64> {
        Ok(self.state().resources.len() as i64)
    }

    async fn search_resources(&self, filter: &ResourceFilter) -> StoreResult<Vec<Resource>> {
        let state = self.state();
        Ok(newest_first(
            state.resources.iter().filter(|r| filter.matches(r)),
            |r| r.created_at,
        ))
    }

    async fn increment_downloads(&self, id: ResourceId) -> StoreResult<Option<Resource>> {
        let mut state = self.state();
        Ok(state.resources.iter_mut().find(|r| r.id == id).map(|r| {
            r.downloads += 1;
            r.clone()
        }))
    }

    async fn update_resource(&self, resource: &Resource) -> StoreResult<()> {
        let mut state = self.state();
        if let Some(stored) = state.resources.iter_mut().find(|r| r.id == resource.id) {
            stored.title = resource.title.clone();
            stored.description = resource.description.clone();
            stored.subject = resource.subject.clone();
            stored.year = resource.year;
            stored.tags = resource.tags.clone();
        }
        Ok(())
    }

    async fn delete_resource(&self, id: ResourceId) -> StoreResult<bool> {
        let mut state = self.state();
        let before = state.resources.len();
        state.resources.retain(|r| r.id != id);
        let removed = state.resources.len() != before;
        if removed {
            state.comments.retain(|c| c.resource_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.state().comments.push(comment.clone());
        Ok(())
    }

    async fn list_comments(&self, resource_id: ResourceId) -> StoreResult<Vec<Comment>> {
        let state = self.state();
        Ok(newest_first(
            state.comments.iter().filter(|c| c.resource_id == resource_id),
            |c| c.created_at,
        ))
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.state().messages.push(message.clone());
        Ok(())
    }

    async fn find_message(&self, id: MessageId) -> StoreResult<Option<Message>> {
        Ok(self.state().messages.iter().find(|m| m.id == id).cloned())
    }

    async fn find_messages(&self, ids: &[MessageId]) -> StoreResult<Vec<Message>> {
        let state = self.state();
        Ok(state
            .messages
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn list_messages(
        &self,
        category: Category,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Message>> {
        let state = self.state();
        let sorted = newest_first(
            state.messages.iter().filter(|m| m.category == category),
            |m| m.created_at,
        );
        Ok(page(sorted, offset, limit))
    }

    async fn count_messages(&self, category: Category) -> StoreResult<i64> {
        let state = self.state();
        Ok(state.messages.iter().filter(|m| m.category == category).count() as i64)
    }

    async fn delete_message(&self, id: MessageId) -> StoreResult<bool> {
        let mut state = self.state();
        let before = state.messages.len();
        state.messages.retain(|m| m.id != id);
        let removed = state.messages.len() != before;
        if removed {
            for message in state.messages.iter_mut().filter(|m| m.reply_to == Some(id)) {
                message.reply_to = None;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(tag: &str) -> NewUser {
        NewUser {
            email: format!("{tag}@campus.edu"),
            username: tag.to_string(),
            password_hash: "hash".to_string(),
            full_name: None,
            student_id: format!("S-{tag}"),
            phone: format!("555-{tag}"),
            is_hosteller: false,
            hostel: None,
            degree: None,
            branch: None,
            department: None,
            year: None,
            consent_for_contact: false,
        }
    }

    fn message(category: Category, sender: UserId, age_secs: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            category,
            text: "hi".to_string(),
            media_url: None,
            media_type: None,
            sender,
            reply_to: None,
            consent_for_contact: false,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_keys() {
        let store = MemoryStore::new();
        store.create_user(new_user("ana")).await.unwrap();

        let mut dup = new_user("bob");
        dup.phone = "555-ana".to_string();
        let err = store.create_user(dup).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(field) if field == "phone"));
    }

    #[tokio::test]
    async fn test_find_by_identifier_prefers_email() {
        let store = MemoryStore::new();
        let first = store.create_user(new_user("ana")).await.unwrap();
        let mut second = new_user("bob");
        second.username = "ana@campus.edu".to_string();
        store.create_user(second).await.unwrap();

        let found = store
            .find_by_identifier("ANA@campus.edu")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user.id, first.id);

        let by_phone = store.find_by_identifier("555-bob").await.unwrap().unwrap();
        assert_eq!(by_phone.user.username, "ana@campus.edu");
    }

    #[tokio::test]
    async fn test_messages_newest_first_per_category() {
        let store = MemoryStore::new();
        let sender = Uuid::new_v4();
        let old = message(Category::Papers, sender, 30);
        let new = message(Category::Papers, sender, 1);
        let other = message(Category::Hostel, sender, 0);
        for m in [&old, &new, &other] {
            store.insert_message(m).await.unwrap();
        }

        let listed = store.list_messages(Category::Papers, 0, 10).await.unwrap();
        assert_eq!(
            listed.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![new.id, old.id]
        );
        assert_eq!(store.count_messages(Category::Papers).await.unwrap(), 2);
        assert_eq!(store.list_messages(Category::Papers, 1, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_message_clears_replies() {
        let store = MemoryStore::new();
        let sender = Uuid::new_v4();
        let parent = message(Category::Others, sender, 10);
        let mut reply = message(Category::Others, sender, 0);
        reply.reply_to = Some(parent.id);
        store.insert_message(&parent).await.unwrap();
        store.insert_message(&reply).await.unwrap();

        assert!(store.delete_message(parent.id).await.unwrap());
        assert!(!store.delete_message(parent.id).await.unwrap());

        let kept = store.find_message(reply.id).await.unwrap().unwrap();
        assert_eq!(kept.reply_to, None);
    }
}
