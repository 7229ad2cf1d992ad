//! Message manager implementation.

use super::{
    errors::{MessageError, MessageResult},
    models::{
        Category, FeedQuery, Message, MessageId, MessagePage, MessageView, PostMessage,
        ReplyAuthor, ReplyPreview, SenderView,
    },
};
use crate::{
    auth::{User, UserId},
    db::{MessageRepository, UserRepository},
    pagination::{DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT, PageRequest, Pagination},
    uploads::{StoredUpload, UploadStore},
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Message manager
#[derive(Clone)]
pub struct MessageManager {
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserRepository>,
    uploads: Arc<UploadStore>,
}

impl MessageManager {
    /// Create a new message manager
    ///
    /// # Arguments
    ///
    /// * `messages` - Message store
    /// * `users` - Used to embed sender identities
    /// * `uploads` - Media attached to posts is removed through it on delete
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserRepository>,
        uploads: Arc<UploadStore>,
    ) -> Self {
        Self {
            messages,
            users,
            uploads,
        }
    }

    /// Post into a category feed
    ///
    /// Neither text nor media is required. A stored `attachment` is removed
    /// again when the post is rejected.
    ///
    /// # Errors
    ///
    /// * `MessageError::MissingCategory` - No category given
    /// * `MessageError::UnknownCategory` - Category outside the known feeds
    /// * `MessageError::InvalidInput` - `reply_to` is not a message ID
    /// * `MessageError::ReplyNotFound` - `reply_to` names no existing message
    pub async fn post(
        &self,
        sender: UserId,
        request: PostMessage,
        attachment: Option<StoredUpload>,
    ) -> MessageResult<MessageView> {
        let message = match self.prepare(sender, request, attachment.as_ref()).await {
            Ok(message) => message,
            Err(e) => {
                if let Some(attachment) = &attachment {
                    self.uploads.remove(&attachment.public_url).await;
                }
                return Err(e);
            }
        };

        self.messages.insert_message(&message).await?;
        log::debug!(
            "Message {} posted to {} by {}",
            message.id,
            message.category,
            sender
        );

        let mut views = self.views(vec![message]).await?;
        views.pop().ok_or(MessageError::NotFound)
    }

    async fn prepare(
        &self,
        sender: UserId,
        request: PostMessage,
        attachment: Option<&StoredUpload>,
    ) -> MessageResult<Message> {
        let category = request
            .category
            .filter(|c| !c.trim().is_empty())
            .ok_or(MessageError::MissingCategory)?
            .parse::<Category>()?;

        let reply_to = match request.reply_to.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let id = Uuid::parse_str(raw)
                    .map_err(|_| MessageError::InvalidInput("Invalid reply_to id".to_string()))?;
                if self.messages.find_message(id).await?.is_none() {
                    return Err(MessageError::ReplyNotFound);
                }
                Some(id)
            }
            _ => None,
        };

        Ok(Message {
            id: Uuid::new_v4(),
            category,
            text: request.text.unwrap_or_default(),
            media_url: attachment.map(|a| a.public_url.clone()),
            media_type: attachment.map(|a| a.media_type.clone()),
            sender,
            reply_to,
            consent_for_contact: request.consent_for_contact,
            created_at: Utc::now(),
        })
    }

    /// Newest-first page of one feed
    pub async fn list_by_category(
        &self,
        category: &str,
        query: FeedQuery,
    ) -> MessageResult<MessagePage> {
        let category: Category = category.parse()?;
        let request = PageRequest::new(
            query.page,
            query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
            MAX_MESSAGE_LIMIT,
        );

        let total = self.messages.count_messages(category).await?;
        let messages = self
            .messages
            .list_messages(category, request.offset(), request.limit)
            .await?;

        Ok(MessagePage {
            messages: self.views(messages).await?,
            pagination: Pagination::new(total, request),
        })
    }

    /// Delete a sender's own message and its media
    ///
    /// # Errors
    ///
    /// * `MessageError::NotFound` - No such message
    /// * `MessageError::Forbidden` - Caller is not the sender
    pub async fn delete(&self, caller: UserId, id: MessageId) -> MessageResult<()> {
        let message = self
            .messages
            .find_message(id)
            .await?
            .ok_or(MessageError::NotFound)?;

        if message.sender != caller {
            return Err(MessageError::Forbidden(
                "You can only delete your own messages".to_string(),
            ));
        }

        if let Some(media_url) = &message.media_url {
            self.uploads.remove(media_url).await;
        }
        if !self.messages.delete_message(id).await? {
            return Err(MessageError::NotFound);
        }

        log::debug!("Message {} deleted by {}", id, caller);
        Ok(())
    }

    async fn views(&self, messages: Vec<Message>) -> MessageResult<Vec<MessageView>> {
        let reply_ids: Vec<MessageId> = messages.iter().filter_map(|m| m.reply_to).collect();
        let replies: HashMap<MessageId, Message> = self
            .messages
            .find_messages(&reply_ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let mut user_ids: Vec<UserId> = messages
            .iter()
            .map(|m| m.sender)
            .chain(replies.values().map(|m| m.sender))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users: HashMap<UserId, User> = self
            .users
            .find_users(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(messages
            .into_iter()
            .map(|message| {
                let sender = users
                    .get(&message.sender)
                    .map(|u| SenderView::new(u, message.consent_for_contact));
                let reply_to = message
                    .reply_to
                    .and_then(|id| replies.get(&id))
                    .map(|reply| ReplyPreview {
                        id: reply.id,
                        text: reply.text.clone(),
                        sender: users.get(&reply.sender).map(ReplyAuthor::from),
                        created_at: reply.created_at,
                    });

                MessageView {
                    id: message.id,
                    category: message.category,
                    kind: message.kind(),
                    text: message.text,
                    media_url: message.media_url,
                    media_type: message.media_type,
                    sender,
                    reply_to,
                    consent_for_contact: message.consent_for_contact,
                    created_at: message.created_at,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::NewUser,
        db::Repositories,
        messages::models::MessageKind,
    };

    async fn setup() -> (MessageManager, User, User) {
        let repos = Repositories::in_memory();
        let mut users = Vec::new();
        for tag in ["ana", "bob"] {
            let user = repos
                .users
                .create_user(NewUser {
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
                })
                .await
                .unwrap();
            users.push(user);
        }
        let uploads = Arc::new(UploadStore::new(
            std::env::temp_dir().join("campus_share_message_tests"),
            1024,
        ));
        let manager = MessageManager::new(repos.messages, repos.users, uploads);
        let bob = users.pop().unwrap();
        let ana = users.pop().unwrap();
        (manager, ana, bob)
    }

    fn post(category: &str, text: &str) -> PostMessage {
        PostMessage {
            category: Some(category.to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_post_requires_known_category() {
        let (manager, ana, _) = setup().await;
        assert!(matches!(
            manager.post(ana.id, PostMessage::default(), None).await,
            Err(MessageError::MissingCategory)
        ));
        assert!(matches!(
            manager.post(ana.id, post("gossip", "hi"), None).await,
            Err(MessageError::UnknownCategory(_))
        ));
    }

    #[tokio::test]
    async fn test_sticker_and_empty_posts_are_accepted() {
        let (manager, ana, _) = setup().await;
        let sticker = manager
            .post(ana.id, post("others", ":sticker:🎉"), None)
            .await
            .unwrap();
        assert_eq!(sticker.kind, MessageKind::Sticker);

        let empty = manager
            .post(ana.id, post("others", ""), None)
            .await
            .unwrap();
        assert_eq!(empty.kind, MessageKind::Text);
    }

    #[tokio::test]
    async fn test_file_only_post_carries_media() {
        let (manager, ana, _) = setup().await;
        let attachment = StoredUpload {
            file_name: "1_photo.png".to_string(),
            public_url: "/uploads/1_photo.png".to_string(),
            content_type: "image/png".to_string(),
            media_type: "image".to_string(),
            size: 3,
        };
        let mut request = post("laundry", "");
        request.text = None;

        let view = manager.post(ana.id, request, Some(attachment)).await.unwrap();
        assert_eq!(view.kind, MessageKind::Image);
        assert_eq!(view.media_url.as_deref(), Some("/uploads/1_photo.png"));
    }

    #[tokio::test]
    async fn test_reply_preview_and_missing_target() {
        let (manager, ana, bob) = setup().await;
        let parent = manager.post(ana.id, post("borrow", "need a lab coat"), None).await.unwrap();

        let mut reply = post("borrow", "I have one");
        reply.reply_to = Some(parent.id.to_string());
        let view = manager.post(bob.id, reply, None).await.unwrap();
        let preview = view.reply_to.unwrap();
        assert_eq!(preview.text, "need a lab coat");
        assert_eq!(preview.sender.unwrap().username, "ana");

        let mut dangling = post("borrow", "hello?");
        dangling.reply_to = Some(Uuid::new_v4().to_string());
        assert!(matches!(
            manager.post(bob.id, dangling, None).await,
            Err(MessageError::ReplyNotFound)
        ));

        let mut garbage = post("borrow", "hello?");
        garbage.reply_to = Some("not-an-id".to_string());
        assert!(matches!(
            manager.post(bob.id, garbage, None).await,
            Err(MessageError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_contact_revealed_only_with_consent() {
        let (manager, ana, _) = setup().await;
        let hidden = manager.post(ana.id, post("hostel", "leak"), None).await.unwrap();
        assert_eq!(hidden.sender.unwrap().phone, None);

        let mut request = post("hostel", "call me");
        request.consent_for_contact = true;
        let shown = manager.post(ana.id, request, None).await.unwrap();
        assert_eq!(shown.sender.unwrap().phone.as_deref(), Some("555-ana"));
    }

    #[tokio::test]
    async fn test_delete_by_other_user_is_forbidden() {
        let (manager, ana, bob) = setup().await;
        let view = manager.post(ana.id, post("faculty", "cabin 4"), None).await.unwrap();

        assert!(matches!(
            manager.delete(bob.id, view.id).await,
            Err(MessageError::Forbidden(_))
        ));
        let page = manager.list_by_category("faculty", FeedQuery::default()).await.unwrap();
        assert_eq!(page.messages.len(), 1);

        manager.delete(ana.id, view.id).await.unwrap();
        assert!(matches!(
            manager.delete(ana.id, view.id).await,
            Err(MessageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_feed_pagination_and_limit_clamp() {
        let (manager, ana, _) = setup().await;
        for i in 0..3 {
            manager.post(ana.id, post("ffcs", &format!("m{i}")), None).await.unwrap();
        }

        let page = manager
            .list_by_category(
                "ffcs",
                FeedQuery {
                    page: Some(2),
                    limit: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].text, "m0");
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.pages, 2);

        let clamped = manager
            .list_by_category(
                "ffcs",
                FeedQuery {
                    page: None,
                    limit: Some(0),
                },
            )
            .await
            .unwrap();
        assert_eq!(clamped.messages.len(), 1);
        assert_eq!(clamped.messages[0].text, "m2");

        assert!(matches!(
            manager.list_by_category("nope", FeedQuery::default()).await,
            Err(MessageError::UnknownCategory(_))
        ));
    }
}
