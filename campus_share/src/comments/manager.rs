//! Comment manager implementation.

use super::models::{Comment, CommentView, NewComment};
use crate::{
    auth::{UserId, UserSummary},
    db::{CommentRepository, ResourceRepository, UserRepository},
    resources::{ResourceError, ResourceId, ResourceResult},
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Comment manager
#[derive(Clone)]
pub struct CommentManager {
    comments: Arc<dyn CommentRepository>,
    resources: Arc<dyn ResourceRepository>,
    users: Arc<dyn UserRepository>,
}

impl CommentManager {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        resources: Arc<dyn ResourceRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            comments,
            resources,
            users,
        }
    }

    /// Attach a comment to an existing resource
    ///
    /// # Errors
    ///
    /// * `ResourceError::InvalidInput` - Comment is empty after trimming
    /// * `ResourceError::NotFound` - No such resource
    pub async fn add(
        &self,
        author: UserId,
        resource_id: ResourceId,
        request: NewComment,
    ) -> ResourceResult<CommentView> {
        let text = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ResourceError::InvalidInput("Comment cannot be empty".to_string()))?;

        self.ensure_resource(resource_id).await?;

        let comment = Comment {
            id: Uuid::new_v4(),
            resource_id,
            user_id: author,
            comment: text,
            created_at: Utc::now(),
        };
        self.comments.insert_comment(&comment).await?;

        let author = self.users.find_by_id(author).await?.map(|u| u.summary());
        Ok(CommentView::new(comment, author))
    }

    /// Comments on a resource, newest first
    pub async fn list(&self, resource_id: ResourceId) -> ResourceResult<Vec<CommentView>> {
        self.ensure_resource(resource_id).await?;

        let comments = self.comments.list_comments(resource_id).await?;

        let mut ids: Vec<UserId> = comments.iter().map(|c| c.user_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let authors: HashMap<UserId, UserSummary> = self
            .users
            .find_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();

        Ok(comments
            .into_iter()
            .map(|c| {
                let author = authors.get(&c.user_id).cloned();
                CommentView::new(c, author)
            })
            .collect())
    }

    async fn ensure_resource(&self, resource_id: ResourceId) -> ResourceResult<()> {
        match self.resources.find_resource(resource_id).await? {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::NewUser, db::Repositories, resources::Resource};

    async fn setup() -> (CommentManager, UserId, ResourceId) {
        let repos = Repositories::in_memory();
        let user = repos
            .users
            .create_user(NewUser {
                email: "ana@campus.edu".to_string(),
                username: "ana".to_string(),
                password_hash: "hash".to_string(),
                full_name: Some("Ana".to_string()),
                student_id: "S1".to_string(),
                phone: "555".to_string(),
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

        let resource = Resource {
            id: Uuid::new_v4(),
            title: "Notes".to_string(),
            description: String::new(),
            subject: "Maths".to_string(),
            year: 1,
            file_url: "/uploads/1_notes.pdf".to_string(),
            stored_file: true,
            uploaded_by: user.id,
            downloads: 0,
            tags: Vec::new(),
            created_at: Utc::now(),
        };
        repos.resources.insert_resource(&resource).await.unwrap();

        let manager = CommentManager::new(repos.comments, repos.resources, repos.users);
        (manager, user.id, resource.id)
    }

    fn comment(text: &str) -> NewComment {
        NewComment {
            comment: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_add_trims_and_embeds_author() {
        let (manager, user, resource) = setup().await;
        let view = manager.add(user, resource, comment("  great notes ")).await.unwrap();

        assert_eq!(view.comment, "great notes");
        assert_eq!(view.user.unwrap().full_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_add_rejects_blank_comment() {
        let (manager, user, resource) = setup().await;
        assert!(matches!(
            manager.add(user, resource, comment("   ")).await,
            Err(ResourceError::InvalidInput(_))
        ));
        assert!(matches!(
            manager.add(user, resource, NewComment::default()).await,
            Err(ResourceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_resource_is_not_found() {
        let (manager, user, _) = setup().await;
        let missing = Uuid::new_v4();
        assert!(matches!(
            manager.add(user, missing, comment("hi")).await,
            Err(ResourceError::NotFound)
        ));
        assert!(matches!(
            manager.list(missing).await,
            Err(ResourceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (manager, user, resource) = setup().await;
        manager.add(user, resource, comment("first")).await.unwrap();
        manager.add(user, resource, comment("second")).await.unwrap();

        let listed = manager.list(resource).await.unwrap();
        let texts: Vec<&str> = listed.iter().map(|c| c.comment.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }
}
