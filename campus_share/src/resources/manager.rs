//! Resource manager implementation.

use super::{
    errors::{ResourceError, ResourceResult},
    models::{
        DownloadTicket, NewResourceRequest, Resource, ResourceFilter, ResourceId, ResourcePage,
        ResourceUpdate, ResourceView, SearchQuery,
    },
};
use crate::{
    auth::{UserId, UserSummary},
    db::{ResourceRepository, UserRepository},
    pagination::{PageRequest, Pagination, RESOURCE_PAGE_SIZE},
    uploads::{PUBLIC_PREFIX, StoredUpload, UploadStore},
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Resource manager
#[derive(Clone)]
pub struct ResourceManager {
    resources: Arc<dyn ResourceRepository>,
    users: Arc<dyn UserRepository>,
    uploads: Arc<UploadStore>,
}

impl ResourceManager {
    /// Create a new resource manager
    ///
    /// # Arguments
    ///
    /// * `resources` - Resource metadata store
    /// * `users` - Used to embed uploader summaries in views
    /// * `uploads` - File intake; files it stored are removed with their resource
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        users: Arc<dyn UserRepository>,
        uploads: Arc<UploadStore>,
    ) -> Self {
        Self {
            resources,
            users,
            uploads,
        }
    }

    /// Publish a resource
    ///
    /// `attachment` is a file already stored by intake; when present its URL
    /// replaces any `file_url` in the request. It is removed again if the
    /// request fails validation.
    ///
    /// # Errors
    ///
    /// * `ResourceError::MissingFields` - title, subject, year or file_url absent
    /// * `ResourceError::InvalidInput` - year is not positive, or a bare
    ///   `file_url` points into the upload directory
    pub async fn create(
        &self,
        uploader: UserId,
        request: NewResourceRequest,
        attachment: Option<StoredUpload>,
    ) -> ResourceResult<ResourceView> {
        let result = self.validate_new(uploader, request, attachment.as_ref());
        let resource = match result {
            Ok(resource) => resource,
            Err(e) => {
                if let Some(attachment) = &attachment {
                    self.uploads.remove(&attachment.public_url).await;
                }
                return Err(e);
            }
        };

        self.resources.insert_resource(&resource).await?;
        log::info!(
            "Resource {} '{}' published by {}",
            resource.id,
            resource.title,
            uploader
        );

        let uploader = self.users.find_by_id(uploader).await?.map(|u| u.summary());
        Ok(ResourceView::new(resource, uploader))
    }

    fn validate_new(
        &self,
        uploader: UserId,
        request: NewResourceRequest,
        attachment: Option<&StoredUpload>,
    ) -> ResourceResult<Resource> {
        let title = present(request.title);
        let subject = present(request.subject);
        let pointer = present(request.file_url);
        if attachment.is_none() {
            if let Some(pointer) = &pointer {
                if pointer.starts_with(PUBLIC_PREFIX) {
                    return Err(ResourceError::InvalidInput(format!(
                        "file_url may not point into {PUBLIC_PREFIX}; attach the file instead"
                    )));
                }
            }
        }
        let file_url = attachment.map(|a| a.public_url.clone()).or(pointer);

        let (Some(title), Some(subject), Some(year), Some(file_url)) =
            (title, subject, request.year, file_url)
        else {
            return Err(ResourceError::MissingFields(
                "title, subject, year and file are required".to_string(),
            ));
        };
        if year <= 0 {
            return Err(ResourceError::InvalidInput(
                "year must be a positive integer".to_string(),
            ));
        }

        Ok(Resource {
            id: Uuid::new_v4(),
            title,
            description: request
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            subject,
            year,
            file_url,
            stored_file: attachment.is_some(),
            uploaded_by: uploader,
            downloads: 0,
            tags: clean_tags(request.tags.unwrap_or_default()),
            created_at: Utc::now(),
        })
    }

    /// Newest-first page of all resources
    pub async fn list(&self, page: Option<i64>) -> ResourceResult<ResourcePage> {
        let request = PageRequest::new(page, RESOURCE_PAGE_SIZE, RESOURCE_PAGE_SIZE);
        let total = self.resources.count_resources().await?;
        let resources = self
            .resources
            .list_resources(request.offset(), request.limit)
            .await?;

        Ok(ResourcePage {
            resources: self.views(resources).await?,
            pagination: Pagination::new(total, request),
        })
    }

    pub async fn get(&self, id: ResourceId) -> ResourceResult<ResourceView> {
        let resource = self.find(id).await?;
        let uploader = self
            .users
            .find_by_id(resource.uploaded_by)
            .await?
            .map(|u| u.summary());
        Ok(ResourceView::new(resource, uploader))
    }

    /// Filtered, unpaginated, newest-first search
    pub async fn search(&self, query: SearchQuery) -> ResourceResult<Vec<ResourceView>> {
        let filter = ResourceFilter {
            query: present(query.q),
            subject: present(query.subject),
            year: query.year,
            uploaded_by: None,
        };
        let resources = self.resources.search_resources(&filter).await?;
        self.views(resources).await
    }

    /// Count a download and hand back the file pointer
    pub async fn download(&self, id: ResourceId) -> ResourceResult<DownloadTicket> {
        let resource = self
            .resources
            .increment_downloads(id)
            .await?
            .ok_or(ResourceError::NotFound)?;

        Ok(DownloadTicket {
            file_url: resource.file_url,
            downloads: resource.downloads,
        })
    }

    /// Apply an owner's partial update
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - No such resource
    /// * `ResourceError::Forbidden` - Caller is not the uploader
    /// * `ResourceError::InvalidInput` - year is not positive
    pub async fn update(
        &self,
        caller: UserId,
        id: ResourceId,
        update: ResourceUpdate,
    ) -> ResourceResult<ResourceView> {
        let mut resource = self.find(id).await?;
        if resource.uploaded_by != caller {
            return Err(ResourceError::Forbidden(
                "You can only update your own resources".to_string(),
            ));
        }

        if let Some(title) = present(update.title) {
            resource.title = title;
        }
        if let Some(description) = present(update.description) {
            resource.description = description;
        }
        if let Some(subject) = present(update.subject) {
            resource.subject = subject;
        }
        if let Some(year) = update.year {
            if year <= 0 {
                return Err(ResourceError::InvalidInput(
                    "year must be a positive integer".to_string(),
                ));
            }
            resource.year = year;
        }
        if let Some(tags) = update.tags {
            let tags = clean_tags(tags);
            if !tags.is_empty() {
                resource.tags = tags;
            }
        }

        self.resources.update_resource(&resource).await?;
        self.get(id).await
    }

    /// Delete an owner's resource together with its comments and stored file
    pub async fn delete(&self, caller: UserId, id: ResourceId) -> ResourceResult<()> {
        let resource = self.find(id).await?;
        if resource.uploaded_by != caller {
            return Err(ResourceError::Forbidden(
                "You can only delete your own resources".to_string(),
            ));
        }

        if resource.stored_file {
            self.uploads.remove(&resource.file_url).await;
        }
        if !self.resources.delete_resource(id).await? {
            return Err(ResourceError::NotFound);
        }

        log::info!("Resource {} deleted by {}", id, caller);
        Ok(())
    }

    /// Caller's own uploads, newest first
    pub async fn list_mine(&self, caller: UserId) -> ResourceResult<Vec<ResourceView>> {
        let filter = ResourceFilter {
            uploaded_by: Some(caller),
            ..Default::default()
        };
        let resources = self.resources.search_resources(&filter).await?;
        self.views(resources).await
    }

    async fn find(&self, id: ResourceId) -> ResourceResult<Resource> {
        self.resources
            .find_resource(id)
            .await?
            .ok_or(ResourceError::NotFound)
    }

    async fn views(&self, resources: Vec<Resource>) -> ResourceResult<Vec<ResourceView>> {
        let mut ids: Vec<UserId> = resources.iter().map(|r| r.uploaded_by).collect();
        ids.sort_unstable();
        ids.dedup();

        let uploaders: HashMap<UserId, UserSummary> = self
            .users
            .find_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();

        Ok(resources
            .into_iter()
            .map(|r| {
                let uploader = uploaders.get(&r.uploaded_by).cloned();
                ResourceView::new(r, uploader)
            })
            .collect())
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{NewUser, User},
        db::Repositories,
    };

    async fn setup() -> (ResourceManager, User, User) {
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
            std::env::temp_dir().join("campus_share_resource_tests"),
            1024,
        ));
        let manager = ResourceManager::new(repos.resources, repos.users, uploads);
        let bob = users.pop().unwrap();
        let ana = users.pop().unwrap();
        (manager, ana, bob)
    }

    fn request(title: &str) -> NewResourceRequest {
        NewResourceRequest {
            title: Some(title.to_string()),
            subject: Some("Maths".to_string()),
            year: Some(2),
            file_url: Some("https://files.campus.edu/notes.pdf".to_string()),
            tags: Some(vec![" exam ".to_string(), "".to_string()]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_embeds_uploader_and_cleans_tags() {
        let (manager, ana, _) = setup().await;
        let view = manager.create(ana.id, request("  Notes "), None).await.unwrap();

        assert_eq!(view.title, "Notes");
        assert_eq!(view.tags, vec!["exam".to_string()]);
        assert_eq!(view.uploaded_by.unwrap().username, "ana");
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let (manager, ana, _) = setup().await;
        let mut missing = request("Notes");
        missing.file_url = None;
        assert!(matches!(
            manager.create(ana.id, missing, None).await,
            Err(ResourceError::MissingFields(_))
        ));

        let mut bad_year = request("Notes");
        bad_year.year = Some(0);
        assert!(matches!(
            manager.create(ana.id, bad_year, None).await,
            Err(ResourceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_bare_pointer_into_uploads_is_rejected() {
        let (manager, ana, _) = setup().await;
        let mut borrowed = request("Notes");
        borrowed.file_url = Some("/uploads/1700000000000_pic.png".to_string());

        assert!(matches!(
            manager.create(ana.id, borrowed, None).await,
            Err(ResourceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unlinks_only_intake_files() {
        let (manager, ana, _) = setup().await;

        let mut pending = manager.uploads.begin("notes.pdf", None).await.unwrap();
        pending.write_chunk(b"pdf").await.unwrap();
        let stored = pending.finish().await.unwrap();
        let path = manager.uploads.path_for(&stored.public_url).unwrap();

        let mut with_file = request("Stored");
        with_file.file_url = None;
        let view = manager
            .create(ana.id, with_file, Some(stored))
            .await
            .unwrap();
        let pointer = manager.create(ana.id, request("Linked"), None).await.unwrap();

        manager.delete(ana.id, pointer.id).await.unwrap();
        assert!(path.exists());

        manager.delete(ana.id, view.id).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_download_counts_every_hit() {
        let (manager, ana, _) = setup().await;
        let view = manager.create(ana.id, request("Notes"), None).await.unwrap();

        for expected in 1..=5 {
            let ticket = manager.download(view.id).await.unwrap();
            assert_eq!(ticket.downloads, expected);
        }
        assert_eq!(manager.get(view.id).await.unwrap().downloads, 5);
    }

    #[tokio::test]
    async fn test_only_owner_may_update_or_delete() {
        let (manager, ana, bob) = setup().await;
        let view = manager.create(ana.id, request("Notes"), None).await.unwrap();

        let update = ResourceUpdate {
            title: Some("Stolen".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            manager.update(bob.id, view.id, update).await,
            Err(ResourceError::Forbidden(_))
        ));
        assert!(matches!(
            manager.delete(bob.id, view.id).await,
            Err(ResourceError::Forbidden(_))
        ));
        assert_eq!(manager.get(view.id).await.unwrap().title, "Notes");
    }

    #[tokio::test]
    async fn test_update_skips_blank_fields() {
        let (manager, ana, _) = setup().await;
        let view = manager.create(ana.id, request("Notes"), None).await.unwrap();

        let update = ResourceUpdate {
            title: Some("  ".to_string()),
            subject: Some("Physics".to_string()),
            ..Default::default()
        };
        let updated = manager.update(ana.id, view.id, update).await.unwrap();
        assert_eq!(updated.title, "Notes");
        assert_eq!(updated.subject, "Physics");
    }

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let (manager, ana, _) = setup().await;
        for i in 0..12 {
            manager
                .create(ana.id, request(&format!("R{i}")), None)
                .await
                .unwrap();
        }

        let first = manager.list(None).await.unwrap();
        assert_eq!(first.resources.len(), 10);
        assert_eq!(first.resources[0].title, "R11");
        assert_eq!(first.pagination.pages, 2);

        let second = manager.list(Some(2)).await.unwrap();
        assert_eq!(second.resources.len(), 2);
        assert_eq!(second.resources[1].title, "R0");
    }

    #[tokio::test]
    async fn test_list_mine_and_search() {
        let (manager, ana, bob) = setup().await;
        manager.create(ana.id, request("Graph Notes"), None).await.unwrap();
        manager.create(bob.id, request("Circuits"), None).await.unwrap();

        let mine = manager.list_mine(bob.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Circuits");

        let found = manager
            .search(SearchQuery {
                q: Some("graph".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Graph Notes");
    }

    #[tokio::test]
    async fn test_delete_missing_resource() {
        let (manager, ana, _) = setup().await;
        assert!(matches!(
            manager.delete(ana.id, Uuid::new_v4()).await,
            Err(ResourceError::NotFound)
        ));
    }
}
