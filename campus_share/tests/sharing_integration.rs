//! Integration tests across the resource, comment and message managers.
//!
//! All managers share one in-memory store, the way the server wires them.

use campus_share::{
    AuthManager, CommentManager, MessageManager, ResourceManager,
    auth::{RegisterRequest, TokenService, UserId},
    comments::NewComment,
    db::Repositories,
    messages::{FeedQuery, MessageError, PostMessage},
    resources::{NewResourceRequest, ResourceError, SearchQuery},
    uploads::UploadStore,
};
use std::sync::Arc;

struct Campus {
    auth: AuthManager,
    resources: ResourceManager,
    comments: CommentManager,
    messages: MessageManager,
    uploads: Arc<UploadStore>,
}

impl Campus {
    fn new() -> Self {
        let repos = Repositories::in_memory();
        let dir = std::env::temp_dir().join(format!("campus_share_it_{}", uuid::Uuid::new_v4()));
        let uploads = Arc::new(UploadStore::new(dir, 1024 * 1024));

        Self {
            auth: AuthManager::new(
                repos.users.clone(),
                TokenService::new("sharing_integration_secret_32_chars"),
                String::new(),
            ),
            resources: ResourceManager::new(
                repos.resources.clone(),
                repos.users.clone(),
                uploads.clone(),
            ),
            comments: CommentManager::new(
                repos.comments.clone(),
                repos.resources.clone(),
                repos.users.clone(),
            ),
            messages: MessageManager::new(repos.messages, repos.users, uploads.clone()),
            uploads,
        }
    }

    async fn student(&self, name: &str, consent: bool) -> UserId {
        self.auth
            .register(RegisterRequest {
                email: Some(format!("{name}@campus.edu")),
                username: Some(name.to_string()),
                password: Some("secret1".to_string()),
                student_id: Some(format!("S-{name}")),
                phone: Some(format!("P-{name}")),
                consent_for_contact: Some(consent),
                ..Default::default()
            })
            .await
            .unwrap()
            .user
            .id
    }
}

impl Drop for Campus {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(self.uploads.root());
    }
}

fn notes(title: &str, subject: &str, year: i32) -> NewResourceRequest {
    NewResourceRequest {
        title: Some(title.to_string()),
        subject: Some(subject.to_string()),
        year: Some(year),
        description: Some(format!("{title} for {subject}")),
        file_url: Some("https://drive.example/file.pdf".to_string()),
        tags: Some(vec!["notes".to_string()]),
    }
}

fn post(category: &str, text: &str) -> PostMessage {
    PostMessage {
        category: Some(category.to_string()),
        text: Some(text.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_resource_listing_pages_of_ten() {
    let campus = Campus::new();
    let owner = campus.student("ravi", false).await;

    for i in 0..12 {
        campus
            .resources
            .create(owner, notes(&format!("Notes {i}"), "Maths", 2024), None)
            .await
            .unwrap();
    }

    let first = campus.resources.list(None).await.unwrap();
    assert_eq!(first.resources.len(), 10);
    assert_eq!(first.pagination.total, 12);
    assert_eq!(first.pagination.pages, 2);
    assert_eq!(first.resources[0].title, "Notes 11");

    let second = campus.resources.list(Some(2)).await.unwrap();
    assert_eq!(second.resources.len(), 2);

    let clamped = campus.resources.list(Some(0)).await.unwrap();
    assert_eq!(clamped.pagination.page, 1);
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_literal() {
    let campus = Campus::new();
    let owner = campus.student("sana", false).await;

    campus
        .resources
        .create(owner, notes("Graph Theory", "Discrete Maths", 2023), None)
        .await
        .unwrap();
    campus
        .resources
        .create(owner, notes("100% Pass Guide", "Physics", 2024), None)
        .await
        .unwrap();

    let hits = campus
        .resources
        .search(SearchQuery {
            q: Some("GRAPH".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    let hits = campus
        .resources
        .search(SearchQuery {
            q: Some("100%".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].subject, "Physics");

    let hits = campus
        .resources
        .search(SearchQuery {
            subject: Some("Physics".to_string()),
            year: Some(2023),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_deleting_resource_removes_its_comments() {
    let campus = Campus::new();
    let owner = campus.student("tara", false).await;
    let reader = campus.student("umar", false).await;

    let resource = campus
        .resources
        .create(owner, notes("Signals", "ECE", 2022), None)
        .await
        .unwrap();

    campus
        .comments
        .add(
            reader,
            resource.id,
            NewComment {
                comment: Some("  Thanks!  ".to_string()),
            },
        )
        .await
        .unwrap();
    let comments = campus.comments.list(resource.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment, "Thanks!");

    let err = campus.resources.delete(reader, resource.id).await.unwrap_err();
    assert!(matches!(err, ResourceError::Forbidden(_)));

    campus.resources.delete(owner, resource.id).await.unwrap();

    let err = campus.comments.list(resource.id).await.unwrap_err();
    assert!(matches!(err, ResourceError::NotFound));
    let err = campus
        .comments
        .add(
            reader,
            resource.id,
            NewComment {
                comment: Some("late".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::NotFound));
}

#[tokio::test]
async fn test_downloads_count_up() {
    let campus = Campus::new();
    let owner = campus.student("vik", false).await;
    let resource = campus
        .resources
        .create(owner, notes("Thermo", "Mech", 2021), None)
        .await
        .unwrap();

    for expected in 1..=3 {
        let ticket = campus.resources.download(resource.id).await.unwrap();
        assert_eq!(ticket.downloads, expected);
    }
    assert_eq!(campus.resources.get(resource.id).await.unwrap().downloads, 3);
}

#[tokio::test]
async fn test_feeds_are_isolated_by_category() {
    let campus = Campus::new();
    let sender = campus.student("wen", false).await;

    campus.messages.post(sender, post("laundry", "Blue hoodie?"), None).await.unwrap();
    campus.messages.post(sender, post("faculty", "Cabin 402?"), None).await.unwrap();

    let laundry = campus
        .messages
        .list_by_category("laundry", FeedQuery::default())
        .await
        .unwrap();
    assert_eq!(laundry.messages.len(), 1);
    assert_eq!(laundry.messages[0].text, "Blue hoodie?");

    let err = campus
        .messages
        .list_by_category("canteen", FeedQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::UnknownCategory(_)));
}

#[tokio::test]
async fn test_contact_details_follow_post_consent() {
    let campus = Campus::new();
    let sender = campus.student("xia", true).await;

    let private = campus
        .messages
        .post(sender, post("alumni", "Any referrals?"), None)
        .await
        .unwrap();
    let sender_view = private.sender.unwrap();
    assert!(sender_view.phone.is_none());
    assert!(sender_view.email.is_none());

    let open = campus
        .messages
        .post(
            sender,
            PostMessage {
                consent_for_contact: true,
                ..post("alumni", "Call me")
            },
            None,
        )
        .await
        .unwrap();
    let sender_view = open.sender.unwrap();
    assert_eq!(sender_view.phone.as_deref(), Some("P-xia"));
    assert_eq!(sender_view.email.as_deref(), Some("xia@campus.edu"));
}

#[tokio::test]
async fn test_deleted_reply_target_leaves_reply_standing() {
    let campus = Campus::new();
    let asker = campus.student("yuki", false).await;
    let helper = campus.student("zane", false).await;

    let question = campus
        .messages
        .post(asker, post("ffcs", "Best slot for DSA?"), None)
        .await
        .unwrap();
    let answer = campus
        .messages
        .post(
            helper,
            PostMessage {
                reply_to: Some(question.id.to_string()),
                ..post("ffcs", "Morning theory")
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(answer.reply_to.as_ref().unwrap().id, question.id);

    campus.messages.delete(asker, question.id).await.unwrap();

    let feed = campus
        .messages
        .list_by_category("ffcs", FeedQuery::default())
        .await
        .unwrap();
    assert_eq!(feed.messages.len(), 1);
    assert_eq!(feed.messages[0].id, answer.id);
    assert!(feed.messages[0].reply_to.is_none());
}
