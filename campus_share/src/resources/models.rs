//! Resource data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{UserId, UserSummary},
    de,
    pagination::Pagination,
};

/// Resource ID type
pub type ResourceId = Uuid;

/// Uploaded academic resource. `file_url` is a pointer, not the file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub year: i32,
    pub file_url: String,
    /// `file_url` names a file intake stored for this resource.
    pub stored_file: bool,
    pub uploaded_by: UserId,
    pub downloads: i64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Create request for `/resources/upload`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewResourceRequest {
    pub title: Option<String>,
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "de::opt_int")]
    pub year: Option<i32>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    #[serde(default, deserialize_with = "de::opt_tags")]
    pub tags: Option<Vec<String>>,
}

/// Owner update; only provided, non-empty fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "de::opt_int")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "de::opt_tags")]
    pub tags: Option<Vec<String>>,
}

/// Search parameters for `/resources/search/query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "de::opt_int")]
    pub year: Option<i32>,
}

/// Repository-level filter.
///
/// `query` is a case-insensitive literal substring OR-matched across title,
/// description and subject; the remaining fields are exact AND filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    pub query: Option<String>,
    pub subject: Option<String>,
    pub year: Option<i32>,
    pub uploaded_by: Option<UserId>,
}

impl ResourceFilter {
    pub fn matches(&self, resource: &Resource) -> bool {
        if let Some(query) = &self.query {
            let needle = query.to_lowercase();
            let hit = resource.title.to_lowercase().contains(&needle)
                || resource.description.to_lowercase().contains(&needle)
                || resource.subject.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        self.subject.as_ref().is_none_or(|s| &resource.subject == s)
            && self.year.is_none_or(|y| resource.year == y)
            && self.uploaded_by.is_none_or(|u| resource.uploaded_by == u)
    }
}

/// Resource with its uploader denormalized.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceView {
    pub id: ResourceId,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub year: i32,
    pub file_url: String,
    pub uploaded_by: Option<UserSummary>,
    pub downloads: i64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ResourceView {
    pub fn new(resource: Resource, uploader: Option<UserSummary>) -> Self {
        Self {
            id: resource.id,
            title: resource.title,
            description: resource.description,
            subject: resource.subject,
            year: resource.year,
            file_url: resource.file_url,
            uploaded_by: uploader,
            downloads: resource.downloads,
            tags: resource.tags,
            created_at: resource.created_at,
        }
    }
}

/// One page of the resource listing.
#[derive(Debug, Clone, Serialize)]
pub struct ResourcePage {
    pub resources: Vec<ResourceView>,
    pub pagination: Pagination,
}

/// Result of a download hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTicket {
    pub file_url: String,
    pub downloads: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(title: &str, description: &str, subject: &str, year: i32) -> Resource {
        Resource {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            subject: subject.to_string(),
            year,
            file_url: "/f/1.pdf".to_string(),
            stored_file: false,
            uploaded_by: Uuid::new_v4(),
            downloads: 0,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_query_is_case_insensitive_across_fields() {
        let filter = ResourceFilter {
            query: Some("GRAPH".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&resource("Graph theory", "", "Maths", 1)));
        assert!(filter.matches(&resource("Notes", "covers graphs", "Maths", 1)));
        assert!(filter.matches(&resource("Notes", "", "Graphics", 1)));
        assert!(!filter.matches(&resource("Notes", "", "AI", 1)));
    }

    #[test]
    fn test_query_is_literal_not_a_pattern() {
        let filter = ResourceFilter {
            query: Some("c++".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&resource("C++ primer", "", "PL", 1)));
        assert!(!filter.matches(&resource("ccc", "", "PL", 1)));
    }

    #[test]
    fn test_subject_and_year_are_exact_and_filters() {
        let filter = ResourceFilter {
            query: Some("notes".to_string()),
            subject: Some("AI".to_string()),
            year: Some(2),
            uploaded_by: None,
        };
        assert!(filter.matches(&resource("Notes", "", "AI", 2)));
        assert!(!filter.matches(&resource("Notes", "", "ai", 2)));
        assert!(!filter.matches(&resource("Notes", "", "AI", 3)));
    }
}
