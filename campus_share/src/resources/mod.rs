//! Academic resources: metadata records pointing at shared files.
//!
//! Anyone may browse, search and download; publishing requires an account and
//! only the uploader may edit or delete a resource. Downloads are counted but
//! the file itself is served elsewhere.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ResourceError, ResourceResult};
pub use manager::ResourceManager;
pub use models::{
    DownloadTicket, NewResourceRequest, Resource, ResourceFilter, ResourceId, ResourcePage,
    ResourceUpdate, ResourceView, SearchQuery,
};
