/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh)
/// - `projects`: Project CRUD
/// - `tasks`: Task CRUD, the "my tasks" view, and form options
/// - `users`: User CRUD
///
/// Shared response envelopes live here: listings echo their validated query
/// parameters next to the pagination metadata, and mutations carry a
/// one-time success notice naming the record.

use serde::Serialize;

use taskhub_shared::listing::{ListParams, Page, PageLinks, PageMeta};

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

/// A paginated collection plus the echoed query parameters
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
    pub links: PageLinks,

    /// Parameters the listing was produced with, for pagination links
    pub query: ListParams,
}

impl<T> Listing<T> {
    pub fn new(page: Page<T>, query: ListParams) -> Self {
        Self {
            data: page.data,
            meta: page.meta,
            links: page.links,
            query,
        }
    }
}

/// A mutated resource plus its success notice
#[derive(Debug, Serialize)]
pub struct MutationResponse<T> {
    /// One-time success notice, e.g. `Project "Launch" was updated`
    pub message: String,

    pub data: T,
}

/// Success notice for deletions, where the resource is gone
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public URL for a stored image path
pub fn storage_url(image_path: &str) -> String {
    format!("/storage/{}", image_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_url() {
        assert_eq!(
            storage_url("project/aB3xK9mQ2rT5wY7z/logo.png"),
            "/storage/project/aB3xK9mQ2rT5wY7z/logo.png"
        );
    }

    #[test]
    fn test_listing_serializes_envelope_and_query() {
        let page = Page::new(vec![1, 2, 3], 1, 3);
        let mut params = ListParams::default();
        params.name = Some("launch".to_string());

        let json = serde_json::to_value(Listing::new(page, params)).unwrap();

        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["meta"]["total"], 3);
        assert_eq!(json["query"]["name"], "launch");
        // Absent parameters are omitted from the echo
        assert!(json["query"].get("status").is_none());
    }
}
