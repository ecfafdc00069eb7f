//! JSON:API document envelope used by every App Store Connect endpoint.
//!
//! ```json
//! {
//!     "data": [{ "type": "apps", "id": "123", "attributes": { ... } }],
//!     "links": { "self": "...", "next": "..." },
//!     "meta": { "paging": { "total": 42, "limit": 50 } }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A top-level response document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
    /// Primary data: a resource or a list of resources
    pub data: T,
    /// Related resources requested with `include`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<serde_json::Value>>,
    /// Document links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<DocumentLinks>,
    /// Paging information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PagingMeta>,
}

impl<T> Document<T> {
    /// The continuation link, if there is another page.
    pub fn next_link(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.next.as_deref())
            .filter(|next| !next.is_empty())
    }

    /// Total number of resources across all pages, when the server reports it.
    pub fn total(&self) -> Option<u64> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.paging.as_ref())
            .and_then(|paging| paging.total)
    }
}

/// Links attached to a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentLinks {
    /// Link to this page
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Link to the first page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    /// Link to the next page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagingMeta {
    /// Paging details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

/// Paging details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paging {
    /// Total number of resources
    #[serde(default)]
    pub total: Option<u64>,
    /// Page size
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A single resource object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<A> {
    /// Resource type, e.g. `apps`
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource id
    pub id: String,
    /// Resource attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<A>,
    /// Relationships, kept untyped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<serde_json::Value>,
}

/// Request body for create and update calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDocument<A> {
    /// The resource being written
    pub data: RequestData<A>,
}

/// The resource part of a [`RequestDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestData<A> {
    /// Resource type, e.g. `apps`
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource id; absent when creating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Attributes to write
    pub attributes: A,
}

impl<A> RequestDocument<A> {
    /// An update of resource `id` of type `kind`.
    pub fn update(kind: impl Into<String>, id: impl Into<String>, attributes: A) -> Self {
        Self {
            data: RequestData {
                kind: kind.into(),
                id: Some(id.into()),
                attributes,
            },
        }
    }

    /// A creation of a resource of type `kind`.
    pub fn create(kind: impl Into<String>, attributes: A) -> Self {
        Self {
            data: RequestData {
                kind: kind.into(),
                id: None,
                attributes,
            },
        }
    }
}

/// Error document returned with non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error objects, most relevant first
    #[serde(default)]
    pub errors: Vec<ErrorObject>,
}

/// A single error object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Unique id of this occurrence
    #[serde(default)]
    pub id: Option<String>,
    /// HTTP status as a string
    #[serde(default)]
    pub status: Option<String>,
    /// Machine-readable code, e.g. `NOT_FOUND`
    #[serde(default)]
    pub code: Option<String>,
    /// Short summary
    #[serde(default)]
    pub title: Option<String>,
    /// Human-readable explanation
    #[serde(default)]
    pub detail: Option<String>,
}
