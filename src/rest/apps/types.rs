//! Types for the apps endpoints.

use serde::{Deserialize, Serialize};

use crate::types::serde_helpers::comma_separated;
use crate::types::{Document, Resource};

/// JSON:API resource type of an app.
pub const APP_RESOURCE_TYPE: &str = "apps";

/// Attributes of an app.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAttributes {
    /// Name shown on the App Store
    #[serde(default)]
    pub name: Option<String>,
    /// Bundle identifier
    #[serde(default)]
    pub bundle_id: Option<String>,
    /// Seller-assigned SKU
    #[serde(default)]
    pub sku: Option<String>,
    /// Primary locale, e.g. `en-US`
    #[serde(default)]
    pub primary_locale: Option<String>,
    /// Content rights declaration
    #[serde(default)]
    pub content_rights_declaration: Option<ContentRightsDeclaration>,
}

/// Whether an app uses third-party content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRightsDeclaration {
    /// The app contains no third-party content
    DoesNotUseThirdPartyContent,
    /// The app contains third-party content the developer has rights to
    UsesThirdPartyContent,
}

/// An app resource.
pub type App = Resource<AppAttributes>;

/// Response of `GET /v1/apps`.
pub type AppsResponse = Document<Vec<App>>;

/// Response of `GET /v1/apps/{id}` and `PATCH /v1/apps/{id}`.
pub type AppResponse = Document<App>;

/// Query parameters for listing apps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListAppsRequest {
    /// Only apps with these bundle ids
    #[serde(
        rename = "filter[bundleId]",
        with = "comma_separated",
        skip_serializing_if = "Option::is_none"
    )]
    pub bundle_ids: Option<Vec<String>>,
    /// Only apps with these SKUs
    #[serde(
        rename = "filter[sku]",
        with = "comma_separated",
        skip_serializing_if = "Option::is_none"
    )]
    pub skus: Option<Vec<String>>,
    /// Attributes to return
    #[serde(
        rename = "fields[apps]",
        with = "comma_separated",
        skip_serializing_if = "Option::is_none"
    )]
    pub fields: Option<Vec<String>>,
    /// Page size (the API allows up to 200)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ListAppsRequest {
    /// List apps with the given bundle ids.
    pub fn for_bundle_ids<I, S>(bundle_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bundle_ids: Some(bundle_ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Set the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Writable attributes of an app.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUpdateAttributes {
    /// New primary locale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_locale: Option<String>,
    /// New content rights declaration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_rights_declaration: Option<ContentRightsDeclaration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_apps_query() {
        let request = ListAppsRequest::for_bundle_ids(["com.example.one", "com.example.two"]).limit(10);
        assert_eq!(
            serde_urlencoded::to_string(&request).unwrap(),
            "filter%5BbundleId%5D=com.example.one%2Ccom.example.two&limit=10"
        );
        assert_eq!(
            serde_urlencoded::to_string(ListAppsRequest::default()).unwrap(),
            ""
        );
    }

    #[test]
    fn test_app_response() {
        let json = r#"{
            "data": {
                "type": "apps",
                "id": "1234567890",
                "attributes": {
                    "name": "Example",
                    "bundleId": "com.example.app",
                    "sku": "EX1",
                    "primaryLocale": "en-US",
                    "contentRightsDeclaration": "DOES_NOT_USE_THIRD_PARTY_CONTENT",
                    "isOrEverWasMadeForKids": false
                },
                "relationships": {"builds": {"links": {"related": "/v1/apps/1234567890/builds"}}}
            },
            "links": {"self": "https://api.appstoreconnect.apple.com/v1/apps/1234567890"}
        }"#;

        let response: AppResponse = serde_json::from_str(json).unwrap();
        let attributes = response.data.attributes.unwrap();
        assert_eq!(attributes.bundle_id.as_deref(), Some("com.example.app"));
        assert_eq!(
            attributes.content_rights_declaration,
            Some(ContentRightsDeclaration::DoesNotUseThirdPartyContent)
        );
        assert!(response.data.relationships.is_some());
    }

    #[test]
    fn test_update_attributes_skip_unset() {
        let attributes = AppUpdateAttributes {
            primary_locale: Some("de-DE".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&attributes).unwrap(),
            serde_json::json!({"primaryLocale": "de-DE"})
        );
    }
}
