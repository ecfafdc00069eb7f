//! Apps endpoints.

mod types;

pub use types::*;

use crate::error::AscError;
use crate::rest::endpoints::{self, APPS};
use crate::rest::{AscRestClient, checked_id};
use crate::types::RequestDocument;

impl AscRestClient {
    /// List apps visible to the API key.
    ///
    /// Use [`AscRestClient::next_page`] to walk further pages.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use asc_api_client::rest::AscRestClient;
    /// use asc_api_client::rest::apps::ListAppsRequest;
    ///
    /// # async fn run(client: AscRestClient) -> Result<(), asc_api_client::AscError> {
    /// let request = ListAppsRequest::for_bundle_ids(["com.example.app"]);
    /// let mut page = client.list_apps(Some(&request)).await?;
    /// loop {
    ///     for app in &page.data {
    ///         println!("{}", app.id);
    ///     }
    ///     match client.next_page(&page).await? {
    ///         Some(next) => page = next,
    ///         None => break,
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_apps(
        &self,
        request: Option<&ListAppsRequest>,
    ) -> Result<AppsResponse, AscError> {
        match request {
            Some(req) => self.get_with_params(APPS, req).await,
            None => self.get(APPS).await,
        }
    }

    /// Get a single app.
    pub async fn get_app(&self, id: &str) -> Result<AppResponse, AscError> {
        self.get(&endpoints::app(checked_id(id)?)).await
    }

    /// Update an app. Sent once, never retried.
    pub async fn update_app(
        &self,
        id: &str,
        attributes: AppUpdateAttributes,
    ) -> Result<AppResponse, AscError> {
        let id = checked_id(id)?;
        let body = RequestDocument::update(APP_RESOURCE_TYPE, id, attributes);
        self.patch(&endpoints::app(id), &body).await
    }
}
