//! App Store Connect REST API client implementation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use url::Url;

use crate::auth::{EnvIdentity, IdentityProvider, issue_token};
use crate::config::{self, FileConfig};
use crate::context::CallContext;
use crate::error::AscError;
use crate::rest::classify::classify;
use crate::rest::endpoints::ASC_BASE_URL;
use crate::retry::{RetryOverrides, RetryPolicy, retry_transient};
use crate::types::Document;
use crate::url_guard::{TrustPolicy, ensure_same_origin};

/// Media type for JSON:API request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A request whose body is fully materialized, so it can be replayed
/// unchanged on every attempt.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub target: String,
    /// Request body; empty for no body
    pub body: Bytes,
    /// `Accept` header override
    pub accept: Option<String>,
    /// Whether to attach the bearer token
    pub authenticated: bool,
}

impl RequestDescriptor {
    /// An authenticated request without a body.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            body: Bytes::new(),
            accept: None,
            authenticated: true,
        }
    }

    /// A GET request.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    /// A DELETE request.
    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// A POST request with a JSON body.
    pub fn post_json<B>(target: impl Into<String>, body: &B) -> Result<Self, AscError>
    where
        B: Serialize + ?Sized,
    {
        Ok(Self::new(Method::POST, target).with_body(serde_json::to_vec(body)?))
    }

    /// A PATCH request with a JSON body.
    pub fn patch_json<B>(target: impl Into<String>, body: &B) -> Result<Self, AscError>
    where
        B: Serialize + ?Sized,
    {
        Ok(Self::new(Method::PATCH, target).with_body(serde_json::to_vec(body)?))
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Override the `Accept` header, e.g. for gzip or CSV downloads.
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Send without the bearer token.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// GET and HEAD are safe to repeat and are the only methods retried.
    pub fn is_idempotent(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD)
    }
}

/// The App Store Connect REST API client.
///
/// Every authenticated request carries a freshly minted ES256 token. GET and
/// HEAD requests are retried on 429 and 503 with exponential backoff; other
/// methods are sent exactly once.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use asc_api_client::auth::StaticIdentity;
/// use asc_api_client::rest::AscRestClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pem = std::fs::read_to_string("AuthKey_2X9R4HXF34.p8")?;
///     let identity = Arc::new(StaticIdentity::new("issuer-id", "2X9R4HXF34", pem));
///     let client = AscRestClient::builder().identity(identity).build()?;
///
///     let apps = client.list_apps(None).await?;
///     for app in &apps.data {
///         println!("{}", app.id);
///     }
///
///     Ok(())
/// }
/// ```
///
/// With identity and settings taken from the environment and `~/.asc/config.json`:
///
/// ```rust,no_run
/// use asc_api_client::rest::AscRestClient;
///
/// # async fn run() -> Result<(), asc_api_client::AscError> {
/// let client = AscRestClient::from_env()?;
/// let app = client.get_app("1234567890").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AscRestClient {
    http_client: ClientWithMiddleware,
    base_url: Url,
    identity: Option<Arc<dyn IdentityProvider>>,
    trust: Arc<TrustPolicy>,
    retry_overrides: RetryOverrides,
    file_config: Option<Arc<FileConfig>>,
    call_timeout: Option<Duration>,
}

impl AscRestClient {
    /// Create a new client builder.
    pub fn builder() -> AscRestClientBuilder {
        AscRestClientBuilder::new()
    }

    /// Create a client configured from the default config file and the
    /// `ASC_*` environment variables.
    pub fn from_env() -> Result<Self, AscError> {
        let file = FileConfig::load_default()?;
        let identity = EnvIdentity::resolve(file.as_ref())?;
        let mut builder = Self::builder().identity(Arc::new(identity));
        if let Some(file) = file {
            builder = builder.config_file(file);
        }
        builder.build()
    }

    /// The base URL relative targets resolve against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The URL trust policy.
    pub fn trust_policy(&self) -> &TrustPolicy {
        &self.trust
    }

    /// A fresh call context carrying the client's default call timeout.
    pub fn context(&self) -> CallContext {
        match self.call_timeout {
            Some(timeout) => CallContext::new().with_timeout(timeout),
            None => CallContext::new(),
        }
    }

    /// The retry policy a call started now would use.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::resolve(&self.retry_overrides, self.file_config.as_deref())
    }

    /// Execute a request and return the raw response body.
    ///
    /// Absolute targets must pass [`TrustPolicy::validate_next_url`].
    pub async fn execute(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
    ) -> Result<Bytes, AscError> {
        let url = self.resolve_target(&request.target)?;
        self.send(ctx, request, &url).await
    }

    /// Make a GET request and decode the JSON response.
    pub async fn get<T>(&self, path: &str) -> Result<T, AscError>
    where
        T: DeserializeOwned,
    {
        let body = self
            .execute(&self.context(), &RequestDescriptor::get(path))
            .await?;
        decode(&body)
    }

    /// Make a GET request with query parameters.
    pub async fn get_with_params<T, Q>(&self, path: &str, params: &Q) -> Result<T, AscError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let query_string = serde_urlencoded::to_string(params)
            .map_err(|e| AscError::InvalidRequest(e.to_string()))?;
        if query_string.is_empty() {
            self.get(path).await
        } else {
            self.get(&format!("{path}?{query_string}")).await
        }
    }

    /// Make a POST request with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, AscError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = RequestDescriptor::post_json(path, body)?;
        let body = self.execute(&self.context(), &request).await?;
        decode(&body)
    }

    /// Make a PATCH request with a JSON body.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, AscError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = RequestDescriptor::patch_json(path, body)?;
        let body = self.execute(&self.context(), &request).await?;
        decode(&body)
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<(), AscError> {
        self.execute(&self.context(), &RequestDescriptor::delete(path))
            .await?;
        Ok(())
    }

    /// Fetch the page after `page`, or `None` on the last page.
    ///
    /// The continuation link is checked against the trust policy before the
    /// bearer token is sent to it.
    pub async fn next_page<T>(&self, page: &Document<T>) -> Result<Option<Document<T>>, AscError>
    where
        T: DeserializeOwned,
    {
        let Some(next) = page.next_link() else {
            return Ok(None);
        };
        self.trust.validate_next_url(next)?;
        self.get(next).await.map(Some)
    }

    /// Download from a URL that has already been vetted, without the bearer token.
    pub(crate) async fn download(
        &self,
        ctx: &CallContext,
        url: &Url,
        accept: &str,
    ) -> Result<Bytes, AscError> {
        let request = RequestDescriptor::get(url.as_str())
            .with_accept(accept)
            .unauthenticated();
        self.send(ctx, &request, url).await
    }

    fn resolve_target(&self, target: &str) -> Result<Url, AscError> {
        self.trust.validate_next_url(target)?;
        let url = self.base_url.join(target)?;
        ensure_same_origin(&self.base_url, &url)?;
        Ok(url)
    }

    async fn send(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
        url: &Url,
    ) -> Result<Bytes, AscError> {
        if !request.is_idempotent() {
            return self.attempt(ctx, request, url).await;
        }

        let policy = self.retry_policy();
        let log_retries = config::retry_log_enabled(self.file_config.as_deref());
        let label = format!("{} {}", request.method, url.path());
        retry_transient(ctx, &policy, log_retries, &label, move || {
            self.attempt(ctx, request, url)
        })
        .await
    }

    /// Perform exactly one HTTP attempt.
    async fn attempt(
        &self,
        ctx: &CallContext,
        request: &RequestDescriptor,
        url: &Url,
    ) -> Result<Bytes, AscError> {
        let accept = request.accept.as_deref().unwrap_or(JSON_MEDIA_TYPE);
        let mut builder = self
            .http_client
            .request(request.method.clone(), url.clone())
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .header(ACCEPT, accept);

        if request.authenticated {
            let provider = self
                .identity
                .as_ref()
                .ok_or(AscError::MissingCredentials)?;
            let token = issue_token(provider.identity(), OffsetDateTime::now_utc())?;
            let mut authorization = HeaderValue::from_str(&token.bearer())
                .map_err(|e| AscError::Signing(format!("token is not a valid header: {e}")))?;
            authorization.set_sensitive(true);
            builder = builder.header(AUTHORIZATION, authorization);
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        tracing::debug!(method = %request.method, path = url.path(), "Sending request");
        let response = ctx.run(builder.send()).await??;

        let status = response.status();
        let headers = response.headers().clone();
        let body = ctx.run(response.bytes()).await??;

        if status.is_success() {
            return Ok(body);
        }

        tracing::debug!(method = %request.method, path = url.path(), %status, "Request failed");
        Err(classify(status, &headers, &body))
    }
}

fn decode<T>(body: &[u8]) -> Result<T, AscError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_slice(body)?)
}

/// Reject ids that would change the shape of the request path.
pub(crate) fn checked_id(id: &str) -> Result<&str, AscError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && id != "."
        && id != "..";
    if valid {
        Ok(id)
    } else {
        Err(AscError::InvalidRequest(format!(
            "invalid resource id {:?}",
            crate::error::sanitize_for_display(id, 64)
        )))
    }
}

impl std::fmt::Debug for AscRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AscRestClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_identity", &self.identity.is_some())
            .field("retry_overrides", &self.retry_overrides)
            .finish()
    }
}

/// Builder for [`AscRestClient`].
pub struct AscRestClientBuilder {
    base_url: String,
    identity: Option<Arc<dyn IdentityProvider>>,
    user_agent: Option<String>,
    retry_overrides: RetryOverrides,
    file_config: Option<FileConfig>,
    trust_policy: Option<TrustPolicy>,
    request_timeout: Option<Duration>,
    call_timeout: Option<Duration>,
}

impl AscRestClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: ASC_BASE_URL.to_string(),
            identity: None,
            user_agent: None,
            retry_overrides: RetryOverrides::default(),
            file_config: None,
            trust_policy: None,
            request_timeout: None,
            call_timeout: None,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    ///
    /// Pagination links are trusted only when they point at this URL's host.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the identity provider for authenticated requests.
    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Use settings from a loaded config file for anything not overridden
    /// here or in the environment.
    pub fn config_file(mut self, config: FileConfig) -> Self {
        self.file_config = Some(config);
        self
    }

    /// Set the maximum number of attempts for idempotent requests.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry_overrides.max_attempts = Some(attempts);
        self
    }

    /// Set the delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.retry_overrides.base_delay = Some(delay);
        self
    }

    /// Set the upper bound of the computed backoff.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.retry_overrides.max_delay = Some(delay);
        self
    }

    /// Set the jitter fraction applied to each backoff delay.
    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.retry_overrides.jitter_fraction = Some(fraction);
        self
    }

    /// Pin every retry setting, ignoring the environment and config file.
    pub fn retry_policy(mut self, policy: &RetryPolicy) -> Self {
        self.retry_overrides = RetryOverrides::from_policy(policy);
        self
    }

    /// Replace the URL trust policy.
    pub fn trust_policy(mut self, policy: TrustPolicy) -> Self {
        self.trust_policy = Some(policy);
        self
    }

    /// Transport-level timeout for a single attempt.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default deadline for a whole call, retries included.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<AscRestClient, AscError> {
        let base_url = Url::parse(&self.base_url)?;
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(AscError::Config(format!(
                "base URL {} has no host",
                self.base_url
            )));
        }

        // Build default headers.
        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("asc-api-client/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("asc-api-client"));
        headers.insert(USER_AGENT, header_value);

        let mut reqwest_builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.request_timeout {
            reqwest_builder = reqwest_builder.timeout(timeout);
        }
        let reqwest_client = reqwest_builder
            .build()
            .map_err(|e| AscError::Config(format!("failed to build HTTP client: {e}")))?;

        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        let trust = self
            .trust_policy
            .unwrap_or_else(|| TrustPolicy::for_base_url(&base_url));

        Ok(AscRestClient {
            http_client: client,
            base_url,
            identity: self.identity,
            trust: Arc::new(trust),
            retry_overrides: self.retry_overrides,
            file_config: self.file_config.map(Arc::new),
            call_timeout: self.call_timeout,
        })
    }
}

impl Default for AscRestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
