use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::auth::AuthToken;
use crate::error::ApiError;

pub const CSRF_HEADER: &str = "x-csrf-token";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Base URLs of the services the monitor talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub economy: String,
    pub users: String,
    pub auth: String,
    pub thumbnails: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            economy: "https://economy.roblox.com".to_string(),
            users: "https://users.roblox.com".to_string(),
            auth: "https://auth.roblox.com".to_string(),
            thumbnails: "https://thumbnails.roblox.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Every service behind one base URL (a mock server, a proxy).
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            economy: base.clone(),
            users: base.clone(),
            auth: base.clone(),
            thumbnails: base,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per logical call, including the first.
    pub attempts: u32,
    /// Wait after an unexpected status before trying again.
    pub backoff: Duration,
    /// Per-request limit. A timed out attempt counts as a failed one.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(5),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Result of a logical fetch that did not hit a fatal error.
#[derive(Debug)]
pub enum Fetched {
    /// The expected status came back; decoded JSON body.
    Body(Value),
    /// 400 or 404. Never retried.
    NotFound,
    /// Retries ran out. Callers skip this cycle and try again later.
    Exhausted { last_status: Option<StatusCode> },
}

/// Authenticated client for the catalog API.
///
/// Owns the CSRF token. Everything else only reads it through [`ApiClient::fetch`].
pub struct ApiClient {
    http: Client,
    cookie: String,
    endpoints: Endpoints,
    retry: RetryPolicy,
    token: RwLock<AuthToken>,
}

impl ApiClient {
    pub fn new(roblosecurity: &str) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("romonitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            cookie: format!(".ROBLOSECURITY={}", roblosecurity.trim()),
            endpoints: Endpoints::default(),
            retry: RetryPolicy::default(),
            token: RwLock::new(AuthToken::empty()),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Check the cookie against the authenticated-user endpoint.
    pub async fn validate_credential(&self) -> Result<(), ApiError> {
        let url = format!("{}/v1/users/authenticated", self.endpoints.users);
        debug!("Validating roblosecurity cookie");

        let response = self
            .http
            .get(&url)
            .header(header::COOKIE, &self.cookie)
            .timeout(self.retry.timeout)
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(ApiError::InvalidCredential(status)),
        }
    }

    /// Ask the auth service for a new CSRF token and store it.
    ///
    /// The logout endpoint rejects the request but hands back the token header.
    pub async fn acquire_token(&self) -> Result<(), ApiError> {
        let url = format!("{}/v2/logout", self.endpoints.auth);
        debug!("Gathering x-csrf-token");

        let response = self
            .http
            .post(&url)
            .header(header::COOKIE, &self.cookie)
            .timeout(self.retry.timeout)
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        let value = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .ok_or(ApiError::TokenUnavailable(status))?;

        *self.token.write().await = AuthToken::new(value, Instant::now());
        Ok(())
    }

    /// Best-effort refresh. On failure the previous token stays in place.
    pub async fn refresh_token(&self) {
        if let Err(e) = self.acquire_token().await {
            warn!(
                "Token renewal failed, keeping previous token. Account session protection enabled? ({})",
                e
            );
        }
    }

    async fn current_token(&self) -> String {
        if self.token.read().await.is_stale() {
            self.refresh_token().await;
        }
        self.token.read().await.value().to_owned()
    }

    /// One logical request with retries.
    ///
    /// * expected status: decoded body, immediately
    /// * 400/404: [`Fetched::NotFound`], no retry
    /// * 403: token refresh, retry
    /// * anything else: wait the backoff, retry
    ///
    /// Only a host that cannot be reached at all is an `Err`.
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        expected: StatusCode,
    ) -> Result<Fetched, ApiError> {
        let mut last_status = None;

        for attempt in 1..=self.retry.attempts {
            let token = self.current_token().await;

            let response = match self
                .http
                .request(method.clone(), url)
                .header(header::COOKIE, &self.cookie)
                .header(CSRF_HEADER, token)
                .timeout(self.retry.timeout)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if e.is_connect() => return Err(classify(url, e)),
                Err(e) => {
                    debug!("Request to {} failed on attempt {}: {}", url, attempt, e);
                    tokio::time::sleep(self.retry.backoff).await;
                    continue;
                }
            };

            let status = response.status();
            if status == expected {
                let bytes = response.bytes().await?;
                return Ok(Fetched::Body(serde_json::from_slice(&bytes)?));
            }

            last_status = Some(status);
            match status {
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => return Ok(Fetched::NotFound),
                StatusCode::FORBIDDEN => {
                    debug!("Got 403 from {}, renewing token", url);
                    self.refresh_token().await;
                }
                _ => {
                    debug!(
                        "Got {} from {}. Attempts left: {}",
                        status,
                        url,
                        self.retry.attempts - attempt
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }

        Ok(Fetched::Exhausted { last_status })
    }

    pub async fn get(&self, url: &str) -> Result<Fetched, ApiError> {
        self.fetch(Method::GET, url, StatusCode::OK).await
    }
}

fn classify(url: &str, err: reqwest::Error) -> ApiError {
    if err.is_connect() {
        ApiError::Unreachable {
            url: url.to_string(),
            source: err,
        }
    } else {
        ApiError::Http(err)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn test_client(server: &MockServer) -> ApiClient {
        ApiClient::new("secret")
            .unwrap()
            .with_endpoints(Endpoints::single(&server.uri()))
            .with_retry(RetryPolicy {
                attempts: 5,
                backoff: Duration::from_millis(1),
                timeout: Duration::from_secs(2),
            })
    }

    pub(crate) async fn mount_token(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path("/v2/logout"))
            .respond_with(ResponseTemplate::new(403).insert_header(CSRF_HEADER, token))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"a": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/thing", server.uri());
        match client.get(&url).await.unwrap() {
            Fetched::Body(body) => assert_eq!(body["a"], 1),
            other => panic!("Expected body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_attaches_cookie_and_token() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .and(header_is("cookie", ".ROBLOSECURITY=secret"))
            .and(header_is(CSRF_HEADER, "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/thing", server.uri());
        assert!(matches!(client.get(&url).await.unwrap(), Fetched::Body(_)));
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_three_failures() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(3)
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/thing", server.uri());
        match client.get(&url).await.unwrap() {
            Fetched::Body(body) => assert_eq!(body["ok"], true),
            other => panic!("Expected body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_degrades_after_five_failures() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/thing", server.uri());
        match client.get(&url).await.unwrap() {
            Fetched::Exhausted { last_status } => {
                assert_eq!(last_status, Some(StatusCode::INTERNAL_SERVER_ERROR))
            }
            other => panic!("Expected exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_terminal() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let missing = format!("{}/missing", server.uri());
        let bad = format!("{}/bad", server.uri());
        assert!(matches!(client.get(&missing).await.unwrap(), Fetched::NotFound));
        assert!(matches!(client.get(&bad).await.unwrap(), Fetched::NotFound));
    }

    #[tokio::test]
    async fn test_forbidden_forces_token_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/logout"))
            .respond_with(ResponseTemplate::new(403).insert_header(CSRF_HEADER, "tok-1"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/thing", server.uri());
        assert!(matches!(client.get(&url).await.unwrap(), Fetched::Body(_)));
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/logout"))
            .respond_with(ResponseTemplate::new(403).insert_header(CSRF_HEADER, "tok-1"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let url = format!("{}/thing", server.uri());
        client.get(&url).await.unwrap();
        client.get(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/logout"))
            .respond_with(ResponseTemplate::new(403).insert_header(CSRF_HEADER, "tok-1"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.acquire_token().await.unwrap();
        assert!(matches!(
            client.acquire_token().await,
            Err(ApiError::TokenUnavailable(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        client.refresh_token().await;
        assert_eq!(client.token.read().await.value(), "tok-1");
    }

    #[tokio::test]
    async fn test_slow_response_is_retried() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"a": 1}))
                    .set_delay(Duration::from_millis(500)),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"a": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server).with_retry(RetryPolicy {
            attempts: 5,
            backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        });
        let url = format!("{}/thing", server.uri());
        match client.get(&url).await.unwrap() {
            Fetched::Body(body) => assert_eq!(body["a"], 2),
            other => panic!("Expected body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let client = ApiClient::new("secret")
            .unwrap()
            .with_endpoints(Endpoints::single("http://127.0.0.1:1"))
            .with_retry(RetryPolicy {
                attempts: 5,
                backoff: Duration::from_millis(1),
                timeout: Duration::from_secs(2),
            });

        let result = client.get("http://127.0.0.1:1/thing").await;
        assert!(matches!(result, Err(ApiError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_validate_credential() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/authenticated"))
            .and(header_is("cookie", ".ROBLOSECURITY=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.validate_credential().await.unwrap();

        let rejected = ApiClient::new("wrong")
            .unwrap()
            .with_endpoints(Endpoints::single(&server.uri()));
        assert!(matches!(
            rejected.validate_credential().await,
            Err(ApiError::InvalidCredential(_))
        ));
    }
}
