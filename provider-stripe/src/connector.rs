//! Stripe API connector implementation
//!
//! Implements the `EventSource` trait for the Stripe events API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::source::{AccountCredential, EventPage, EventSource, RemoteEvent, RemoteQuery};
use tracing::{debug, info, instrument, warn};

use crate::error::StripeError;
use crate::types::{ErrorResponse, EventListResponse};

/// Stripe API base URL
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe API connector
///
/// # Features
///
/// - Form-encoded listing filters, bracketed keys included (`created[gte]`)
/// - Bearer authentication with the account's secret key
/// - Exponential backoff for 429 and 5xx responses
/// - 404 reported as [`BridgeError::NotFound`](bridge_traits::error::BridgeError::NotFound)
///
/// # Example
///
/// ```ignore
/// use provider_stripe::StripeConnector;
/// use bridge_traits::source::{EventSource, RemoteQuery};
///
/// let connector = StripeConnector::new(http_client);
/// let page = connector.list_events(&credential, &RemoteQuery::new()).await?;
/// ```
pub struct StripeConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Base URL without trailing slash
    api_base: String,

    /// Backoff between attempts on retryable statuses
    retry_policy: RetryPolicy,

    /// Per-request timeout handed to the HTTP client
    request_timeout: Duration,
}

impl StripeConnector {
    /// Create a connector against the public Stripe API
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            api_base: DEFAULT_API_BASE.to_string(),
            retry_policy: RetryPolicy::default(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the connector at another base URL (mock servers, proxies)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build `/v1/events` URL with the query form-encoded
    fn list_url(&self, query: &RemoteQuery) -> String {
        let mut url = format!("{}/v1/events", self.api_base);

        let encoded = query
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");

        if !encoded.is_empty() {
            url.push('?');
            url.push_str(&encoded);
        }

        url
    }

    fn event_url(&self, id: &str) -> String {
        format!("{}/v1/events/{}", self.api_base, urlencoding::encode(id))
    }

    /// Extract Stripe's error message from a failed response
    fn error_message(response: &HttpResponse) -> String {
        match response.json::<ErrorResponse>() {
            Ok(envelope) => envelope
                .error
                .message
                .unwrap_or_else(|| "unknown error".to_string()),
            Err(_) => String::from_utf8_lossy(&response.body).to_string(),
        }
    }

    /// Execute a GET with retry logic
    ///
    /// Rate limiting and server errors are retried with backoff; other
    /// statuses are returned to the caller as errors immediately.
    #[instrument(skip(self, credential), fields(url = %url))]
    async fn get(&self, credential: &AccountCredential, url: String) -> Result<HttpResponse> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = HttpRequest::get(url.clone())
                .bearer_token(credential.secret_key())
                .header("Accept", "application/json")
                .timeout(self.request_timeout);

            // The HTTP client must not retry on its own; backoff happens here.
            match self
                .http_client
                .execute_with_retry(request, RetryPolicy::no_retry())
                .await
            {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "Stripe request succeeded");
                    return Ok(response);
                }
                Ok(response) if response.is_retryable() => {
                    let status = response.status;
                    if attempt >= max_attempts {
                        warn!(status, attempts = attempt, "Stripe request failed, giving up");
                        return Err(StripeError::RetriesExhausted {
                            attempts: attempt,
                            status_code: status,
                        }
                        .into());
                    }

                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    warn!(
                        status,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Stripe request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) if response.status == 404 => {
                    debug!(request_id = ?response.header("request-id"), "Stripe resource not found");
                    return Err(StripeError::NotFound {
                        resource: Self::error_message(&response),
                    }
                    .into());
                }
                Ok(response) => {
                    warn!(
                        status = response.status,
                        request_id = ?response.header("request-id"),
                        "Stripe request rejected"
                    );
                    return Err(StripeError::ApiError {
                        status_code: response.status,
                        message: Self::error_message(&response),
                    }
                    .into());
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        warn!(error = %e, attempts = attempt, "Stripe request failed, giving up");
                        return Err(e);
                    }

                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    warn!(error = %e, attempt, max_attempts, "Stripe request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl EventSource for StripeConnector {
    #[instrument(skip(self, credential, query), fields(account_key = %credential.account_key()))]
    async fn list_events(
        &self,
        credential: &AccountCredential,
        query: &RemoteQuery,
    ) -> Result<EventPage> {
        let response = self.get(credential, self.list_url(query)).await?;

        let list: EventListResponse = serde_json::from_slice(&response.body).map_err(|e| {
            StripeError::ParseError(format!("Failed to parse event list response: {}", e))
        })?;

        let data = list
            .data
            .into_iter()
            .map(RemoteEvent::from_payload)
            .collect::<Result<Vec<_>>>()?;

        info!(
            count = data.len(),
            has_more = list.has_more,
            total_count = ?list.total_count,
            "Listed events from Stripe"
        );

        Ok(EventPage {
            data,
            has_more: list.has_more,
            total_count: list.total_count,
        })
    }

    #[instrument(skip(self, credential), fields(account_key = %credential.account_key()))]
    async fn get_event(&self, credential: &AccountCredential, id: &str) -> Result<RemoteEvent> {
        let response = self.get(credential, self.event_url(id)).await?;

        let payload = serde_json::from_slice(&response.body).map_err(|e| {
            StripeError::ParseError(format!("Failed to parse event {}: {}", id, e))
        })?;

        RemoteEvent::from_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn credential() -> AccountCredential {
        AccountCredential::new("acct_1", "sk_test_abc").unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            use_exponential_backoff: true,
        }
    }

    #[test]
    fn test_list_url_encodes_bracketed_keys() {
        let connector = StripeConnector::new(Arc::new(MockHttpClient::new()))
            .with_api_base("http://localhost:12111/");

        let mut query = RemoteQuery::new();
        query.insert("created[gte]", "1453000000");
        query.insert("include[]", "total_count");
        query.insert("type", "charge.succeeded");

        assert_eq!(
            connector.list_url(&query),
            "http://localhost:12111/v1/events?created%5Bgte%5D=1453000000\
             &include%5B%5D=total_count&type=charge.succeeded"
        );
        assert_eq!(
            connector.list_url(&RemoteQuery::new()),
            "http://localhost:12111/v1/events"
        );
    }

    #[tokio::test]
    async fn test_list_events_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .withf(|request| {
                request.url.starts_with("https://api.stripe.com/v1/events?")
                    && request.headers.get("Authorization").map(String::as_str)
                        == Some("Bearer sk_test_abc")
            })
            .times(1)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{
                        "object": "list",
                        "url": "/v1/events",
                        "has_more": true,
                        "total_count": 42,
                        "data": [
                            { "id": "evt_1", "type": "charge.succeeded", "created": 1 },
                            { "id": "evt_2", "type": "invoice.paid", "created": 2 }
                        ]
                    }"#,
                ))
            });

        let connector = StripeConnector::new(Arc::new(mock_http));
        let mut query = RemoteQuery::new();
        query.insert("limit", "2");

        let page = connector.list_events(&credential(), &query).await.unwrap();

        assert_eq!(page.data.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.total_count, Some(42));
        assert_eq!(page.last_id(), Some("evt_2"));
        assert_eq!(page.data[1].event_type(), Some("invoice.paid"));
    }

    #[tokio::test]
    async fn test_get_event_not_found() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                404,
                r#"{"error":{"type":"invalid_request_error","message":"No such event: 'evt_x'"}}"#,
            ))
        });

        let connector = StripeConnector::new(Arc::new(mock_http));
        let err = connector.get_event(&credential(), "evt_x").await.unwrap_err();

        assert!(matches!(err, BridgeError::NotFound(ref msg) if msg.contains("evt_x")));
    }

    #[tokio::test]
    async fn test_get_event_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .withf(|request| request.url == "https://api.stripe.com/v1/events/evt_9")
            .times(1)
            .returning(|_| Ok(response(200, r#"{"id":"evt_9","object":"event"}"#)));

        let connector = StripeConnector::new(Arc::new(mock_http));
        let event = connector.get_event(&credential(), "evt_9").await.unwrap();

        assert_eq!(event.id, "evt_9");
        assert_eq!(event.payload["object"], "event");
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mut mock_http = MockHttpClient::new();
        let mut calls = 0;

        mock_http.expect_execute().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(response(503, "unavailable"))
            } else {
                Ok(response(200, r#"{"data":[],"has_more":false}"#))
            }
        });

        let connector =
            StripeConnector::new(Arc::new(mock_http)).with_retry_policy(fast_retries());
        let page = connector
            .list_events(&credential(), &RemoteQuery::new())
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.total_count, None);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(3)
            .returning(|_| Ok(response(429, "slow down")));

        let connector =
            StripeConnector::new(Arc::new(mock_http)).with_retry_policy(fast_retries());
        let err = connector
            .list_events(&credential(), &RemoteQuery::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                401,
                r#"{"error":{"type":"invalid_request_error","message":"Invalid API Key provided"}}"#,
            ))
        });

        let connector =
            StripeConnector::new(Arc::new(mock_http)).with_retry_policy(fast_retries());
        let err = connector
            .list_events(&credential(), &RemoteQuery::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid API Key provided"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, "<html>")));

        let connector = StripeConnector::new(Arc::new(mock_http));
        let err = connector
            .list_events(&credential(), &RemoteQuery::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to parse"));
    }
}
