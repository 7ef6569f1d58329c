//! Page sources: the page-fetch contract and its HTTP implementation

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::model::{PageRequest, PageResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Retry policy for page fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Policy without delays, for hosts that schedule retries themselves
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_backoff_ms: 0,
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Anything that can produce a page of images for a cursor
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError>;
}

/// Fetch one page, retrying retryable failures with linear backoff
#[instrument(name = "fetch_page_with_retry", skip(source, retry), fields(cursor = ?request.cursor))]
pub async fn fetch_with_retry<S: PageSource + ?Sized>(
    source: &S,
    request: &PageRequest,
    retry: &RetryPolicy,
) -> Result<PageResponse, FetchError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match source.fetch_page(request).await {
            Ok(page) => return Ok(page),
            Err(e) if !e.is_retryable() => {
                tracing::warn!(attempt, "Page fetch failed permanently: {}", e);
                return Err(e);
            }
            Err(e) => {
                if attempt >= max_attempts {
                    tracing::warn!(attempt, "Page fetch failed, giving up: {}", e);
                    return Err(e);
                }
                tracing::debug!(attempt, "Page fetch failed, retrying: {}", e);
            }
        }
        tokio::time::sleep(retry.backoff(attempt)).await;
    }
}

/// Page source backed by the gallery HTTP API
pub struct HttpPageSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPageSource {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Query pairs for a page request
pub fn query_pairs(request: &PageRequest) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("limit", request.limit.to_string())];
    if let Some(cursor) = &request.cursor {
        pairs.push(("cursor", cursor.as_str().to_string()));
    }
    pairs
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query_pairs(request))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_response(status.as_u16(), &body));
        }

        response
            .json::<PageResponse>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{image, Cursor, PageInfo};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Scripted source: pops one canned result per call and records requests
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        pub responses: Mutex<VecDeque<Result<PageResponse, FetchError>>>,
        pub requests: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedSource {
        pub fn push(&self, result: Result<PageResponse, FetchError>) {
            self.responses.lock().push_back(result);
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
            self.requests.lock().push(request.clone());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Network("script exhausted".into())))
        }
    }

    pub(crate) fn page(ids: &[u64], has_more: bool, next: Option<i64>) -> PageResponse {
        PageResponse {
            images: ids.iter().map(|&id| image(id, id as i64 * 10)).collect(),
            pagination: PageInfo {
                has_more,
                next_cursor: next.map(Cursor::from),
                total_count: 0,
            },
        }
    }

    fn server_error() -> FetchError {
        FetchError::Http { status: 500, message: "boom".into() }
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let source = ScriptedSource::default();
        source.push(Err(server_error()));
        source.push(Ok(page(&[1], false, None)));

        let request = PageRequest { limit: 10, cursor: None };
        let result = fetch_with_retry(&source, &request, &RetryPolicy::immediate(3)).await;

        assert!(result.is_ok());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let source = ScriptedSource::default();
        for _ in 0..5 {
            source.push(Err(server_error()));
        }

        let request = PageRequest { limit: 10, cursor: None };
        let result = fetch_with_retry(&source, &request, &RetryPolicy::immediate(3)).await;

        assert_eq!(result.unwrap_err(), server_error());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let source = ScriptedSource::default();
        source.push(Err(FetchError::Http { status: 404, message: "gone".into() }));
        source.push(Ok(page(&[1], false, None)));

        let request = PageRequest { limit: 10, cursor: Some(Cursor::from(42)) };
        let result = fetch_with_retry(&source, &request, &RetryPolicy::immediate(3)).await;

        assert!(result.is_err());
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_query_pairs() {
        let first = PageRequest { limit: 24, cursor: None };
        assert_eq!(query_pairs(&first), vec![("limit", "24".to_string())]);

        let next = PageRequest { limit: 24, cursor: Some(Cursor::from(42)) };
        assert_eq!(
            query_pairs(&next),
            vec![("limit", "24".to_string()), ("cursor", "42".to_string())]
        );
    }
}
