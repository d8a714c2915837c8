//! HTTP product-search candidate source

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::demand::{Candidate, DemandPattern};
use crate::domain::matching::CandidateSource;
use crate::domain::{DomainError, TransportErrorKind};

const DEFAULT_LIMIT: u32 = 50;

/// Product list payload: `{"products": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductsPayload {
    Wrapped { products: Vec<Candidate> },
    Bare(Vec<Candidate>),
}

/// Decode a product list payload
pub(super) fn decode_products(bytes: &[u8]) -> Result<Vec<Candidate>, DomainError> {
    let payload: ProductsPayload = serde_json::from_slice(bytes)
        .map_err(|e| DomainError::decode(format!("Invalid product payload: {}", e)))?;

    Ok(match payload {
        ProductsPayload::Wrapped { products } => products,
        ProductsPayload::Bare(products) => products,
    })
}

/// Candidate source backed by a `GET {base_url}/products` endpoint
#[derive(Debug, Clone)]
pub struct HttpCandidateSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limit: u32,
}

impl HttpCandidateSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Apply a transport-level timeout to every request
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, DomainError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query(&self, pattern: &DemandPattern) -> Vec<(&'static str, String)> {
        let (min, max) = pattern.price_range().ordered();
        let mut query = vec![
            ("q", pattern.search_term().to_string()),
            ("category", pattern.category().to_string()),
        ];

        if min > 0.0 {
            query.push(("min_price", min.to_string()));
        }
        if max < f64::MAX {
            query.push(("max_price", max.to_string()));
        }
        query.push(("limit", self.limit.to_string()));

        query
    }
}

#[async_trait]
impl CandidateSource for HttpCandidateSource {
    async fn fetch_candidates(
        &self,
        pattern: &DemandPattern,
    ) -> Result<Vec<Candidate>, DomainError> {
        let url = format!("{}/products", self.base_url);
        let mut request = self.client.get(&url).query(&self.query(pattern));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(map_request_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body));
        }

        let bytes = response.bytes().await.map_err(map_request_error)?;
        let candidates = decode_products(&bytes)?;

        debug!(url = %url, count = candidates.len(), "Fetched candidates");

        Ok(candidates)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Map a reqwest failure onto a classified transport error
fn map_request_error(error: reqwest::Error) -> DomainError {
    if error.is_timeout() {
        return DomainError::transport(TransportErrorKind::TimedOut, error.to_string());
    }

    if error.is_decode() || (error.is_body() && io_kind(&error).is_none()) {
        return DomainError::decode(error.to_string());
    }

    // Connect failures without a socket-level cause (DNS, TLS) stay `Other`
    let kind = io_kind(&error)
        .map(TransportErrorKind::from_io_kind)
        .unwrap_or(TransportErrorKind::Other);

    DomainError::transport(kind, error.to_string())
}

/// First I/O error kind in the source chain
fn io_kind(error: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = error.source();

    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
        source = cause.source();
    }

    None
}

/// Map a non-2xx response onto an HTTP error
///
/// The body may flag the failure as temporary through `temporary` or
/// `error.temporary`.
fn map_status_error(status: reqwest::StatusCode, body: &str) -> DomainError {
    let json: Option<serde_json::Value> = serde_json::from_str(body).ok();

    let flag = |key: &str| {
        json.as_ref().and_then(|value| {
            value
                .get(key)
                .or_else(|| value.get("error").and_then(|error| error.get(key)))
        })
    };

    let temporary = flag("temporary")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    let message = flag("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .or_else(|| (!body.is_empty()).then(|| body.chars().take(200).collect()))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_default();

    if temporary {
        DomainError::temporary_http(status.as_u16(), message)
    } else {
        DomainError::http(status.as_u16(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::demand::PriceRange;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn laptop() -> DemandPattern {
        DemandPattern::new("laptop", "electronics", PriceRange::new(500.0, 2000.0))
    }

    #[tokio::test]
    async fn test_fetch_wrapped_products() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/products"))
            .and(query_param("q", "laptop"))
            .and(query_param("category", "electronics"))
            .and(query_param("min_price", "500"))
            .and(query_param("max_price", "2000"))
            .and(query_param("limit", "10"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [
                    {"id": "1", "title": "Laptop Pro", "category": "electronics", "price": 1200.0},
                    {"aw_product_id": "2", "product_name": "Laptop Air", "search_price": 900.0}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpCandidateSource::new(format!("{}/", server.uri()))
            .with_api_key("secret")
            .with_limit(10);

        let candidates = source.fetch_candidates(&laptop()).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Laptop Pro");
        assert_eq!(candidates[1].id, "2");
    }

    #[tokio::test]
    async fn test_fetch_bare_array() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "title": "Laptop", "price": 999.0}
            ])))
            .mount(&server)
            .await;

        let source = HttpCandidateSource::new(server.uri());
        let candidates = source.fetch_candidates(&laptop()).await.unwrap();

        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "bad category"})),
            )
            .mount(&server)
            .await;

        let source = HttpCandidateSource::new(server.uri());
        let error = source.fetch_candidates(&laptop()).await.unwrap_err();

        match &error {
            DomainError::Http {
                status,
                message,
                temporary,
            } => {
                assert_eq!(*status, 400);
                assert_eq!(message, "bad category");
                assert!(!temporary);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn test_temporary_marker_in_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {"message": "index rebuilding", "temporary": true}
            })))
            .mount(&server)
            .await;

        let source = HttpCandidateSource::new(server.uri());
        let error = source.fetch_candidates(&laptop()).await.unwrap_err();

        assert!(matches!(
            error,
            DomainError::Http {
                status: 409,
                temporary: true,
                ..
            }
        ));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpCandidateSource::new(server.uri());
        let error = source.fetch_candidates(&laptop()).await.unwrap_err();

        assert!(matches!(error, DomainError::Http { status: 503, .. }));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let source = HttpCandidateSource::new(server.uri());
        let error = source.fetch_candidates(&laptop()).await.unwrap_err();

        assert!(matches!(error, DomainError::Decode { .. }));
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_response_is_transport_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let source = HttpCandidateSource::new(server.uri())
            .with_timeout(Duration::from_millis(50))
            .unwrap();
        let error = source.fetch_candidates(&laptop()).await.unwrap_err();

        assert!(matches!(
            error,
            DomainError::Transport {
                kind: TransportErrorKind::TimedOut,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_retryable() {
        let source = HttpCandidateSource::new("http://127.0.0.1:1");
        let error = source.fetch_candidates(&laptop()).await.unwrap_err();

        assert!(matches!(
            error,
            DomainError::Transport {
                kind: TransportErrorKind::ConnectionRefused,
                ..
            }
        ));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_permanent() {
        let source = HttpCandidateSource::new("http://products.invalid")
            .with_timeout(Duration::from_secs(10))
            .unwrap();
        let error = source.fetch_candidates(&laptop()).await.unwrap_err();

        assert!(matches!(
            error,
            DomainError::Transport {
                kind: TransportErrorKind::Other,
                ..
            }
        ));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_query_omits_open_bounds() {
        let source = HttpCandidateSource::new("http://localhost");
        let pattern = DemandPattern::new("laptop", "", PriceRange::default());

        let keys: Vec<_> = source.query(&pattern).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["q", "category", "limit"]);
    }
}
