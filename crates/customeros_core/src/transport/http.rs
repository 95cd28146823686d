//! reqwest-backed GraphQL transport.

use crate::config::{RetryPolicy, StoreConfig};
use crate::error::{GraphQlMessage, StoreError, StoreResult};
use crate::transport::{operation_name, Transport};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

pub const API_KEY_HEADER: &str = "X-Openline-API-KEY";
pub const USERNAME_HEADER: &str = "X-Openline-USERNAME";

#[derive(Serialize)]
struct RequestBody<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlMessage>>,
}

/// Transport that POSTs `{query, variables}` to one GraphQL endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Builds a client with the identity headers fixed for its lifetime.
    ///
    /// # Errors
    /// - `Configuration` when settings are invalid or a header value is not
    ///   representable.
    /// - `Network` when the HTTP client cannot be constructed.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-openline-api-key"),
            header_value(API_KEY_HEADER, config.api_key.trim())?,
        );
        if !config.username.trim().is_empty() {
            headers.insert(
                HeaderName::from_static("x-openline-username"),
                header_value(USERNAME_HEADER, config.username.trim())?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| StoreError::Network(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            retry: config.retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(&self, document: &str, variables: &Value) -> StoreResult<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RequestBody {
                query: document,
                variables,
            })
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Network(format!("unexpected status {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        parse_envelope(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, document: &str, variables: Value) -> StoreResult<Value> {
        let operation = operation_name(document);
        let started_at = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.send_once(document, &variables).await {
                Ok(data) => {
                    info!(
                        "event=transport_request module=transport status=ok operation={} attempt={} duration_ms={}",
                        operation,
                        attempt,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(data);
                }
                Err(err) if err.is_retryable() && attempt <= self.retry.max_retries => {
                    warn!(
                        "event=transport_request module=transport status=retry operation={} attempt={} error_code={}",
                        operation,
                        attempt,
                        err.code()
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(err) => {
                    warn!(
                        "event=transport_request module=transport status=error operation={} attempt={} error_code={} duration_ms={}",
                        operation,
                        attempt,
                        err.code(),
                        started_at.elapsed().as_millis()
                    );
                    return Err(err);
                }
            }
        }
    }
}

/// Splits a GraphQL response body into `data` or a typed error.
pub fn parse_envelope(body: Value) -> StoreResult<Value> {
    let envelope: ResponseEnvelope = serde_json::from_value(body)?;
    if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
        debug!(
            "event=transport_envelope module=transport status=error message_count={}",
            errors.len()
        );
        return Err(StoreError::GraphQl(errors));
    }
    match envelope.data {
        Some(Value::Null) | None => Err(StoreError::Decode(
            "response carries neither data nor errors".to_string(),
        )),
        Some(data) => Ok(data),
    }
}

fn header_value(name: &str, value: &str) -> StoreResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| StoreError::Configuration(format!("invalid value for header `{name}`")))
}

#[cfg(test)]
mod tests {
    use super::{parse_envelope, HttpTransport};
    use crate::config::StoreConfig;
    use crate::error::StoreError;
    use serde_json::json;

    #[test]
    fn envelope_errors_win_over_partial_data() {
        let err = parse_envelope(json!({
            "data": { "flows": [] },
            "errors": [{ "message": "not allowed", "path": ["flows"] }]
        }))
        .unwrap_err();
        match err {
            StoreError::GraphQl(messages) => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].message, "not allowed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn envelope_without_data_is_a_decode_error() {
        assert!(matches!(
            parse_envelope(json!({ "data": null })),
            Err(StoreError::Decode(_))
        ));
        assert_eq!(
            parse_envelope(json!({ "data": { "ok": true }, "errors": [] })).unwrap(),
            json!({ "ok": true })
        );
    }

    #[test]
    fn header_values_with_newlines_are_rejected() {
        let config = StoreConfig::new("http://localhost:10000", "key\nbroken", "ops@example.com");
        assert!(matches!(
            HttpTransport::new(&config),
            Err(StoreError::Configuration(_))
        ));
    }

    #[test]
    fn endpoint_points_at_query_route() {
        let config = StoreConfig::new("http://localhost:10000/", "key", "");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:10000/query");
    }
}
