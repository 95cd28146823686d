//! Single channel to the GraphQL backend.
//!
//! # Responsibility
//! - Define the [`Transport`] seam every loader and service talks through.
//! - Decode typed responses and name operations for log lines.
//!
//! # Invariants
//! - A transport returns the `data` object of a successful response only;
//!   error responses surface as `StoreError::GraphQl`.
//! - Identity headers are fixed when a transport is built.
//!
//! # See also
//! - `transport::http` for the reqwest-backed implementation.

pub mod http;

use crate::error::StoreResult;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

static OPERATION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:query|mutation|subscription)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid operation name regex")
});

/// Issues GraphQL requests on behalf of the store.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one document with its variables and returns the `data` object.
    ///
    /// # Errors
    /// - `Network` on connection failure, timeout or non-2xx status.
    /// - `GraphQl` when the server answers with a non-empty `errors` list.
    /// - `Decode` when the body is not a GraphQL response envelope.
    async fn request(&self, document: &str, variables: Value) -> StoreResult<Value>;
}

/// Sends a request and decodes the `data` object into `R`.
pub async fn send_as<R: DeserializeOwned>(
    transport: &dyn Transport,
    document: &str,
    variables: Value,
) -> StoreResult<R> {
    let data = transport.request(document, variables).await?;
    Ok(serde_json::from_value(data)?)
}

/// Returns the declared operation name, or `anonymous`.
pub fn operation_name(document: &str) -> &str {
    OPERATION_NAME_RE
        .captures(document)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
        .unwrap_or("anonymous")
}

#[cfg(test)]
mod tests {
    use super::operation_name;

    #[test]
    fn operation_name_reads_declared_name() {
        assert_eq!(
            operation_name("\n  query getFlows { flows { id } }"),
            "getFlows"
        );
        assert_eq!(
            operation_name("mutation hideOrganizations($ids: [ID!]!) { x }"),
            "hideOrganizations"
        );
        assert_eq!(operation_name("{ flows { id } }"), "anonymous");
    }
}
