//! Error taxonomy shared by transport, store and service layers.
//!
//! # Responsibility
//! - Give every failure path one typed shape callers can match on.
//! - Keep errors cheap to clone so coalesced loads can hand the same
//!   failure to every waiter.
//!
//! # Invariants
//! - Only `Network` failures are retryable.
//! - Store-layer code never swallows an error; it is either returned or
//!   recorded on the entity/collection that owns the failed request.

use crate::store::status::EntityStatus;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// One field-level message from a GraphQL error response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlMessage {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

impl GraphQlMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }
}

/// Typed failure for every store, transport and service operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Connection refused, timeout, non-2xx status.
    Network(String),
    /// Well-formed error response from the server.
    GraphQl(Vec<GraphQlMessage>),
    /// Mutation response was based on a version the cache has moved past.
    Conflict {
        id: String,
        expected_version: u64,
        actual_version: u64,
    },
    /// Unregistered domain, invalid header value, missing setting.
    Configuration(String),
    /// Response body did not match the expected shape.
    Decode(String),
    /// Requested id was absent from a load response.
    NotFound { domain: &'static str, id: String },
    /// Illegal entity state-machine edge.
    InvalidTransition {
        id: String,
        from: EntityStatus,
        action: &'static str,
    },
}

impl StoreError {
    /// Returns whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Short stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::GraphQl(_) => "graphql",
            Self::Conflict { .. } => "conflict",
            Self::Configuration(_) => "configuration",
            Self::Decode(_) => "decode",
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::GraphQl(messages) => {
                let joined = messages
                    .iter()
                    .map(|m| m.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "graphql error: {joined}")
            }
            Self::Conflict {
                id,
                expected_version,
                actual_version,
            } => write!(
                f,
                "stale data for `{id}`: write was based on version {expected_version}, cache is at {actual_version}; please retry"
            ),
            Self::Configuration(message) => write!(f, "configuration error: {message}"),
            Self::Decode(message) => write!(f, "invalid response: {message}"),
            Self::NotFound { domain, id } => write!(f, "{domain} entity not found: {id}"),
            Self::InvalidTransition { id, from, action } => write!(
                f,
                "cannot {action} entity `{id}` while {}",
                from.as_str()
            ),
        }
    }
}

impl Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
