//! Inbound group-sync messages.
//!
//! # Responsibility
//! - Decode server-pushed group operations for one collection.
//! - Route them to the matching collection of a root store.
//!
//! # Invariants
//! - Unknown domains are rejected, never silently dropped.
//! - `Update` operations are markers only; their data arrives through
//!   entity pushes.

use crate::error::{StoreError, StoreResult};
use crate::model::DomainName;
use crate::store::root::RootStore;
use log::{info, warn};
use serde::Deserialize;

/// What a group operation asks a collection to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupAction {
    /// New ids exist on the server; fetch them.
    Append,
    /// Ids were deleted or hidden on the server.
    Delete,
    /// Cached values are outdated; drop and refetch.
    Invalidate,
    /// Values already arrived through entity pushes.
    Update,
}

impl GroupAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Delete => "delete",
            Self::Invalidate => "invalidate",
            Self::Update => "update",
        }
    }
}

/// One batch operation against a collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupOperation {
    pub action: GroupAction,
    #[serde(default)]
    pub ids: Vec<String>,
}

impl GroupOperation {
    pub fn new(action: GroupAction, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            action,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Group operation addressed to a named collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupMessage {
    pub domain: String,
    #[serde(flatten)]
    pub operation: GroupOperation,
}

impl GroupMessage {
    /// Decodes one message from a channel payload.
    pub fn from_json(payload: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Applies one group message to the matching collection.
///
/// # Errors
/// - `Configuration` when the domain is unknown or not registered.
/// - Any load error raised while refetching appended or invalidated ids.
pub async fn dispatch(root: &RootStore, message: GroupMessage) -> StoreResult<()> {
    let Some(domain) = DomainName::parse(&message.domain) else {
        warn!(
            "event=sync_dispatch module=sync status=error reason=unknown_domain action={}",
            message.operation.action.as_str()
        );
        return Err(StoreError::Configuration(format!(
            "unknown domain `{}`",
            message.domain.trim()
        )));
    };

    info!(
        "event=sync_dispatch module=sync status=start domain={} action={} count={}",
        domain,
        message.operation.action.as_str(),
        message.operation.ids.len()
    );

    let operation = message.operation;
    match domain {
        DomainName::Organizations => root.organizations()?.apply(operation).await,
        DomainName::Contacts => root.contacts()?.apply(operation).await,
        DomainName::Contracts => root.contracts()?.apply(operation).await,
        DomainName::Invoices => root.invoices()?.apply(operation).await,
        DomainName::Flows => root.flows()?.apply(operation).await,
        DomainName::FlowSequences => root.flow_sequences()?.apply(operation).await,
    }
}
