//! Domain records cached by the store.
//!
//! # Responsibility
//! - Define the serde shapes of every cached entity kind.
//! - Describe how each kind is identified and fetched by id.
//!
//! # Invariants
//! - Every record exposes one stable string id, unique within its domain.
//! - Every record has a `Default` shape so a placeholder can exist before
//!   the first load completes.
//! - Relationships are stored as id references and resolved through the
//!   root store, never as owned copies of the related record.

pub mod common;
pub mod contact;
pub mod contract;
pub mod flow;
pub mod invoice;
pub mod organization;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Registered entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DomainName {
    Organizations,
    Contacts,
    Contracts,
    Invoices,
    Flows,
    FlowSequences,
}

impl DomainName {
    pub const ALL: [DomainName; 6] = [
        DomainName::Organizations,
        DomainName::Contacts,
        DomainName::Contracts,
        DomainName::Invoices,
        DomainName::Flows,
        DomainName::FlowSequences,
    ];

    /// Stable name used in logs and the service registry.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Contacts => "contacts",
            Self::Contracts => "contracts",
            Self::Invoices => "invoices",
            Self::Flows => "flows",
            Self::FlowSequences => "flow_sequences",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str() == normalized)
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch-by-ids document for one domain.
///
/// The document takes `$ids: [ID!]!` and returns a list under `field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchQuery {
    pub document: &'static str,
    pub field: &'static str,
}

/// Contract every cached record kind satisfies.
pub trait Record: Clone + Default + Send + Sync + Serialize + DeserializeOwned + 'static {
    const DOMAIN: DomainName;

    /// Document used by the default loader to fetch missing ids in one batch.
    fn batch_query() -> BatchQuery;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: &str);

    /// Partially populated value shown while the real record is loading.
    fn placeholder(id: &str) -> Self {
        let mut value = Self::default();
        value.set_id(id);
        value
    }
}
