//! Client-side entity store for the CustomerOS GraphQL API.
//! One identity-mapped cache per domain, fed by services over one transport.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;
pub mod table;
pub mod transport;

pub use config::{RetryPolicy, StalenessPolicy, StoreConfig};
pub use error::{GraphQlMessage, StoreError, StoreResult};
pub use logging::{default_log_level, init_logging, init_logging_with, logging_status, LogTarget};
pub use model::{DomainName, Record};
pub use service::registry::ServiceRegistry;
pub use store::collection::{CollectionChange, DomainCollection};
pub use store::entity::{EntityEvent, EntityStore};
pub use store::loader::{EntityLoader, GraphqlLoader};
pub use store::notify::Subscription;
pub use store::root::{RootStore, RootStoreBuilder};
pub use store::status::EntityStatus;
pub use sync::{dispatch, GroupAction, GroupMessage, GroupOperation};
pub use table::{ColumnFilters, FilterAdapter, FilterValue, Row};
pub use transport::http::HttpTransport;
pub use transport::Transport;

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
