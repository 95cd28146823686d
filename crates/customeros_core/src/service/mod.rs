//! Domain use-case services.
//!
//! # Responsibility
//! - Turn GraphQL queries and mutations into cache writes.
//! - Keep shells decoupled from transport and cache details.
//!
//! # See also
//! - `support` for the shared optimistic and paging flows.

pub mod contact_service;
pub mod contract_service;
pub mod flow_sequence_service;
pub mod flow_service;
pub mod invoice_service;
pub mod organization_service;
pub mod registry;
pub mod support;
