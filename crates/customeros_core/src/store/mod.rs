//! Normalized entity cache.
//!
//! `RootStore` owns one `DomainCollection` per registered domain; each
//! collection owns the `EntityStore` handles of its records.

pub mod collection;
pub mod entity;
pub mod loader;
pub mod notify;
pub mod root;
pub mod status;
