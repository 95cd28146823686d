//! Named registry of domain services.
//!
//! # Responsibility
//! - Build the default service set once per session.
//! - Resolve services by name for shells that only know string keys.
//!
//! # Invariants
//! - Names are lowercase ascii, digits, `_` or `-`, and unique.
//! - A name resolves only to the concrete type it was registered with.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::DomainName;
use crate::service::contact_service::ContactService;
use crate::service::contract_service::ContractService;
use crate::service::flow_sequence_service::FlowSequenceService;
use crate::service::flow_service::FlowService;
use crate::service::invoice_service::InvoiceService;
use crate::service::organization_service::OrganizationService;
use crate::service::support::Paging;
use crate::store::root::RootStore;
use crate::transport::Transport;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

type ServiceHandle = Arc<dyn Any + Send + Sync>;

/// Services keyed by name.
#[derive(Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceHandle>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl ServiceRegistry {
    /// Registers one service per domain under the domain's name.
    pub fn new(
        transport: Arc<dyn Transport>,
        root: Arc<RootStore>,
        config: &StoreConfig,
    ) -> StoreResult<Self> {
        let paging = Paging::from_config(config);
        let mut registry = Self::default();
        registry.register(
            DomainName::Organizations.as_str(),
            OrganizationService::new(Arc::clone(&transport), Arc::clone(&root), paging),
        )?;
        registry.register(
            DomainName::Contacts.as_str(),
            ContactService::new(Arc::clone(&transport), Arc::clone(&root), paging),
        )?;
        registry.register(
            DomainName::Contracts.as_str(),
            ContractService::new(Arc::clone(&transport), Arc::clone(&root), paging),
        )?;
        registry.register(
            DomainName::Invoices.as_str(),
            InvoiceService::new(Arc::clone(&transport), Arc::clone(&root), paging),
        )?;
        registry.register(
            DomainName::Flows.as_str(),
            FlowService::new(Arc::clone(&transport), Arc::clone(&root)),
        )?;
        registry.register(
            DomainName::FlowSequences.as_str(),
            FlowSequenceService::new(transport, root),
        )?;
        Ok(registry)
    }

    /// Adds a service under `name`.
    ///
    /// # Errors
    /// - `Configuration` for an invalid or already registered name.
    pub fn register<S: Any + Send + Sync>(&mut self, name: &str, service: S) -> StoreResult<()> {
        let name = name.trim().to_string();
        if !is_valid_service_name(&name) {
            return Err(StoreError::Configuration(format!(
                "service name is invalid: {name}"
            )));
        }
        if self.services.contains_key(&name) {
            return Err(StoreError::Configuration(format!(
                "service already registered: {name}"
            )));
        }
        self.services.insert(name, Arc::new(service));
        Ok(())
    }

    /// Returns the service registered as `name`.
    ///
    /// # Errors
    /// - `Configuration` when the name is unknown or holds another type.
    pub fn get<S: Any + Send + Sync>(&self, name: &str) -> StoreResult<Arc<S>> {
        let name = name.trim();
        let service = self
            .services
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::Configuration(format!("service not found: {name}")))?;
        service.downcast::<S>().map_err(|_| {
            StoreError::Configuration(format!(
                "service `{name}` is not a `{}`",
                std::any::type_name::<S>()
            ))
        })
    }

    /// Sorted service names.
    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn organizations(&self) -> StoreResult<Arc<OrganizationService>> {
        self.get(DomainName::Organizations.as_str())
    }

    pub fn contacts(&self) -> StoreResult<Arc<ContactService>> {
        self.get(DomainName::Contacts.as_str())
    }

    pub fn contracts(&self) -> StoreResult<Arc<ContractService>> {
        self.get(DomainName::Contracts.as_str())
    }

    pub fn invoices(&self) -> StoreResult<Arc<InvoiceService>> {
        self.get(DomainName::Invoices.as_str())
    }

    pub fn flows(&self) -> StoreResult<Arc<FlowService>> {
        self.get(DomainName::Flows.as_str())
    }

    pub fn flow_sequences(&self) -> StoreResult<Arc<FlowSequenceService>> {
        self.get(DomainName::FlowSequences.as_str())
    }
}

fn is_valid_service_name(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::ServiceRegistry;
    use crate::error::StoreError;

    struct Marker(u32);

    #[test]
    fn rejects_invalid_or_duplicate_names() {
        let mut registry = ServiceRegistry::default();
        assert!(matches!(
            registry.register("Billing Service", Marker(1)),
            Err(StoreError::Configuration(_))
        ));
        assert!(matches!(
            registry.register("   ", Marker(1)),
            Err(StoreError::Configuration(_))
        ));

        registry
            .register("billing", Marker(1))
            .expect("first registration should succeed");
        assert!(matches!(
            registry.register(" billing ", Marker(2)),
            Err(StoreError::Configuration(_))
        ));
        assert_eq!(registry.names(), vec!["billing".to_string()]);
    }

    #[test]
    fn get_checks_the_registered_type() {
        let mut registry = ServiceRegistry::default();
        registry.register("marker", Marker(7)).expect("register");

        let marker = registry.get::<Marker>("  marker ").expect("marker service");
        assert_eq!(marker.0, 7);

        assert!(matches!(
            registry.get::<String>("marker"),
            Err(StoreError::Configuration(_))
        ));
        assert!(matches!(
            registry.get::<Marker>("missing"),
            Err(StoreError::Configuration(_))
        ));
    }
}
