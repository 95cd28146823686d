//! Session-wide owner of every domain collection.
//!
//! # Responsibility
//! - Create each registered collection once and hand out shared handles.
//! - Resolve cross-entity relationships through the identity maps.
//!
//! # Invariants
//! - The collection set is fixed at construction; there is no direct
//!   mutation API on the root itself.
//! - Entities hold only a `Weak` back-reference to the root.
//! - Relationship lookups never create entries.

use crate::config::StalenessPolicy;
use crate::error::{StoreError, StoreResult};
use crate::model::contact::Contact;
use crate::model::contract::Contract;
use crate::model::flow::{Flow, FlowSequence};
use crate::model::invoice::Invoice;
use crate::model::organization::Organization;
use crate::model::{DomainName, Record};
use crate::store::collection::DomainCollection;
use crate::store::entity::EntityStore;
use crate::store::loader::{EntityLoader, GraphqlLoader};
use crate::transport::Transport;
use log::info;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// Type-erased view of a collection held by the root.
trait ErasedCollection: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn invalidate_all(&self);
    fn len(&self) -> usize;
}

impl<T: Record> ErasedCollection for DomainCollection<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn invalidate_all(&self) {
        self.invalidate(None);
    }

    fn len(&self) -> usize {
        DomainCollection::len(self)
    }
}

type Registration =
    Box<dyn FnOnce(Weak<RootStore>, StalenessPolicy) -> Box<dyn ErasedCollection> + Send>;

/// Owner of all domain collections for one session.
pub struct RootStore {
    collections: BTreeMap<DomainName, Box<dyn ErasedCollection>>,
}

impl std::fmt::Debug for RootStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootStore")
            .field("domains", &self.domains())
            .finish()
    }
}

impl RootStore {
    /// Registers every domain with the default GraphQL loader.
    pub fn new(
        transport: Arc<dyn Transport>,
        staleness: StalenessPolicy,
    ) -> StoreResult<Arc<Self>> {
        Self::builder()
            .staleness(staleness)
            .register_all_graphql(transport)
            .build()
    }

    pub fn builder() -> RootStoreBuilder {
        RootStoreBuilder::default()
    }

    /// Returns the collection registered for `domain`.
    ///
    /// # Errors
    /// - `Configuration` when the domain is not registered or holds a
    ///   different record type.
    pub fn get<T: Record>(&self, domain: DomainName) -> StoreResult<DomainCollection<T>> {
        let collection = self.collections.get(&domain).ok_or_else(|| {
            StoreError::Configuration(format!("domain `{domain}` is not registered"))
        })?;
        collection
            .as_any()
            .downcast_ref::<DomainCollection<T>>()
            .cloned()
            .ok_or_else(|| {
                StoreError::Configuration(format!(
                    "domain `{domain}` does not hold `{}` records",
                    T::DOMAIN
                ))
            })
    }

    /// Returns the collection for the record type's own domain.
    pub fn collection<T: Record>(&self) -> StoreResult<DomainCollection<T>> {
        self.get(T::DOMAIN)
    }

    pub fn organizations(&self) -> StoreResult<DomainCollection<Organization>> {
        self.collection()
    }

    pub fn contacts(&self) -> StoreResult<DomainCollection<Contact>> {
        self.collection()
    }

    pub fn contracts(&self) -> StoreResult<DomainCollection<Contract>> {
        self.collection()
    }

    pub fn invoices(&self) -> StoreResult<DomainCollection<Invoice>> {
        self.collection()
    }

    pub fn flows(&self) -> StoreResult<DomainCollection<Flow>> {
        self.collection()
    }

    pub fn flow_sequences(&self) -> StoreResult<DomainCollection<FlowSequence>> {
        self.collection()
    }

    /// Registered domains, sorted.
    pub fn domains(&self) -> Vec<DomainName> {
        self.collections.keys().copied().collect()
    }

    /// Total cached entries across all collections.
    pub fn entry_count(&self) -> usize {
        self.collections.values().map(|c| c.len()).sum()
    }

    /// Invalidates every collection, e.g. on tenant switch.
    pub fn invalidate_all(&self) {
        for collection in self.collections.values() {
            collection.invalidate_all();
        }
        info!(
            "event=root_invalidate_all module=store status=ok domain_count={}",
            self.collections.len()
        );
    }

    /// Parent contract of an invoice, if cached.
    pub fn contract_of_invoice(&self, invoice: &EntityStore<Invoice>) -> Option<EntityStore<Contract>> {
        let contract_id = invoice.read(|value| value.contract_id().map(str::to_string))?;
        self.contracts().ok()?.peek(&contract_id)
    }

    /// Cached invoices that reference `contract_id`, ordered by id.
    pub fn invoices_of_contract(&self, contract_id: &str) -> Vec<EntityStore<Invoice>> {
        let Ok(invoices) = self.invoices() else {
            return Vec::new();
        };
        invoices
            .to_vec()
            .into_iter()
            .filter(|invoice| invoice.read(|value| value.contract_id() == Some(contract_id)))
            .collect()
    }

    /// Cached contracts referenced by an organization.
    pub fn contracts_of_organization(
        &self,
        organization: &EntityStore<Organization>,
    ) -> Vec<EntityStore<Contract>> {
        let Ok(contracts) = self.contracts() else {
            return Vec::new();
        };
        let ids: Vec<String> = organization.read(|value| {
            value
                .contracts
                .iter()
                .map(|contract| contract.id().to_string())
                .collect()
        });
        ids.iter().filter_map(|id| contracts.peek(id)).collect()
    }

    /// Cached organizations a contact belongs to.
    pub fn organizations_of_contact(
        &self,
        contact: &EntityStore<Contact>,
    ) -> Vec<EntityStore<Organization>> {
        let Ok(organizations) = self.organizations() else {
            return Vec::new();
        };
        let ids: Vec<String> =
            contact.read(|value| value.organization_ids().map(str::to_string).collect());
        ids.iter().filter_map(|id| organizations.peek(id)).collect()
    }
}

/// Builder for a root store with a chosen set of domains.
#[derive(Default)]
pub struct RootStoreBuilder {
    staleness: StalenessPolicy,
    registrations: Vec<(DomainName, Registration)>,
}

impl RootStoreBuilder {
    pub fn staleness(mut self, staleness: StalenessPolicy) -> Self {
        self.staleness = staleness;
        self
    }

    /// Registers one domain with a custom loader.
    pub fn register<T: Record>(mut self, loader: Arc<dyn EntityLoader<T>>) -> Self {
        let registration: Registration = Box::new(move |root, staleness| {
            Box::new(DomainCollection::<T>::new(loader, root, staleness))
        });
        self.registrations.push((T::DOMAIN, registration));
        self
    }

    /// Registers one domain with the GraphQL batch loader.
    pub fn register_graphql<T: Record>(self, transport: Arc<dyn Transport>) -> Self {
        self.register::<T>(Arc::new(GraphqlLoader::<T>::new(transport)))
    }

    /// Registers every domain with the GraphQL batch loader.
    pub fn register_all_graphql(self, transport: Arc<dyn Transport>) -> Self {
        self.register_graphql::<Organization>(Arc::clone(&transport))
            .register_graphql::<Contact>(Arc::clone(&transport))
            .register_graphql::<Contract>(Arc::clone(&transport))
            .register_graphql::<Invoice>(Arc::clone(&transport))
            .register_graphql::<Flow>(Arc::clone(&transport))
            .register_graphql::<FlowSequence>(transport)
    }

    /// Creates the root and all registered collections.
    ///
    /// # Errors
    /// - `Configuration` when a domain is registered twice.
    pub fn build(self) -> StoreResult<Arc<RootStore>> {
        let mut seen = Vec::with_capacity(self.registrations.len());
        for (domain, _) in &self.registrations {
            if seen.contains(domain) {
                return Err(StoreError::Configuration(format!(
                    "domain `{domain}` is registered more than once"
                )));
            }
            seen.push(*domain);
        }

        let staleness = self.staleness;
        let root = Arc::new_cyclic(|weak: &Weak<RootStore>| {
            let collections = self
                .registrations
                .into_iter()
                .map(|(domain, register)| (domain, register(weak.clone(), staleness)))
                .collect();
            RootStore { collections }
        });

        info!(
            "event=root_build module=store status=ok domain_count={}",
            root.collections.len()
        );
        Ok(root)
    }
}
