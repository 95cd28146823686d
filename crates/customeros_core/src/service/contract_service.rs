//! Contract use-case service.
//!
//! # Responsibility
//! - Bootstrap the contracts collection.
//! - Create, edit and delete contracts optimistically, keeping the parent
//!   organization's contract list in step.
//!
//! # Invariants
//! - A created contract is visible under a temporary id until the server
//!   assigns one; the same instance then moves to the server id.
//! - A failed create or delete undoes both the contract change and the
//!   parent organization link.

use crate::error::{GraphQlMessage, StoreError, StoreResult};
use crate::model::common::EntityRef;
use crate::model::contract::{BillingDetails, Contract, ContractStatus, CONTRACT_SELECTION};
use crate::model::organization::Organization;
use crate::service::support::{
    bootstrap_paged, optimistic_create, optimistic_remove, optimistic_update, pagination,
    take_field, MetadataPayload, Page, Paging,
};
use crate::store::collection::DomainCollection;
use crate::store::entity::EntityStore;
use crate::store::root::RootStore;
use crate::store::status::EntityStatus;
use crate::transport::Transport;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

static CONTRACTS_QUERY: Lazy<String> = Lazy::new(|| {
    format!(
        "query getContracts($pagination: Pagination!) {{ contracts(pagination: $pagination) {{ content {{ {CONTRACT_SELECTION} }} totalElements }} }}"
    )
});

const CREATE_CONTRACT_MUTATION: &str = "mutation createContract($input: ContractInput!) { contract_Create(input: $input) { metadata { id } } }";
const UPDATE_CONTRACT_MUTATION: &str = "mutation updateContract($input: ContractUpdateInput!) { contract_Update(input: $input) { metadata { id } } }";
const DELETE_CONTRACT_MUTATION: &str =
    "mutation deleteContract($id: ID!) { contract_Delete(id: $id) { accepted completed } }";

/// Fields accepted when creating a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInput {
    pub organization_id: String,
    pub contract_name: String,
    pub currency: Option<String>,
    pub committed_period_in_months: Option<i64>,
    pub service_started: Option<String>,
    pub billing_cycle_in_months: Option<i64>,
}

impl ContractInput {
    fn into_contract(self) -> Contract {
        Contract {
            contract_name: self.contract_name,
            contract_status: Some(ContractStatus::Draft),
            currency: self.currency,
            committed_period_in_months: self.committed_period_in_months,
            service_started: self.service_started,
            organization: Some(EntityRef::new(self.organization_id)),
            billing_details: self
                .billing_cycle_in_months
                .map(|months| BillingDetails {
                    billing_cycle_in_months: Some(months),
                    ..BillingDetails::default()
                }),
            ..Contract::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeletePayload {
    #[serde(default)]
    accepted: bool,
}

/// Contract service over one transport and root store.
pub struct ContractService {
    transport: Arc<dyn Transport>,
    root: Arc<RootStore>,
    paging: Paging,
}

impl ContractService {
    pub fn new(transport: Arc<dyn Transport>, root: Arc<RootStore>, paging: Paging) -> Self {
        Self {
            transport,
            root,
            paging,
        }
    }

    fn collection(&self) -> StoreResult<DomainCollection<Contract>> {
        self.root.contracts()
    }

    /// Loaded parent organization, if the organizations domain is registered.
    fn parent(&self, organization_id: &str) -> Option<EntityStore<Organization>> {
        let organization = self.root.organizations().ok()?.peek(organization_id)?;
        organization
            .status()
            .has_value()
            .then_some(organization)
    }

    /// Pages every contract into the collection.
    pub async fn get_contracts(&self) -> StoreResult<Vec<EntityStore<Contract>>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        bootstrap_paged(&collection, self.paging, move |page, limit| {
            let transport = Arc::clone(&transport);
            async move {
                let data = transport
                    .request(
                        CONTRACTS_QUERY.as_str(),
                        json!({ "pagination": pagination(page, limit) }),
                    )
                    .await?;
                take_field::<Page<Contract>>(data, "contracts")
            }
        })
        .await
    }

    /// Creates a contract and links it into its organization.
    ///
    /// The contract and the link are visible before the server answers.
    pub async fn create_contract(&self, input: ContractInput) -> StoreResult<EntityStore<Contract>> {
        let collection = self.collection()?;
        let parent = self.parent(&input.organization_id);
        let organization_id = input.organization_id.clone();
        let transport = Arc::clone(&self.transport);

        let link_target = parent.clone();
        let created = optimistic_create(&collection, input.into_contract(), move |local| async move {
            let temp_id = local.metadata.id.clone();
            let link_base = link_target
                .as_ref()
                .and_then(|organization| link_contract(organization, &temp_id));

            let response = transport
                .request(
                    CREATE_CONTRACT_MUTATION,
                    json!({
                        "input": {
                            "organizationId": organization_id,
                            "contractName": local.contract_name,
                            "currency": local.currency,
                            "committedPeriodInMonths": local.committed_period_in_months,
                            "serviceStarted": local.service_started,
                            "billingCycleInMonths": local.billing_cycle_in_months(),
                        }
                    }),
                )
                .await
                .and_then(|data| take_field::<MetadataPayload>(data, "contract_Create"));

            match response {
                Ok(payload) => {
                    let mut confirmed = local;
                    confirmed.metadata.id = payload.metadata.id;
                    if let (Some(organization), Some(base)) = (link_target.as_ref(), link_base) {
                        let server_id = confirmed.metadata.id.clone();
                        let relinked = organization.update(|value| {
                            for contract in value.contracts.iter_mut() {
                                if contract.metadata.id == temp_id {
                                    contract.metadata.id = server_id.clone();
                                }
                            }
                        });
                        let linked = relinked
                            .and_then(|_| organization.reconcile(base, organization.value()));
                        if let Err(err) = linked {
                            warn!(
                                "event=contract_link module=service status=error error_code={}",
                                err.code()
                            );
                            organization.invalidate();
                        }
                    }
                    Ok(confirmed)
                }
                Err(err) => {
                    if let Some(organization) = link_target.as_ref().filter(|_| link_base.is_some()) {
                        if organization.is_dirty() {
                            if let Err(err) = organization.rollback() {
                                warn!(
                                    "event=contract_unlink module=service status=error error_code={}",
                                    err.code()
                                );
                            }
                        }
                    }
                    Err(err)
                }
            }
        })
        .await;

        if let Some(organization) = parent.as_ref() {
            if organization.status() == EntityStatus::Unloaded {
                self.refetch_organization(organization).await;
            }
        }
        if created.is_ok() {
            info!(
                "event=contract_create module=service status=ok linked={}",
                parent.is_some()
            );
        }
        created
    }

    /// Edits contract fields optimistically.
    pub async fn update_contract(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Contract),
    ) -> StoreResult<EntityStore<Contract>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        optimistic_update(&collection, id, edit, move |value| async move {
            let data = transport
                .request(
                    UPDATE_CONTRACT_MUTATION,
                    json!({
                        "input": {
                            "contractId": value.metadata.id,
                            "patch": true,
                            "contractName": value.contract_name,
                            "currency": value.currency,
                            "committedPeriodInMonths": value.committed_period_in_months,
                            "autoRenew": value.auto_renew,
                            "serviceStarted": value.service_started,
                            "contractEnded": value.contract_ended,
                            "billingDetails": {
                                "billingCycleInMonths": value.billing_cycle_in_months(),
                            },
                        }
                    }),
                )
                .await?;
            take_field::<MetadataPayload>(data, "contract_Update")?;
            Ok::<_, StoreError>(None)
        })
        .await
    }

    /// Deletes a contract and unlinks it from its organization.
    pub async fn delete_contract(&self, id: &str, organization_id: &str) -> StoreResult<()> {
        let collection = self.collection()?;
        let parent = self.parent(organization_id);
        let unlink_base = parent.as_ref().and_then(|organization| {
            organization
                .update(|value| value.contracts.retain(|contract| contract.id() != id))
                .ok()
        });

        let request = self
            .transport
            .request(DELETE_CONTRACT_MUTATION, json!({ "id": id }));
        let ids = [id.to_string()];
        let result = optimistic_remove(&collection, &ids, async move {
            let data = request.await?;
            let payload: DeletePayload = take_field(data, "contract_Delete")?;
            if !payload.accepted {
                return Err(StoreError::GraphQl(vec![GraphQlMessage::new(
                    "contract deletion was not accepted",
                )]));
            }
            Ok::<_, StoreError>(())
        })
        .await;

        if let (Some(organization), Some(base)) = (parent.as_ref(), unlink_base) {
            match &result {
                Ok(()) => {
                    if organization.reconcile(base, organization.value()).is_err() {
                        self.refetch_organization(organization).await;
                    }
                }
                Err(_) => {
                    if organization.is_dirty() {
                        organization.rollback()?;
                    }
                }
            }
        }
        result
    }

    async fn refetch_organization(&self, organization: &EntityStore<Organization>) {
        let Ok(organizations) = self.root.organizations() else {
            return;
        };
        let id = organization.id();
        organizations.invalidate(Some(&id));
        if let Err(err) = organizations.load([id.as_str()]).await {
            warn!(
                "event=organization_refetch module=service status=error error_code={}",
                err.code()
            );
        }
    }
}

/// Appends a contract reference to a loaded organization; returns the
/// version the edit is based on.
fn link_contract(organization: &EntityStore<Organization>, contract_id: &str) -> Option<u64> {
    organization
        .update(|value| value.contracts.push(EntityRef::new(contract_id)))
        .ok()
}
