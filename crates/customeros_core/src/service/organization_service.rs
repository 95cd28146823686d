//! Organization use-case service.
//!
//! # Responsibility
//! - Bootstrap the organizations collection from the paged dashboard query.
//! - Create and merge organizations; apply owner, profile, stage and
//!   visibility changes optimistically.
//!
//! # Invariants
//! - Every successful response is written through the collection.
//! - Hidden or merged-away organizations leave the collection; a failed
//!   request restores the same instances.

use crate::error::{StoreError, StoreResult};
use crate::model::common::User;
use crate::model::organization::{
    Organization, OrganizationRelationship, OrganizationStage, ORGANIZATION_SELECTION,
};
use crate::service::support::{
    bootstrap_paged, load_one, optimistic_create, optimistic_remove, optimistic_update,
    pagination, refresh_after_mutation, take_field, IdPayload, MetadataPayload, Page, Paging,
};
use crate::store::collection::DomainCollection;
use crate::store::entity::EntityStore;
use crate::store::root::RootStore;
use crate::transport::Transport;
use futures::future::join_all;
use log::{debug, info};
use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;

static ORGANIZATIONS_QUERY: Lazy<String> = Lazy::new(|| {
    format!(
        "query getOrganizations($pagination: Pagination!, $sort: SortBy) {{ dashboardView_Organizations(pagination: $pagination, sort: $sort) {{ content {{ {ORGANIZATION_SELECTION} }} totalElements }} }}"
    )
});

const UPDATE_ORGANIZATION_MUTATION: &str = "mutation updateOrganization($input: OrganizationUpdateInput!) { organization_Update(input: $input) { metadata { id } } }";
const SET_OWNER_MUTATION: &str = "mutation setOrganizationOwner($organizationId: ID!, $userId: ID!) { organization_SetOwner(organizationId: $organizationId, userId: $userId) { id } }";
const UNSET_OWNER_MUTATION: &str = "mutation unsetOrganizationOwner($organizationId: ID!) { organization_UnsetOwner(organizationId: $organizationId) { id } }";
const HIDE_ORGANIZATIONS_MUTATION: &str =
    "mutation hideOrganizations($ids: [ID!]!) { organization_HideAll(ids: $ids) { result } }";
const CREATE_ORGANIZATION_MUTATION: &str = "mutation createOrganization($input: OrganizationInput!) { organization_Create(input: $input) { metadata { id } } }";
const MERGE_ORGANIZATIONS_MUTATION: &str = "mutation mergeOrganizations($primaryOrganizationId: ID!, $mergedOrganizationIds: [ID!]!) { organization_Merge(primaryOrganizationId: $primaryOrganizationId, mergedOrganizationIds: $mergedOrganizationIds) { id } }";

const DEFAULT_ORGANIZATION_NAME: &str = "Unnamed";

/// Fields accepted by `create_organization`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationInput {
    pub name: Option<String>,
    pub website: Option<String>,
    pub relationship: Option<OrganizationRelationship>,
    pub stage: Option<OrganizationStage>,
}

/// Organization service over one transport and root store.
pub struct OrganizationService {
    transport: Arc<dyn Transport>,
    root: Arc<RootStore>,
    paging: Paging,
}

impl OrganizationService {
    pub fn new(transport: Arc<dyn Transport>, root: Arc<RootStore>, paging: Paging) -> Self {
        Self {
            transport,
            root,
            paging,
        }
    }

    fn collection(&self) -> StoreResult<DomainCollection<Organization>> {
        self.root.organizations()
    }

    /// Pages every organization into the collection.
    ///
    /// Returns the handles written by this call, in server order.
    pub async fn get_organizations(&self) -> StoreResult<Vec<EntityStore<Organization>>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        bootstrap_paged(&collection, self.paging, move |page, limit| {
            let transport = Arc::clone(&transport);
            async move {
                let data = transport
                    .request(
                        ORGANIZATIONS_QUERY.as_str(),
                        json!({
                            "pagination": pagination(page, limit),
                            "sort": { "by": "LAST_TOUCHPOINT", "caseSensitive": false, "direction": "DESC" }
                        }),
                    )
                    .await?;
                take_field::<Page<Organization>>(data, "dashboardView_Organizations")
            }
        })
        .await
    }

    /// Loads one organization through the batch loader.
    pub async fn get_organization(&self, id: &str) -> StoreResult<EntityStore<Organization>> {
        load_one(&self.collection()?, id).await
    }

    /// Edits profile fields optimistically and sends them as a patch.
    pub async fn update_organization(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Organization),
    ) -> StoreResult<EntityStore<Organization>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        optimistic_update(&collection, id, edit, move |value| async move {
            transport
                .request(
                    UPDATE_ORGANIZATION_MUTATION,
                    json!({
                        "input": {
                            "id": value.metadata.id,
                            "patch": true,
                            "name": value.name,
                            "website": value.website,
                            "relationship": value.relationship.map(|r| r.as_str()),
                            "stage": value.stage.map(|s| s.as_str()),
                        }
                    }),
                )
                .await?;
            Ok::<_, StoreError>(None)
        })
        .await
    }

    /// Sets or clears the owner.
    pub async fn set_owner(
        &self,
        id: &str,
        owner: Option<User>,
    ) -> StoreResult<EntityStore<Organization>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        let owner_id = owner.as_ref().map(|user| user.id.clone());
        optimistic_update(
            &collection,
            id,
            move |value| value.owner = owner,
            move |value| async move {
                let data = match owner_id {
                    Some(user_id) => {
                        let data = transport
                            .request(
                                SET_OWNER_MUTATION,
                                json!({ "organizationId": value.metadata.id, "userId": user_id }),
                            )
                            .await?;
                        take_field::<IdPayload>(data, "organization_SetOwner")?
                    }
                    None => {
                        let data = transport
                            .request(
                                UNSET_OWNER_MUTATION,
                                json!({ "organizationId": value.metadata.id }),
                            )
                            .await?;
                        take_field::<IdPayload>(data, "organization_UnsetOwner")?
                    }
                };
                debug!(
                    "event=organization_owner module=service status=ok confirmed={}",
                    !data.id.is_empty()
                );
                Ok::<_, StoreError>(None)
            },
        )
        .await
    }

    /// Creates an organization; visible under a temporary id until the
    /// server assigns one, then refetched for server-filled fields.
    pub async fn create_organization(
        &self,
        input: OrganizationInput,
    ) -> StoreResult<EntityStore<Organization>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        let draft = Organization {
            name: input
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ORGANIZATION_NAME.to_string()),
            website: input.website,
            relationship: input.relationship,
            stage: input.stage,
            ..Organization::default()
        };
        let created = optimistic_create(&collection, draft, move |local| async move {
            let data = transport
                .request(
                    CREATE_ORGANIZATION_MUTATION,
                    json!({
                        "input": {
                            "name": local.name,
                            "website": local.website,
                            "relationship": local.relationship.map(|r| r.as_str()),
                            "stage": local.stage.map(|s| s.as_str()),
                        }
                    }),
                )
                .await?;
            let payload: MetadataPayload = take_field(data, "organization_Create")?;
            let mut confirmed = local;
            confirmed.metadata.id = payload.metadata.id;
            Ok::<_, StoreError>(confirmed)
        })
        .await?;

        refresh_after_mutation(&collection, &[created.id()]).await;
        info!("event=organization_create module=service status=ok");
        Ok(created)
    }

    /// Merges `merged_ids` into `primary_id`.
    ///
    /// Merged organizations leave the collection immediately and come back
    /// if the request fails; the primary is refetched on success.
    pub async fn merge_organizations(
        &self,
        primary_id: &str,
        merged_ids: &[String],
    ) -> StoreResult<()> {
        let merged: Vec<String> = merged_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && id != primary_id)
            .collect();
        if merged.is_empty() {
            return Ok(());
        }

        let collection = self.collection()?;
        let request = self.transport.request(
            MERGE_ORGANIZATIONS_MUTATION,
            json!({ "primaryOrganizationId": primary_id, "mergedOrganizationIds": &merged }),
        );
        optimistic_remove(&collection, &merged, async move {
            request.await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        refresh_after_mutation(&collection, &[primary_id.to_string()]).await;
        info!(
            "event=organization_merge module=service status=ok merged={}",
            merged.len()
        );
        Ok(())
    }

    /// Moves several organizations to `stage`, each as its own optimistic
    /// update.
    ///
    /// Every update runs to completion; the first failure is returned and
    /// only the failed organizations are rolled back.
    pub async fn update_stage(
        &self,
        ids: &[String],
        stage: OrganizationStage,
    ) -> StoreResult<Vec<EntityStore<Organization>>> {
        let updates = ids
            .iter()
            .map(|id| self.update_organization(id, move |value| value.stage = Some(stage)));
        join_all(updates).await.into_iter().collect()
    }

    /// Hides organizations; they leave the collection immediately.
    pub async fn hide_organizations(&self, ids: &[String]) -> StoreResult<()> {
        let collection = self.collection()?;
        let request = self
            .transport
            .request(HIDE_ORGANIZATIONS_MUTATION, json!({ "ids": ids }));
        optimistic_remove(&collection, ids, async move {
            request.await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
