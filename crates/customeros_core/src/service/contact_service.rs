//! Contact use-case service.

use crate::error::{StoreError, StoreResult};
use crate::model::common::EntityRef;
use crate::model::contact::{Contact, OrganizationPage, CONTACT_SELECTION};
use crate::service::support::{
    bootstrap_paged, optimistic_create, optimistic_remove, optimistic_update, pagination,
    refresh_after_mutation, take_field, IdPayload, Page, Paging,
};
use crate::store::collection::DomainCollection;
use crate::store::entity::EntityStore;
use crate::store::root::RootStore;
use crate::transport::Transport;
use log::info;
use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;

static CONTACTS_QUERY: Lazy<String> = Lazy::new(|| {
    format!(
        "query getContacts($pagination: Pagination!) {{ contacts(pagination: $pagination) {{ content {{ {CONTACT_SELECTION} }} totalElements }} }}"
    )
});

const UPDATE_CONTACT_MUTATION: &str =
    "mutation updateContact($input: ContactUpdateInput!) { contact_Update(input: $input) { id } }";
const CREATE_CONTACT_MUTATION: &str = "mutation createContactForOrganization($organizationId: ID!, $input: ContactInput!) { contact_CreateForOrganization(organizationId: $organizationId, input: $input) { id } }";
const ARCHIVE_CONTACTS_MUTATION: &str = "mutation archiveContacts($contactIds: [ID!]!) { contact_ArchiveBulk(contactIds: $contactIds) { result } }";

/// Name fields accepted by `create_contact`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInput {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Contact service over one transport and root store.
pub struct ContactService {
    transport: Arc<dyn Transport>,
    root: Arc<RootStore>,
    paging: Paging,
}

impl ContactService {
    pub fn new(transport: Arc<dyn Transport>, root: Arc<RootStore>, paging: Paging) -> Self {
        Self {
            transport,
            root,
            paging,
        }
    }

    fn collection(&self) -> StoreResult<DomainCollection<Contact>> {
        self.root.contacts()
    }

    /// Pages every contact into the collection.
    pub async fn get_contacts(&self) -> StoreResult<Vec<EntityStore<Contact>>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        bootstrap_paged(&collection, self.paging, move |page, limit| {
            let transport = Arc::clone(&transport);
            async move {
                let data = transport
                    .request(
                        CONTACTS_QUERY.as_str(),
                        json!({ "pagination": pagination(page, limit) }),
                    )
                    .await?;
                take_field::<Page<Contact>>(data, "contacts")
            }
        })
        .await
    }

    /// Edits name fields optimistically.
    pub async fn update_contact(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Contact),
    ) -> StoreResult<EntityStore<Contact>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        optimistic_update(&collection, id, edit, move |value| async move {
            let data = transport
                .request(
                    UPDATE_CONTACT_MUTATION,
                    json!({
                        "input": {
                            "id": value.id,
                            "patch": true,
                            "name": value.name,
                            "firstName": value.first_name,
                            "lastName": value.last_name,
                        }
                    }),
                )
                .await?;
            let confirmed: IdPayload = take_field(data, "contact_Update")?;
            if confirmed.id != value.id {
                return Err(StoreError::Decode(format!(
                    "update answered for `{}` instead of `{}`",
                    confirmed.id, value.id
                )));
            }
            Ok::<_, StoreError>(None)
        })
        .await
    }

    /// Creates a contact attached to `organization_id`.
    ///
    /// The contact is visible under a temporary id until the server answers,
    /// then refetched so emails and organization names are filled in.
    pub async fn create_contact(
        &self,
        organization_id: &str,
        input: ContactInput,
    ) -> StoreResult<EntityStore<Contact>> {
        let organization_id = organization_id.trim().to_string();
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        let draft = Contact {
            name: input.name,
            first_name: input.first_name,
            last_name: input.last_name,
            organizations: OrganizationPage {
                content: vec![EntityRef::new(organization_id.clone())],
            },
            ..Contact::default()
        };
        let created = optimistic_create(&collection, draft, move |local| async move {
            let data = transport
                .request(
                    CREATE_CONTACT_MUTATION,
                    json!({
                        "organizationId": organization_id,
                        "input": {
                            "name": local.name,
                            "firstName": local.first_name,
                            "lastName": local.last_name,
                        }
                    }),
                )
                .await?;
            let payload: IdPayload = take_field(data, "contact_CreateForOrganization")?;
            let mut confirmed = local;
            confirmed.id = payload.id;
            Ok::<_, StoreError>(confirmed)
        })
        .await?;

        refresh_after_mutation(&collection, &[created.id()]).await;
        info!("event=contact_create module=service status=ok");
        Ok(created)
    }

    /// Archives contacts; they leave the collection immediately.
    pub async fn archive_contacts(&self, ids: &[String]) -> StoreResult<()> {
        let collection = self.collection()?;
        let request = self
            .transport
            .request(ARCHIVE_CONTACTS_MUTATION, json!({ "contactIds": ids }));
        optimistic_remove(&collection, ids, async move {
            request.await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
