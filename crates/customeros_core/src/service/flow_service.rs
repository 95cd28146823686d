//! Flow use-case service.
//!
//! # Responsibility
//! - List, fetch, merge and change the status of flows.
//!
//! # Invariants
//! - Every flow returned by the server is also written to the flows
//!   collection, so callers may ignore return values and read the cache.
//! - Status changes are optimistic and reconciled against the server copy.

use crate::error::{StoreError, StoreResult};
use crate::model::flow::{Flow, FlowStatus, FLOW_SELECTION};
use crate::service::support::{load_one, optimistic_create, optimistic_update, take_field};
use crate::store::collection::DomainCollection;
use crate::store::entity::EntityStore;
use crate::store::root::RootStore;
use crate::transport::{send_as, Transport};
use log::info;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

static FLOWS_QUERY: Lazy<String> =
    Lazy::new(|| format!("query getFlows {{ flows {{ {FLOW_SELECTION} }} }}"));

static MERGE_FLOW_MUTATION: Lazy<String> = Lazy::new(|| {
    format!(
        "mutation flowMerge($input: FlowMergeInput!) {{ flow_Merge(input: $input) {{ {FLOW_SELECTION} }} }}"
    )
});

static CHANGE_STATUS_MUTATION: Lazy<String> = Lazy::new(|| {
    format!(
        "mutation flowChangeStatus($id: ID!, $status: FlowStatus!) {{ flow_ChangeStatus(id: $id, status: $status) {{ {FLOW_SELECTION} }} }}"
    )
});

#[derive(Deserialize)]
struct ChangeStatusData {
    #[serde(rename = "flow_ChangeStatus")]
    flow: Flow,
}

/// Fields accepted by `merge_flow`; a missing id creates a new flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowInput {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

/// Flow service over one transport and root store.
pub struct FlowService {
    transport: Arc<dyn Transport>,
    root: Arc<RootStore>,
}

impl FlowService {
    pub fn new(transport: Arc<dyn Transport>, root: Arc<RootStore>) -> Self {
        Self { transport, root }
    }

    fn collection(&self) -> StoreResult<DomainCollection<Flow>> {
        self.root.flows()
    }

    /// Fetches every flow and writes them into the collection.
    pub async fn get_flows(&self) -> StoreResult<Vec<EntityStore<Flow>>> {
        let collection = self.collection()?;
        let started_at = Instant::now();
        let data = self
            .transport
            .request(FLOWS_QUERY.as_str(), json!({}))
            .await
            .inspect_err(|err| collection.record_error(err))?;
        let flows: Vec<Flow> = take_field(data, "flows")?;
        let total = flows.len() as u64;
        let handles = collection.upsert(flows);
        collection.record_page(total);

        info!(
            "event=flow_list module=service status=ok count={} duration_ms={}",
            handles.len(),
            started_at.elapsed().as_millis()
        );
        Ok(handles)
    }

    pub async fn get_flow(&self, id: &str) -> StoreResult<EntityStore<Flow>> {
        load_one(&self.collection()?, id).await
    }

    /// Creates a flow, or renames/redescribes an existing one.
    pub async fn merge_flow(&self, input: FlowInput) -> StoreResult<EntityStore<Flow>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);

        match input.id.clone() {
            Some(id) => {
                let FlowInput {
                    name, description, ..
                } = input;
                optimistic_update(
                    &collection,
                    &id,
                    move |flow| {
                        flow.name = name;
                        flow.description = description;
                    },
                    move |flow| async move {
                        let merged = send_merge(transport.as_ref(), &flow).await?;
                        Ok::<_, StoreError>(Some(merged))
                    },
                )
                .await
            }
            None => {
                let draft = Flow {
                    name: input.name,
                    description: input.description,
                    ..Flow::default()
                };
                optimistic_create(&collection, draft, move |flow| async move {
                    send_merge_new(transport.as_ref(), &flow).await
                })
                .await
            }
        }
    }

    /// Moves a flow to `status` optimistically.
    pub async fn change_status(&self, id: &str, status: FlowStatus) -> StoreResult<EntityStore<Flow>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        optimistic_update(
            &collection,
            id,
            move |flow| flow.status = status,
            move |flow| async move {
                let data: ChangeStatusData = send_as(
                    transport.as_ref(),
                    CHANGE_STATUS_MUTATION.as_str(),
                    json!({ "id": flow.metadata.id, "status": status.as_str() }),
                )
                .await?;
                Ok::<_, StoreError>(Some(data.flow))
            },
        )
        .await
    }
}

async fn send_merge(transport: &dyn Transport, flow: &Flow) -> StoreResult<Flow> {
    let data = transport
        .request(
            MERGE_FLOW_MUTATION.as_str(),
            json!({
                "input": {
                    "id": flow.metadata.id,
                    "name": flow.name,
                    "description": flow.description,
                }
            }),
        )
        .await?;
    take_field(data, "flow_Merge")
}

/// Same mutation without an id, so the server assigns one.
async fn send_merge_new(transport: &dyn Transport, flow: &Flow) -> StoreResult<Flow> {
    let data = transport
        .request(
            MERGE_FLOW_MUTATION.as_str(),
            json!({
                "input": {
                    "name": flow.name,
                    "description": flow.description,
                }
            }),
        )
        .await?;
    take_field(data, "flow_Merge")
}
