//! Flow-sequence use-case service.

use crate::error::{StoreError, StoreResult};
use crate::model::common::EntityRef;
use crate::model::flow::{FlowSequence, FLOW_SEQUENCE_SELECTION};
use crate::service::support::{optimistic_create, optimistic_update, take_field};
use crate::store::collection::DomainCollection;
use crate::store::entity::EntityStore;
use crate::store::root::RootStore;
use crate::transport::Transport;
use log::info;
use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;

static SEQUENCES_QUERY: Lazy<String> = Lazy::new(|| {
    format!(
        "query getFlowSequences($flowId: ID!) {{ sequences: flowSequences(flowId: $flowId) {{ {FLOW_SEQUENCE_SELECTION} }} }}"
    )
});

static CREATE_SEQUENCE_MUTATION: Lazy<String> = Lazy::new(|| {
    format!(
        "mutation flowSequenceCreate($input: FlowSequenceCreateInput!) {{ flow_sequence_Create(input: $input) {{ {FLOW_SEQUENCE_SELECTION} }} }}"
    )
});

static UPDATE_SEQUENCE_MUTATION: Lazy<String> = Lazy::new(|| {
    format!(
        "mutation flowSequenceUpdate($input: FlowSequenceUpdateInput!) {{ flow_sequence_Update(input: $input) {{ {FLOW_SEQUENCE_SELECTION} }} }}"
    )
});

/// Fields accepted when creating a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowSequenceInput {
    pub flow_id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Flow-sequence service over one transport and root store.
pub struct FlowSequenceService {
    transport: Arc<dyn Transport>,
    root: Arc<RootStore>,
}

impl FlowSequenceService {
    pub fn new(transport: Arc<dyn Transport>, root: Arc<RootStore>) -> Self {
        Self { transport, root }
    }

    fn collection(&self) -> StoreResult<DomainCollection<FlowSequence>> {
        self.root.flow_sequences()
    }

    /// Fetches the sequences of one flow into the collection.
    pub async fn get_sequences(&self, flow_id: &str) -> StoreResult<Vec<EntityStore<FlowSequence>>> {
        let collection = self.collection()?;
        let data = self
            .transport
            .request(SEQUENCES_QUERY.as_str(), json!({ "flowId": flow_id }))
            .await?;
        let sequences: Vec<FlowSequence> = take_field(data, "sequences")?;
        let handles = collection.upsert(sequences);
        info!(
            "event=flow_sequence_list module=service status=ok count={}",
            handles.len()
        );
        Ok(handles)
    }

    /// Creates a sequence under a flow; visible before the server answers.
    pub async fn create_sequence(
        &self,
        input: FlowSequenceInput,
    ) -> StoreResult<EntityStore<FlowSequence>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        let draft = FlowSequence {
            name: input.name,
            description: input.description,
            flow: Some(EntityRef::new(input.flow_id)),
            ..FlowSequence::default()
        };
        optimistic_create(&collection, draft, move |sequence| async move {
            let data = transport
                .request(
                    CREATE_SEQUENCE_MUTATION.as_str(),
                    json!({
                        "input": {
                            "flowId": sequence.flow_id(),
                            "name": sequence.name,
                            "description": sequence.description,
                        }
                    }),
                )
                .await?;
            take_field::<FlowSequence>(data, "flow_sequence_Create")
        })
        .await
    }

    /// Edits a sequence optimistically.
    pub async fn update_sequence(
        &self,
        id: &str,
        edit: impl FnOnce(&mut FlowSequence),
    ) -> StoreResult<EntityStore<FlowSequence>> {
        let collection = self.collection()?;
        let transport = Arc::clone(&self.transport);
        optimistic_update(&collection, id, edit, move |sequence| async move {
            let data = transport
                .request(
                    UPDATE_SEQUENCE_MUTATION.as_str(),
                    json!({
                        "input": {
                            "id": sequence.metadata.id,
                            "name": sequence.name,
                            "description": sequence.description,
                            "status": sequence.status.as_str(),
                        }
                    }),
                )
                .await?;
            let updated: FlowSequence = take_field(data, "flow_sequence_Update")?;
            Ok::<_, StoreError>(Some(updated))
        })
        .await
    }
}
