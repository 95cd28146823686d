//! Flow and flow-sequence records.

use crate::model::common::{EntityRef, Metadata};
use crate::model::{BatchQuery, DomainName, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const FLOW_SELECTION: &str = "
    metadata { id created lastUpdated source }
    name
    description
    status
";

pub const FLOW_SEQUENCE_SELECTION: &str = "
    metadata { id created lastUpdated source }
    name
    description
    status
    flow { metadata { id } name }
";

static FLOWS_BY_IDS: Lazy<String> = Lazy::new(|| {
    format!("query getFlowsByIds($ids: [ID!]!) {{ flows_ByIds(ids: $ids) {{ {FLOW_SELECTION} }} }}")
});

static FLOW_SEQUENCES_BY_IDS: Lazy<String> = Lazy::new(|| {
    format!(
        "query getFlowSequencesByIds($ids: [ID!]!) {{ flowSequences_ByIds(ids: $ids) {{ {FLOW_SEQUENCE_SELECTION} }} }}"
    )
});

/// Lifecycle state shared by flows and their sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowStatus {
    #[default]
    Inactive,
    Active,
    Paused,
    Archived,
}

impl FlowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Archived => "ARCHIVED",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Flow {
    pub metadata: Metadata,
    pub name: String,
    pub description: Option<String>,
    pub status: FlowStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowSequence {
    pub metadata: Metadata,
    pub name: String,
    pub description: Option<String>,
    pub status: FlowStatus,
    pub flow: Option<EntityRef>,
}

impl FlowSequence {
    pub fn flow_id(&self) -> Option<&str> {
        self.flow.as_ref().map(EntityRef::id)
    }
}

impl Record for Flow {
    const DOMAIN: DomainName = DomainName::Flows;

    fn batch_query() -> BatchQuery {
        BatchQuery {
            document: FLOWS_BY_IDS.as_str(),
            field: "flows_ByIds",
        }
    }

    fn id(&self) -> &str {
        &self.metadata.id
    }

    fn set_id(&mut self, id: &str) {
        self.metadata.id = id.to_string();
    }
}

impl Record for FlowSequence {
    const DOMAIN: DomainName = DomainName::FlowSequences;

    fn batch_query() -> BatchQuery {
        BatchQuery {
            document: FLOW_SEQUENCES_BY_IDS.as_str(),
            field: "flowSequences_ByIds",
        }
    }

    fn id(&self) -> &str {
        &self.metadata.id
    }

    fn set_id(&mut self, id: &str) {
        self.metadata.id = id.to_string();
    }
}
