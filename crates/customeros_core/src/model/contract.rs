//! Contract record.

use crate::model::common::{EntityRef, Metadata, User};
use crate::model::{BatchQuery, DomainName, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const CONTRACT_SELECTION: &str = "
    metadata { id created lastUpdated source }
    contractName
    contractStatus
    serviceStarted
    contractSigned
    contractEnded
    committedPeriodInMonths
    autoRenew
    currency
    owner { id firstName lastName name }
    organization { metadata { id } name }
    billingDetails { billingCycleInMonths invoicingStarted nextInvoicing }
";

static CONTRACTS_BY_IDS: Lazy<String> = Lazy::new(|| {
    format!(
        "query getContractsByIds($ids: [ID!]!) {{ contracts_ByIds(ids: $ids) {{ {CONTRACT_SELECTION} }} }}"
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Draft,
    Live,
    Ended,
    OutOfContract,
    Scheduled,
    #[serde(other)]
    Undefined,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Live => "LIVE",
            Self::Ended => "ENDED",
            Self::OutOfContract => "OUT_OF_CONTRACT",
            Self::Scheduled => "SCHEDULED",
            Self::Undefined => "UNDEFINED",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingDetails {
    pub billing_cycle_in_months: Option<i64>,
    pub invoicing_started: Option<String>,
    pub next_invoicing: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contract {
    pub metadata: Metadata,
    pub contract_name: String,
    pub contract_status: Option<ContractStatus>,
    pub service_started: Option<String>,
    pub contract_signed: Option<String>,
    /// Set once the contract has ended; drives derived invoice status.
    pub contract_ended: Option<String>,
    pub committed_period_in_months: Option<i64>,
    pub auto_renew: bool,
    pub currency: Option<String>,
    pub owner: Option<User>,
    pub organization: Option<EntityRef>,
    pub billing_details: Option<BillingDetails>,
}

impl Contract {
    pub fn has_ended(&self) -> bool {
        self.contract_ended
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization.as_ref().map(EntityRef::id)
    }

    pub fn billing_cycle_in_months(&self) -> Option<i64> {
        self.billing_details
            .as_ref()
            .and_then(|details| details.billing_cycle_in_months)
    }
}

impl Record for Contract {
    const DOMAIN: DomainName = DomainName::Contracts;

    fn batch_query() -> BatchQuery {
        BatchQuery {
            document: CONTRACTS_BY_IDS.as_str(),
            field: "contracts_ByIds",
        }
    }

    fn id(&self) -> &str {
        &self.metadata.id
    }

    fn set_id(&mut self, id: &str) {
        self.metadata.id = id.to_string();
    }
}
