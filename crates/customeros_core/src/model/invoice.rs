//! Invoice record.

use crate::model::common::{EntityRef, Metadata, RefMetadata};
use crate::model::{BatchQuery, DomainName, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const INVOICE_SELECTION: &str = "
    metadata { id created lastUpdated source }
    invoiceNumber
    status
    issued
    due
    amountDue
    currency
    paid
    contract { metadata { id } contractEnded }
    organization { metadata { id } name }
";

static INVOICES_BY_IDS: Lazy<String> = Lazy::new(|| {
    format!(
        "query getInvoicesByIds($ids: [ID!]!) {{ invoices_ByIds(ids: $ids) {{ {INVOICE_SELECTION} }} }}"
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Initialized,
    Due,
    Overdue,
    Paid,
    Void,
    Scheduled,
    OnHold,
    Empty,
    #[serde(other)]
    Unknown,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "INITIALIZED",
            Self::Due => "DUE",
            Self::Overdue => "OVERDUE",
            Self::Paid => "PAID",
            Self::Void => "VOID",
            Self::Scheduled => "SCHEDULED",
            Self::OnHold => "ON_HOLD",
            Self::Empty => "EMPTY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Contract summary embedded in an invoice payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceContract {
    pub metadata: RefMetadata,
    pub contract_ended: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    pub metadata: Metadata,
    pub invoice_number: String,
    pub status: Option<InvoiceStatus>,
    pub issued: Option<String>,
    pub due: Option<String>,
    pub amount_due: f64,
    pub currency: Option<String>,
    pub paid: bool,
    pub contract: InvoiceContract,
    pub organization: Option<EntityRef>,
}

impl Invoice {
    pub fn contract_id(&self) -> Option<&str> {
        let id = self.contract.metadata.id.as_str();
        (!id.is_empty()).then_some(id)
    }
}

impl Record for Invoice {
    const DOMAIN: DomainName = DomainName::Invoices;

    fn batch_query() -> BatchQuery {
        BatchQuery {
            document: INVOICES_BY_IDS.as_str(),
            field: "invoices_ByIds",
        }
    }

    fn id(&self) -> &str {
        &self.metadata.id
    }

    fn set_id(&mut self, id: &str) {
        self.metadata.id = id.to_string();
    }
}
