//! Invoice use-case service.

use crate::error::StoreResult;
use crate::model::invoice::{Invoice, INVOICE_SELECTION};
use crate::service::support::{bootstrap_paged, pagination, take_field, Page, Paging};
use crate::store::entity::EntityStore;
use crate::store::root::RootStore;
use crate::transport::Transport;
use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;

static INVOICES_QUERY: Lazy<String> = Lazy::new(|| {
    format!(
        "query getInvoices($pagination: Pagination!) {{ invoices(pagination: $pagination) {{ content {{ {INVOICE_SELECTION} }} totalElements }} }}"
    )
});

/// Read-only invoice service.
pub struct InvoiceService {
    transport: Arc<dyn Transport>,
    root: Arc<RootStore>,
    paging: Paging,
}

impl InvoiceService {
    pub fn new(transport: Arc<dyn Transport>, root: Arc<RootStore>, paging: Paging) -> Self {
        Self {
            transport,
            root,
            paging,
        }
    }

    /// Pages every invoice into the collection.
    pub async fn get_invoices(&self) -> StoreResult<Vec<EntityStore<Invoice>>> {
        let collection = self.root.invoices()?;
        let transport = Arc::clone(&self.transport);
        bootstrap_paged(&collection, self.paging, move |page, limit| {
            let transport = Arc::clone(&transport);
            async move {
                let data = transport
                    .request(
                        INVOICES_QUERY.as_str(),
                        json!({ "pagination": pagination(page, limit) }),
                    )
                    .await?;
                take_field::<Page<Invoice>>(data, "invoices")
            }
        })
        .await
    }
}
