//! Invoice table columns and filters.
//!
//! `ON_HOLD` and `SCHEDULED` are not stored statuses: an invoice is on hold
//! when its contract has ended and scheduled otherwise. The contract is read
//! from the contracts collection first and from the summary embedded in the
//! invoice when the contract is not cached.

use crate::model::contract::Contract;
use crate::model::invoice::Invoice;
use crate::store::entity::EntityStore;
use crate::table::{
    date_filter, date_part, number_items, string_items, ColumnAccess, ColumnFilters,
    FilterAdapter, FilterValue, Row,
};
use serde_json::{json, Value};

pub const INVOICE_NUMBER: &str = "invoice_number";
pub const INVOICE_STATUS: &str = "invoice_status";
pub const PAYMENT_STATUS: &str = "payment_status";
pub const BILLING_CYCLE: &str = "billing_cycle";
pub const ISSUE_DATE: &str = "issue_date";

const ON_HOLD: &str = "ON_HOLD";
const SCHEDULED: &str = "SCHEDULED";

impl ColumnAccess for Invoice {
    fn column_value(&self, column_id: &str) -> Option<Value> {
        match column_id {
            INVOICE_NUMBER => Some(json!(self.invoice_number)),
            PAYMENT_STATUS => self.status.map(|status| json!(status.as_str())),
            ISSUE_DATE => self.issued.as_ref().map(|issued| json!(issued)),
            _ => None,
        }
    }
}

fn cached_contract(row: &Row<Invoice>) -> Option<EntityStore<Contract>> {
    row.root()?.contract_of_invoice(row.original())
}

/// Whether the invoice's contract has ended.
pub fn is_out_of_contract(row: &Row<Invoice>) -> bool {
    match cached_contract(row).filter(|contract| contract.status().has_value()) {
        Some(contract) => contract.read(Contract::has_ended),
        None => row.original().read(|invoice| {
            invoice
                .contract
                .contract_ended
                .as_deref()
                .is_some_and(|ended| !ended.trim().is_empty())
        }),
    }
}

/// Filter value: list of `ON_HOLD` / `SCHEDULED` or stored status names.
pub struct InvoiceStatusFilter;

impl FilterAdapter<Invoice> for InvoiceStatusFilter {
    fn filter(&self, row: &Row<Invoice>, _column_id: &str, value: &FilterValue) -> bool {
        let wanted = string_items(value);
        let out_of_contract = is_out_of_contract(row);
        let stored = row.original().read(|invoice| invoice.status);
        wanted.iter().any(|status| match status.as_str() {
            ON_HOLD => out_of_contract,
            SCHEDULED => !out_of_contract,
            other => stored.is_some_and(|s| s.as_str() == other),
        })
    }
}

/// Filter value: list of stored status names.
pub struct PaymentStatusFilter;

impl FilterAdapter<Invoice> for PaymentStatusFilter {
    fn filter(&self, row: &Row<Invoice>, _column_id: &str, value: &FilterValue) -> bool {
        let wanted = string_items(value);
        row.original().read(|invoice| {
            invoice
                .status
                .is_some_and(|status| wanted.iter().any(|w| w == status.as_str()))
        })
    }
}

/// Filter value: list of billing cycles in months, read from the contract.
pub struct BillingCycleFilter;

impl FilterAdapter<Invoice> for BillingCycleFilter {
    fn filter(&self, row: &Row<Invoice>, _column_id: &str, value: &FilterValue) -> bool {
        let cycles = number_items(value);
        cached_contract(row)
            .and_then(|contract| contract.read(Contract::billing_cycle_in_months))
            .is_some_and(|months| cycles.contains(&months))
    }
}

/// Filter value: a date; matches invoices issued on or after it.
pub struct IssueDateFilter;

impl FilterAdapter<Invoice> for IssueDateFilter {
    fn filter(&self, row: &Row<Invoice>, _column_id: &str, value: &FilterValue) -> bool {
        let Some(since) = date_filter(value) else {
            return false;
        };
        row.original().read(|invoice| {
            invoice
                .issued
                .as_deref()
                .and_then(date_part)
                .is_some_and(|issued| issued >= since)
        })
    }
}

pub fn invoice_filters() -> ColumnFilters<Invoice> {
    ColumnFilters::new()
        .with(INVOICE_STATUS, InvoiceStatusFilter)
        .with(PAYMENT_STATUS, PaymentStatusFilter)
        .with(BILLING_CYCLE, BillingCycleFilter)
        .with(ISSUE_DATE, IssueDateFilter)
}
