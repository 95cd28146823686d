//! Contract table columns and filters.

use crate::model::contract::Contract;
use crate::table::{number_items, string_items, ColumnAccess, ColumnFilters, FilterAdapter, FilterValue, Row};
use serde_json::{json, Value};

pub const NAME: &str = "contract_name";
pub const STATUS: &str = "contract_status";
pub const RENEWAL_CYCLE: &str = "renewal_cycle";

impl ColumnAccess for Contract {
    fn column_value(&self, column_id: &str) -> Option<Value> {
        match column_id {
            NAME => Some(json!(self.contract_name)),
            STATUS => self.contract_status.map(|status| json!(status.as_str())),
            RENEWAL_CYCLE => self.committed_period_in_months.map(|months| json!(months)),
            _ => None,
        }
    }
}

/// Filter value: list of contract status names.
pub struct ContractStatusFilter;

impl FilterAdapter<Contract> for ContractStatusFilter {
    fn filter(&self, row: &Row<Contract>, _column_id: &str, value: &FilterValue) -> bool {
        let wanted = string_items(value);
        row.original().read(|contract| {
            contract
                .contract_status
                .is_some_and(|status| wanted.iter().any(|w| w == status.as_str()))
        })
    }
}

/// Filter value: list of committed periods in months.
pub struct RenewalCycleFilter;

impl FilterAdapter<Contract> for RenewalCycleFilter {
    fn filter(&self, row: &Row<Contract>, _column_id: &str, value: &FilterValue) -> bool {
        let cycles = number_items(value);
        row.original().read(|contract| {
            contract
                .committed_period_in_months
                .is_some_and(|months| cycles.contains(&months))
        })
    }
}

pub fn contract_filters() -> ColumnFilters<Contract> {
    ColumnFilters::new()
        .with(STATUS, ContractStatusFilter)
        .with(RENEWAL_CYCLE, RenewalCycleFilter)
}
