//! Contact table columns and filters.

use crate::model::contact::Contact;
use crate::table::{
    contains_text, string_items, text_value, ColumnAccess, ColumnFilters, FilterAdapter,
    FilterValue, Row,
};
use serde_json::{json, Value};

pub const NAME: &str = "contact_name";
pub const ORGANIZATION_STAGE: &str = "organization_stage";

impl ColumnAccess for Contact {
    fn column_value(&self, column_id: &str) -> Option<Value> {
        match column_id {
            NAME => Some(json!(self.display_name())),
            _ => None,
        }
    }
}

pub struct ContactNameFilter;

impl FilterAdapter<Contact> for ContactNameFilter {
    fn filter(&self, row: &Row<Contact>, _column_id: &str, value: &FilterValue) -> bool {
        let Some(needle) = text_value(value) else {
            return true;
        };
        row.original()
            .read(|contact| contains_text(&contact.display_name(), &needle))
    }
}

/// Matches contacts working for at least one cached organization in one of
/// the listed stages.
pub struct OrganizationStageFilter;

impl FilterAdapter<Contact> for OrganizationStageFilter {
    fn filter(&self, row: &Row<Contact>, _column_id: &str, value: &FilterValue) -> bool {
        let wanted = string_items(value);
        let Some(root) = row.root() else {
            return false;
        };
        root.organizations_of_contact(row.original())
            .iter()
            .any(|organization| {
                organization.read(|org| {
                    org.stage
                        .is_some_and(|stage| wanted.iter().any(|w| w == stage.as_str()))
                })
            })
    }
}

pub fn contact_filters() -> ColumnFilters<Contact> {
    ColumnFilters::new()
        .with(NAME, ContactNameFilter)
        .with(ORGANIZATION_STAGE, OrganizationStageFilter)
}
