//! Organization table columns and filters.
//!
//! Null and empty handling differs per column and is part of each rule:
//! - owner: `showEmpty` matches owner-less rows; otherwise the owner id must
//!   be listed.
//! - renewal likelihood: an empty list matches only rows without a
//!   likelihood.
//! - time to renewal: rows renewing on or before the filter date; rows
//!   without a renewal date never match.
//! - forecast: `[min, max]` inclusive; rows without a forecast never match.

use crate::model::organization::Organization;
use crate::table::{
    contains_text, date_filter, date_part, show_empty, string_items, text_value, ColumnAccess,
    ColumnFilters, FilterAdapter, FilterValue, Row,
};
use serde_json::{json, Value};

pub const NAME: &str = "organization";
pub const WEBSITE: &str = "website";
pub const RELATIONSHIP: &str = "relationship";
pub const STAGE: &str = "stage";
pub const OWNER: &str = "owner";
pub const RENEWAL_LIKELIHOOD: &str = "renewal_likelihood";
pub const TIME_TO_RENEWAL: &str = "time_to_renewal";
pub const FORECAST: &str = "forecast";
pub const LAST_TOUCHPOINT: &str = "last_touchpoint";

impl ColumnAccess for Organization {
    fn column_value(&self, column_id: &str) -> Option<Value> {
        match column_id {
            NAME => Some(json!(self.name)),
            WEBSITE => self.website.as_ref().map(|website| json!(website)),
            RELATIONSHIP => self.relationship.map(|r| json!(r.as_str())),
            STAGE => self.stage.map(|s| json!(s.as_str())),
            OWNER => self.owner.as_ref().map(|owner| json!(owner.id)),
            RENEWAL_LIKELIHOOD => self.renewal_likelihood().map(|l| json!(l.as_str())),
            TIME_TO_RENEWAL => self.next_renewal_date().map(|date| json!(date)),
            FORECAST => self.arr_forecast().map(|arr| json!(arr)),
            LAST_TOUCHPOINT => self
                .last_touchpoint
                .as_ref()
                .and_then(|touchpoint| touchpoint.last_touch_point_type.as_ref())
                .map(|kind| json!(kind)),
            _ => None,
        }
    }
}

/// Case-insensitive substring match on the name.
pub struct NameFilter;

impl FilterAdapter<Organization> for NameFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let Some(needle) = text_value(value) else {
            return true;
        };
        row.original().read(|org| contains_text(&org.name, &needle))
    }
}

/// Substring match on the website; `showEmpty` also keeps rows without one.
pub struct WebsiteFilter;

impl FilterAdapter<Organization> for WebsiteFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let include_empty = show_empty(value);
        let needle = text_value(value).unwrap_or_default();
        row.original().read(|org| match org.website.as_deref() {
            Some(website) if !website.trim().is_empty() => contains_text(website, &needle),
            _ => include_empty,
        })
    }
}

pub struct RelationshipFilter;

impl FilterAdapter<Organization> for RelationshipFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let wanted = string_items(value);
        row.original().read(|org| {
            org.relationship
                .is_some_and(|relationship| wanted.iter().any(|w| w == relationship.as_str()))
        })
    }
}

pub struct StageFilter;

impl FilterAdapter<Organization> for StageFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let wanted = string_items(value);
        row.original().read(|org| {
            org.stage
                .is_some_and(|stage| wanted.iter().any(|w| w == stage.as_str()))
        })
    }
}

/// Filter value: `{ "showEmpty": bool, "value": [user ids] }`.
pub struct OwnerFilter;

impl FilterAdapter<Organization> for OwnerFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let include_empty = show_empty(value);
        let owners = string_items(value);
        row.original().read(|org| match org.owner.as_ref() {
            None => include_empty,
            Some(owner) => owners.iter().any(|id| *id == owner.id),
        })
    }
}

/// Filter value: list of likelihood names.
pub struct RenewalLikelihoodFilter;

impl FilterAdapter<Organization> for RenewalLikelihoodFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let wanted = string_items(value);
        row.original().read(|org| match org.renewal_likelihood() {
            None => wanted.is_empty(),
            Some(likelihood) => wanted.iter().any(|w| w == likelihood.as_str()),
        })
    }
}

/// Filter value: a date or timestamp string.
pub struct TimeToRenewalFilter;

impl FilterAdapter<Organization> for TimeToRenewalFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let Some(limit) = date_filter(value) else {
            return false;
        };
        row.original().read(|org| {
            org.next_renewal_date()
                .and_then(date_part)
                .is_some_and(|renewal| renewal <= limit)
        })
    }
}

/// Filter value: `[min, max]` or `{ "value": [min, max] }`.
pub struct ForecastFilter;

impl FilterAdapter<Organization> for ForecastFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let Some((min, max)) = range(value) else {
            return false;
        };
        row.original()
            .read(|org| org.arr_forecast().is_some_and(|arr| arr >= min && arr <= max))
    }
}

fn range(value: &FilterValue) -> Option<(f64, f64)> {
    let bounds = match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(map)) => map.get("value")?.as_array()?.clone(),
        _ => return None,
    };
    match bounds.as_slice() {
        [min, max] => Some((min.as_f64()?, max.as_f64()?)),
        _ => None,
    }
}

/// Filter value: `{ "value": [touchpoint types], "after": date }`; either
/// part may be omitted.
pub struct LastTouchpointFilter;

impl FilterAdapter<Organization> for LastTouchpointFilter {
    fn filter(&self, row: &Row<Organization>, _column_id: &str, value: &FilterValue) -> bool {
        let kinds = string_items(value);
        let after = match value {
            Some(Value::Object(map)) => map.get("after").and_then(Value::as_str).and_then(date_part),
            _ => None,
        };
        row.original().read(|org| {
            let Some(touchpoint) = org.last_touchpoint.as_ref() else {
                return false;
            };
            let kind_matches = kinds.is_empty()
                || touchpoint
                    .last_touch_point_type
                    .as_ref()
                    .is_some_and(|kind| kinds.contains(kind));
            let date_matches = after.map_or(true, |after| {
                touchpoint
                    .last_touch_point_at
                    .as_deref()
                    .and_then(date_part)
                    .is_some_and(|at| at >= after)
            });
            kind_matches && date_matches
        })
    }
}

/// Every organization column with its filter.
pub fn organization_filters() -> ColumnFilters<Organization> {
    ColumnFilters::new()
        .with(NAME, NameFilter)
        .with(WEBSITE, WebsiteFilter)
        .with(RELATIONSHIP, RelationshipFilter)
        .with(STAGE, StageFilter)
        .with(OWNER, OwnerFilter)
        .with(RENEWAL_LIKELIHOOD, RenewalLikelihoodFilter)
        .with(TIME_TO_RENEWAL, TimeToRenewalFilter)
        .with(FORECAST, ForecastFilter)
        .with(LAST_TOUCHPOINT, LastTouchpointFilter)
}
