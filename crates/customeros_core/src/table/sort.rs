//! Column sorting for table rows.
//!
//! Rows without a value for the sorted column always come last, in either
//! direction.

use crate::model::organization::Organization;
use crate::model::Record;
use crate::table::organization_filters::{FORECAST, NAME, RENEWAL_LIKELIHOOD, TIME_TO_RENEWAL};
use crate::table::{date_part, Row};
use std::cmp::Ordering;

/// Sort key of one row for one column.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum SortKey {
    Text(String),
    Number(f64),
    Rank(u8),
    Date(chrono::NaiveDate),
}

pub trait SortAdapter<T: Record>: Send + Sync {
    /// Key of `row` for `column_id`; `None` sorts last.
    fn key(&self, row: &Row<T>, column_id: &str) -> Option<SortKey>;

    /// Ascending comparison with absent keys last.
    fn compare(&self, a: &Row<T>, b: &Row<T>, column_id: &str) -> Ordering {
        compare_keys(self.key(a, column_id), self.key(b, column_id), false)
    }
}

fn compare_keys(a: Option<SortKey>, b: Option<SortKey>, descending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

/// Sorts rows in place; ties keep their input order.
pub fn sort_rows<T: Record>(
    rows: &mut [Row<T>],
    adapter: &dyn SortAdapter<T>,
    column_id: &str,
    descending: bool,
) {
    rows.sort_by_cached_key(|row| KeyOrd(adapter.key(row, column_id), descending));
}

/// Total order wrapper used by `sort_rows`.
struct KeyOrd(Option<SortKey>, bool);

impl PartialEq for KeyOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyOrd {}

impl PartialOrd for KeyOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_keys(self.0.clone(), other.0.clone(), self.1)
    }
}

/// Organization columns: name, renewal likelihood, forecast ARR and next
/// renewal date.
pub struct OrganizationSort;

impl SortAdapter<Organization> for OrganizationSort {
    fn key(&self, row: &Row<Organization>, column_id: &str) -> Option<SortKey> {
        row.original().read(|org| match column_id {
            NAME => {
                let name = org.name.trim();
                (!name.is_empty()).then(|| SortKey::Text(name.to_lowercase()))
            }
            RENEWAL_LIKELIHOOD => org
                .renewal_likelihood()
                .map(|likelihood| SortKey::Rank(likelihood.rank())),
            FORECAST => org.arr_forecast().map(SortKey::Number),
            TIME_TO_RENEWAL => org.next_renewal_date().and_then(date_part).map(SortKey::Date),
            _ => None,
        })
    }
}
