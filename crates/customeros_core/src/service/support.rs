//! Shared plumbing for domain services.
//!
//! # Responsibility
//! - Page list queries into a collection until the server total is reached.
//! - Run optimistic update, create and remove flows against a collection.
//!
//! # Invariants
//! - A failed request leaves the cache as it was before the operation.
//! - A version conflict drops the local write, refetches the entity and
//!   surfaces `Conflict`.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::common::RefMetadata;
use crate::model::Record;
use crate::store::collection::DomainCollection;
use crate::store::entity::EntityStore;
use crate::store::status::EntityStatus;
use crate::sync::{GroupAction, GroupOperation};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::future::Future;
use std::time::Instant;

/// Page sizes used when bootstrapping list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub first_page_size: u32,
    pub page_size: u32,
}

impl Paging {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            first_page_size: config.first_page_size.max(1),
            page_size: config.page_size.max(1),
        }
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            first_page_size: 1000,
            page_size: 100,
        }
    }
}

/// One page of a list query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
}

/// Mutation payload that only echoes the affected id.
#[derive(Debug, Deserialize)]
pub(crate) struct MetadataPayload {
    pub metadata: RefMetadata,
}

/// Mutation payload that echoes a bare id.
#[derive(Debug, Deserialize)]
pub(crate) struct IdPayload {
    pub id: String,
}

pub(crate) fn pagination(page: u32, limit: u32) -> Value {
    json!({ "page": page, "limit": limit })
}

/// Extracts one field of a response `data` object.
pub(crate) fn take_field<R: serde::de::DeserializeOwned>(
    mut data: Value,
    field: &str,
) -> StoreResult<R> {
    let value = data
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| StoreError::Decode(format!("response is missing field `{field}`")))?;
    Ok(serde_json::from_value(value)?)
}

/// Pages a list query into `collection`.
///
/// The first request asks for `first_page_size` records; follow-up
/// requests use `page_size`, with the page index counted in `page_size`
/// units from the distinct records already received. When the two sizes do
/// not line up, follow-up pages overlap what is cached and duplicates are
/// skipped. Paging stops at the server total or at the first page that
/// adds nothing new.
pub(crate) async fn bootstrap_paged<T, F, Fut>(
    collection: &DomainCollection<T>,
    paging: Paging,
    mut fetch_page: F,
) -> StoreResult<Vec<EntityStore<T>>>
where
    T: Record,
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = StoreResult<Page<T>>>,
{
    let started_at = Instant::now();
    let domain = T::DOMAIN;
    let mut handles = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut request = (0, paging.first_page_size);

    loop {
        let (page_index, limit) = request;
        let page = match fetch_page(page_index, limit).await {
            Ok(page) => page,
            Err(err) => {
                collection.record_error(&err);
                warn!(
                    "event=service_bootstrap module=service status=error domain={} page={} error_code={}",
                    domain,
                    page_index,
                    err.code()
                );
                return Err(err);
            }
        };

        let mut added = 0;
        for handle in collection.upsert(page.content) {
            if seen.insert(handle.id()) {
                handles.push(handle);
                added += 1;
            }
        }
        collection.record_page(page.total_elements);

        let received = seen.len() as u64;
        if added == 0 || received >= page.total_elements {
            break;
        }
        let next_index = (received / u64::from(paging.page_size)) as u32;
        request = (next_index, paging.page_size);
    }

    info!(
        "event=service_bootstrap module=service status=ok domain={} count={} total={} duration_ms={}",
        domain,
        handles.len(),
        collection.total_elements().unwrap_or_default(),
        started_at.elapsed().as_millis()
    );
    Ok(handles)
}

/// Loads one entity and surfaces its load error, if any.
pub(crate) async fn load_one<T: Record>(
    collection: &DomainCollection<T>,
    id: &str,
) -> StoreResult<EntityStore<T>> {
    collection.load([id]).await?;
    let entity = collection.get(id);
    match entity.error() {
        Some(err) if entity.status() == EntityStatus::Error => Err(err),
        _ => Ok(entity),
    }
}

/// Applies `edit` locally, sends the edited value, and reconciles.
///
/// `send` receives the edited value and resolves to the server's copy when
/// the mutation returns one; `None` confirms the local value as sent.
pub(crate) async fn optimistic_update<T, F, Fut>(
    collection: &DomainCollection<T>,
    id: &str,
    edit: impl FnOnce(&mut T),
    send: F,
) -> StoreResult<EntityStore<T>>
where
    T: Record,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = StoreResult<Option<T>>>,
{
    let entity = collection.get(id);
    if !entity.status().has_value() {
        load_one(collection, id).await?;
    }

    let base_version = entity.update(edit)?;
    let edited = entity.value();
    match send(edited.clone()).await {
        Ok(server_value) => {
            match entity.reconcile(base_version, server_value.unwrap_or(edited)) {
                Ok(()) => Ok(entity),
                Err(err @ StoreError::Conflict { .. }) => {
                    collection.invalidate(Some(id));
                    if let Err(reload_err) = collection.load([id]).await {
                        warn!(
                            "event=service_conflict_refetch module=service status=error domain={} error_code={}",
                            T::DOMAIN,
                            reload_err.code()
                        );
                    }
                    Err(err)
                }
                Err(err) => Err(err),
            }
        }
        Err(err) => {
            if entity.is_dirty() {
                entity.rollback()?;
            }
            warn!(
                "event=service_update module=service status=rolled_back domain={} error_code={}",
                T::DOMAIN,
                err.code()
            );
            Err(err)
        }
    }
}

/// Inserts `value` under a temporary id, sends it, and moves the entity to
/// the id the server assigned.
///
/// `send` resolves to the server's copy of the record, which must carry the
/// new id.
pub(crate) async fn optimistic_create<T, F, Fut>(
    collection: &DomainCollection<T>,
    value: T,
    send: F,
) -> StoreResult<EntityStore<T>>
where
    T: Record,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let entity = collection.create_local(value);
    let temp_id = entity.id();

    let result = match send(entity.value()).await {
        Ok(server_value) if server_value.id().trim().is_empty() => Err(StoreError::Decode(
            "create response carries no id".to_string(),
        )),
        other => other,
    };

    match result {
        Ok(server_value) => {
            let server_id = server_value.id().trim().to_string();
            let handle = collection.rekey(&temp_id, &server_id)?;
            handle.commit(server_value, handle.version() + 1);
            Ok(handle)
        }
        Err(err) => {
            if entity.is_dirty() {
                entity.rollback()?;
            }
            collection.remove(&temp_id);
            warn!(
                "event=service_create module=service status=rolled_back domain={} error_code={}",
                T::DOMAIN,
                err.code()
            );
            Err(err)
        }
    }
}

/// Refetches ids whose server copy carries fields filled in after a
/// mutation. Failures are logged; the cached value stays readable.
pub(crate) async fn refresh_after_mutation<T: Record>(
    collection: &DomainCollection<T>,
    ids: &[String],
) {
    if ids.is_empty() {
        return;
    }
    let operation = GroupOperation::new(GroupAction::Invalidate, ids.iter().cloned());
    if let Err(err) = collection.apply(operation).await {
        warn!(
            "event=service_refresh module=service status=error domain={} count={} error_code={}",
            T::DOMAIN,
            ids.len(),
            err.code()
        );
    }
}

/// Drops `ids` from the collection, sends the request, and restores the
/// removed entities if it fails.
pub(crate) async fn optimistic_remove<T, Fut>(
    collection: &DomainCollection<T>,
    ids: &[String],
    send: Fut,
) -> StoreResult<()>
where
    T: Record,
    Fut: Future<Output = StoreResult<()>>,
{
    let removed: Vec<EntityStore<T>> = ids.iter().filter_map(|id| collection.remove(id)).collect();
    match send.await {
        Ok(()) => Ok(()),
        Err(err) => {
            for entity in removed {
                collection.restore(entity);
            }
            warn!(
                "event=service_remove module=service status=rolled_back domain={} count={} error_code={}",
                T::DOMAIN,
                ids.len(),
                err.code()
            );
            Err(err)
        }
    }
}
