//! Identity map and batched loading for one entity kind.
//!
//! # Responsibility
//! - Own every `EntityStore` of one domain, keyed by id.
//! - Batch missing ids into one loader call and coalesce concurrent loads.
//! - Track bootstrap bookkeeping for paged list queries.
//!
//! # Invariants
//! - For a given id at most one `EntityStore` exists; `get` never returns
//!   a fresh instance for an id that is already cached.
//! - At most one fetch is in flight per id.
//! - A response for an entity invalidated after the fetch started is
//!   discarded on arrival.
//! - Entries leave the map only through `remove`, `rekey` or `Delete`
//!   group operations; staleness refetches keep the same instance.
//! - Lock order is `in_flight` before `entries` before entity state.
//!
//! # See also
//! - `store::entity` for the per-entity state machine.

use crate::config::StalenessPolicy;
use crate::error::{StoreError, StoreResult};
use crate::model::Record;
use crate::store::entity::EntityStore;
use crate::store::loader::EntityLoader;
use crate::store::notify::{Listeners, Subscription};
use crate::store::root::RootStore;
use crate::sync::{GroupAction, GroupOperation};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use uuid::Uuid;

type LoadFuture = Shared<BoxFuture<'static, StoreResult<()>>>;

/// Change notification for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange {
    Upserted(Vec<String>),
    /// One id, or the whole collection when `None`.
    Invalidated(Option<String>),
    Removed(String),
    Rekeyed { from: String, to: String },
}

struct InFlight {
    token: u64,
    future: LoadFuture,
}

#[derive(Debug, Default)]
struct CollectionMeta {
    total_elements: Option<u64>,
    is_bootstrapped: bool,
    error: Option<String>,
}

struct CollectionInner<T: Record> {
    entries: RwLock<HashMap<String, EntityStore<T>>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    loader: Arc<dyn EntityLoader<T>>,
    root: Weak<RootStore>,
    staleness: StalenessPolicy,
    meta: RwLock<CollectionMeta>,
    listeners: Listeners<CollectionChange>,
    next_token: AtomicU64,
}

/// Shared handle to the cached entities of one domain.
pub struct DomainCollection<T: Record> {
    inner: Arc<CollectionInner<T>>,
}

impl<T: Record> Clone for DomainCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Record> std::fmt::Debug for DomainCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainCollection")
            .field("domain", &T::DOMAIN)
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Record> DomainCollection<T> {
    pub(crate) fn new(
        loader: Arc<dyn EntityLoader<T>>,
        root: Weak<RootStore>,
        staleness: StalenessPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                loader,
                root,
                staleness,
                meta: RwLock::new(CollectionMeta::default()),
                listeners: Listeners::new(),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the cached entity, creating an `Unloaded` placeholder on
    /// first reference.
    pub fn get(&self, id: &str) -> EntityStore<T> {
        if let Some(entity) = self.inner.entries.read().get(id) {
            return entity.clone();
        }
        self.inner
            .entries
            .write()
            .entry(id.to_string())
            .or_insert_with(|| EntityStore::unloaded(id, self.inner.root.clone()))
            .clone()
    }

    /// Returns the cached entity without creating one.
    pub fn peek(&self, id: &str) -> Option<EntityStore<T>> {
        self.inner.entries.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.entries.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Cached ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Entity handles ordered by id.
    pub fn to_vec(&self) -> Vec<EntityStore<T>> {
        let entries = self.inner.entries.read();
        let mut pairs: Vec<(&String, &EntityStore<T>)> = entries.iter().collect();
        pairs.sort_by(|left, right| left.0.cmp(right.0));
        pairs.into_iter().map(|(_, entity)| entity.clone()).collect()
    }

    /// Fetches missing, failed and stale entries.
    ///
    /// Ids are scheduled when this is called; ids already in flight join the
    /// existing request instead of issuing a new one. All scheduled ids that
    /// need a fetch go out in one loader call.
    ///
    /// Ids absent from the response move to `Error` with `NotFound` and do
    /// not fail the returned future.
    ///
    /// # Errors
    /// - The loader error, shared by every caller waiting on that request.
    pub fn load<I>(&self, ids: I) -> impl Future<Output = StoreResult<()>> + Send + 'static
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let waiters = self.schedule(ids);
        async move {
            future::join_all(waiters)
                .await
                .into_iter()
                .collect::<StoreResult<Vec<()>>>()
                .map(|_| ())
        }
    }

    fn schedule<I>(&self, ids: I) -> Vec<LoadFuture>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let now = Instant::now();
        let mut seen = HashSet::new();
        let mut joined = HashSet::new();
        let mut waiters = Vec::new();
        let mut batch: Vec<(String, u64)> = Vec::new();
        let mut started = Vec::new();

        {
            let mut in_flight = self.inner.in_flight.lock();
            for id in ids {
                let id = id.as_ref().trim();
                if id.is_empty() || !seen.insert(id.to_string()) {
                    continue;
                }
                if let Some(pending) = in_flight.get(id) {
                    if joined.insert(pending.token) {
                        waiters.push(pending.future.clone());
                    }
                    continue;
                }
                let entity = self.get(id);
                if entity.needs_load(self.inner.staleness, now) {
                    batch.push((id.to_string(), entity.begin_load()));
                    started.push(entity);
                }
            }

            if !batch.is_empty() {
                let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
                let future = run_batch(
                    Arc::downgrade(&self.inner),
                    Arc::clone(&self.inner.loader),
                    batch.clone(),
                    token,
                )
                .boxed()
                .shared();
                for (id, _) in &batch {
                    in_flight.insert(
                        id.clone(),
                        InFlight {
                            token,
                            future: future.clone(),
                        },
                    );
                }
                waiters.push(future);
            }
        }

        if !batch.is_empty() || !joined.is_empty() {
            debug!(
                "event=collection_load module=store status=scheduled domain={} new={} joined={}",
                T::DOMAIN,
                batch.len(),
                joined.len()
            );
        }
        for entity in started {
            entity.notify();
        }
        waiters
    }

    fn finish_batch(
        &self,
        batch: Vec<(String, u64)>,
        token: u64,
        result: StoreResult<Vec<T>>,
        started_at: Instant,
    ) -> StoreResult<()> {
        {
            let mut in_flight = self.inner.in_flight.lock();
            for (id, _) in &batch {
                if in_flight.get(id).is_some_and(|pending| pending.token == token) {
                    in_flight.remove(id);
                }
            }
        }

        match result {
            Ok(records) => {
                let mut by_id: HashMap<String, T> = records
                    .into_iter()
                    .map(|record| (record.id().to_string(), record))
                    .collect();
                let mut applied = Vec::new();
                let mut missing = 0usize;
                let mut discarded = 0usize;

                for (id, generation) in batch {
                    let Some(entity) = self.peek(&id) else {
                        discarded += 1;
                        continue;
                    };
                    match by_id.remove(&id) {
                        Some(record) => {
                            if entity.complete_load(generation, record) {
                                applied.push(id);
                            } else {
                                discarded += 1;
                            }
                        }
                        None => {
                            let err = StoreError::NotFound {
                                domain: T::DOMAIN.as_str(),
                                id: id.clone(),
                            };
                            if entity.fail_load(generation, err) {
                                missing += 1;
                            } else {
                                discarded += 1;
                            }
                        }
                    }
                }

                info!(
                    "event=collection_load module=store status=ok domain={} applied={} missing={} discarded={} duration_ms={}",
                    T::DOMAIN,
                    applied.len(),
                    missing,
                    discarded,
                    started_at.elapsed().as_millis()
                );
                if !applied.is_empty() {
                    self.inner
                        .listeners
                        .emit(&CollectionChange::Upserted(applied));
                }
                Ok(())
            }
            Err(err) => {
                for (id, generation) in &batch {
                    if let Some(entity) = self.peek(id) {
                        entity.fail_load(*generation, err.clone());
                    }
                }
                self.inner.meta.write().error = Some(err.to_string());
                warn!(
                    "event=collection_load module=store status=error domain={} count={} error_code={} duration_ms={}",
                    T::DOMAIN,
                    batch.len(),
                    err.code(),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Writes server records into the cache, reusing existing instances.
    ///
    /// Returns the handles in input order. Records without an id are
    /// skipped.
    pub fn upsert(&self, records: Vec<T>) -> Vec<EntityStore<T>> {
        let mut handles = Vec::with_capacity(records.len());
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id().trim().to_string();
            if id.is_empty() {
                warn!(
                    "event=collection_upsert module=store status=skipped domain={} reason=missing_id",
                    T::DOMAIN
                );
                continue;
            }
            let entity = self.get(&id);
            entity.commit(record, entity.version() + 1);
            handles.push(entity);
            ids.push(id);
        }

        if !ids.is_empty() {
            debug!(
                "event=collection_upsert module=store status=ok domain={} count={}",
                T::DOMAIN,
                ids.len()
            );
            self.inner.listeners.emit(&CollectionChange::Upserted(ids));
        }
        handles
    }

    /// Marks one entry, or every entry when `id` is `None`, as `Unloaded`.
    ///
    /// Responses already in flight for the invalidated ids are discarded.
    /// Invalidating the whole collection also resets bootstrap state.
    pub fn invalidate(&self, id: Option<&str>) {
        match id {
            Some(id) => {
                self.inner.in_flight.lock().remove(id);
                if let Some(entity) = self.peek(id) {
                    entity.invalidate();
                }
            }
            None => {
                self.inner.in_flight.lock().clear();
                for entity in self.to_vec() {
                    entity.invalidate();
                }
                *self.inner.meta.write() = CollectionMeta::default();
            }
        }

        info!(
            "event=collection_invalidate module=store status=ok domain={} scope={}",
            T::DOMAIN,
            if id.is_some() { "entity" } else { "collection" }
        );
        self.inner
            .listeners
            .emit(&CollectionChange::Invalidated(id.map(str::to_string)));
    }

    /// Inserts a locally created entity under a temporary id.
    ///
    /// The entity starts `Dirty`; rolling it back returns it to an
    /// `Unloaded` placeholder.
    pub fn create_local(&self, value: T) -> EntityStore<T> {
        let temp_id = Uuid::new_v4().to_string();
        let entity = EntityStore::local(&temp_id, value, self.inner.root.clone());
        self.inner
            .entries
            .write()
            .insert(temp_id.clone(), entity.clone());

        debug!(
            "event=collection_create_local module=store status=ok domain={}",
            T::DOMAIN
        );
        self.inner
            .listeners
            .emit(&CollectionChange::Upserted(vec![temp_id]));
        entity
    }

    /// Moves the entity cached under `temp_id` to `server_id`.
    ///
    /// When `server_id` is already cached, the existing instance is kept and
    /// returned, and the temporary entry is dropped.
    ///
    /// # Errors
    /// - `NotFound` when nothing is cached under `temp_id`.
    pub fn rekey(&self, temp_id: &str, server_id: &str) -> StoreResult<EntityStore<T>> {
        let server_id = server_id.trim();
        let (entity, reused) = {
            let mut entries = self.inner.entries.write();
            let Some(entity) = entries.remove(temp_id) else {
                return Err(StoreError::NotFound {
                    domain: T::DOMAIN.as_str(),
                    id: temp_id.to_string(),
                });
            };
            match entries.get(server_id) {
                Some(existing) => (existing.clone(), true),
                None => {
                    entries.insert(server_id.to_string(), entity.clone());
                    (entity, false)
                }
            }
        };
        if !reused {
            entity.set_id(server_id);
        }

        debug!(
            "event=collection_rekey module=store status=ok domain={} reused={}",
            T::DOMAIN,
            reused
        );
        self.inner.listeners.emit(&CollectionChange::Rekeyed {
            from: temp_id.to_string(),
            to: server_id.to_string(),
        });
        Ok(entity)
    }

    /// Drops one entry from the identity map.
    pub fn remove(&self, id: &str) -> Option<EntityStore<T>> {
        self.inner.in_flight.lock().remove(id);
        let removed = self.inner.entries.write().remove(id);
        if removed.is_some() {
            self.inner
                .listeners
                .emit(&CollectionChange::Removed(id.to_string()));
        }
        removed
    }

    /// Re-inserts a previously removed instance under its id.
    ///
    /// Returns `false` when another instance already occupies the id.
    pub fn restore(&self, entity: EntityStore<T>) -> bool {
        let id = entity.id();
        {
            let mut entries = self.inner.entries.write();
            if let Some(existing) = entries.get(&id) {
                return existing.ptr_eq(&entity);
            }
            entries.insert(id.clone(), entity);
        }
        self.inner
            .listeners
            .emit(&CollectionChange::Upserted(vec![id]));
        true
    }

    /// Applies one inbound group operation.
    pub async fn apply(&self, operation: GroupOperation) -> StoreResult<()> {
        match operation.action {
            GroupAction::Append => self.load(operation.ids).await,
            GroupAction::Delete => {
                for id in &operation.ids {
                    self.remove(id);
                }
                Ok(())
            }
            GroupAction::Invalidate => {
                for id in &operation.ids {
                    self.invalidate(Some(id));
                }
                self.load(operation.ids).await
            }
            GroupAction::Update => Ok(()),
        }
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&CollectionChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }

    /// Server-reported size of the domain, once a list query has run.
    pub fn total_elements(&self) -> Option<u64> {
        self.inner.meta.read().total_elements
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.inner.meta.read().is_bootstrapped
    }

    /// Returns whether every server-side entry has been paged in.
    pub fn is_fully_loaded(&self) -> bool {
        let meta = self.inner.meta.read();
        meta.is_bootstrapped
            && meta
                .total_elements
                .map_or(true, |total| self.len() as u64 >= total)
    }

    /// Last load failure message.
    pub fn error(&self) -> Option<String> {
        self.inner.meta.read().error.clone()
    }

    pub(crate) fn record_page(&self, total_elements: u64) {
        let mut meta = self.inner.meta.write();
        meta.total_elements = Some(total_elements);
        meta.is_bootstrapped = true;
        meta.error = None;
    }

    pub(crate) fn record_error(&self, err: &StoreError) {
        self.inner.meta.write().error = Some(err.to_string());
    }
}

async fn run_batch<T: Record>(
    inner: Weak<CollectionInner<T>>,
    loader: Arc<dyn EntityLoader<T>>,
    batch: Vec<(String, u64)>,
    token: u64,
) -> StoreResult<()> {
    let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
    let started_at = Instant::now();
    debug!(
        "event=collection_load module=store status=start domain={} count={}",
        T::DOMAIN,
        ids.len()
    );

    let result = loader.fetch(&ids).await;
    match inner.upgrade() {
        Some(inner) => DomainCollection { inner }.finish_batch(batch, token, result, started_at),
        None => result.map(|_| ()),
    }
}
