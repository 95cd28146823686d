//! Single-entity wrapper with optimistic-mutation support.
//!
//! # Responsibility
//! - Hold the current value, lifecycle status and version of one record.
//! - Record a pre-update snapshot so a failed write can be undone exactly.
//! - Detect writes that were based on a server state the cache has moved
//!   past.
//!
//! # Invariants
//! - Only `DomainCollection` constructs `EntityStore` instances.
//! - `version` never decreases.
//! - `server_version` moves only on loads, upserts and pushes; confirming
//!   this client's own mutation bumps `version` but leaves it alone.
//! - The back-reference to `RootStore` is non-owning and used for lookups only.
//! - Listeners run after the state lock is released.
//!
//! # See also
//! - `store::collection` for identity-map ownership.

use crate::config::StalenessPolicy;
use crate::error::{StoreError, StoreResult};
use crate::model::Record;
use crate::store::notify::{Listeners, Subscription};
use crate::store::root::RootStore;
use crate::store::status::EntityStatus;
use log::{debug, warn};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Change notification for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEvent {
    pub id: String,
    pub status: EntityStatus,
    pub version: u64,
}

struct Snapshot<T> {
    value: T,
    status: EntityStatus,
}

struct EntityState<T> {
    value: T,
    status: EntityStatus,
    version: u64,
    server_version: u64,
    snapshot: Option<Snapshot<T>>,
    error: Option<StoreError>,
    generation: u64,
    loaded_at: Option<Instant>,
}

struct EntityInner<T: Record> {
    id: RwLock<String>,
    state: RwLock<EntityState<T>>,
    root: Weak<RootStore>,
    listeners: Listeners<EntityEvent>,
}

/// Shared handle to one cached entity.
///
/// Cloning the handle never clones the entity; every clone observes the
/// same state. Use [`EntityStore::ptr_eq`] to compare identities.
pub struct EntityStore<T: Record> {
    inner: Arc<EntityInner<T>>,
}

impl<T: Record> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Record> std::fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("EntityStore")
            .field("domain", &T::DOMAIN)
            .field("id", &*self.inner.id.read())
            .field("status", &state.status)
            .field("version", &state.version)
            .finish()
    }
}

impl<T: Record> EntityStore<T> {
    pub(crate) fn unloaded(id: &str, root: Weak<RootStore>) -> Self {
        Self::with_state(id, T::placeholder(id), EntityStatus::Unloaded, None, root)
    }

    /// Locally created entity awaiting its first server confirmation.
    pub(crate) fn local(id: &str, mut value: T, root: Weak<RootStore>) -> Self {
        value.set_id(id);
        let snapshot = Snapshot {
            value: T::placeholder(id),
            status: EntityStatus::Unloaded,
        };
        Self::with_state(id, value, EntityStatus::Dirty, Some(snapshot), root)
    }

    fn with_state(
        id: &str,
        value: T,
        status: EntityStatus,
        snapshot: Option<Snapshot<T>>,
        root: Weak<RootStore>,
    ) -> Self {
        Self {
            inner: Arc::new(EntityInner {
                id: RwLock::new(id.to_string()),
                state: RwLock::new(EntityState {
                    value,
                    status,
                    version: 0,
                    server_version: 0,
                    snapshot,
                    error: None,
                    generation: 0,
                    loaded_at: None,
                }),
                root,
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn id(&self) -> String {
        self.inner.id.read().clone()
    }

    pub fn status(&self) -> EntityStatus {
        self.inner.state.read().status
    }

    pub fn version(&self) -> u64 {
        self.inner.state.read().version
    }

    /// Last load failure, cleared by the next successful commit.
    pub fn error(&self) -> Option<StoreError> {
        self.inner.state.read().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.status() == EntityStatus::Loading
    }

    pub fn is_dirty(&self) -> bool {
        self.status() == EntityStatus::Dirty
    }

    /// Returns a clone of the current value.
    pub fn value(&self) -> T {
        self.inner.state.read().value.clone()
    }

    /// Borrows the current value for the duration of `f`.
    ///
    /// `f` must not call back into this entity's mutating methods.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.state.read().value)
    }

    /// Upgrades the back-reference to the owning root store.
    pub fn root(&self) -> Option<Arc<RootStore>> {
        self.inner.root.upgrade()
    }

    /// Returns whether both handles point at the same entity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn subscribe(&self, listener: impl Fn(&EntityEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }

    /// Applies a local optimistic edit.
    ///
    /// Moves `Loaded -> Dirty` and records the pre-update snapshot. Further
    /// edits while already `Dirty` keep the first snapshot.
    ///
    /// Returns the server version the edit is based on; pass it to
    /// [`EntityStore::reconcile`] when the server answers. Overlapping edits
    /// share a base until a load, upsert or push lands.
    ///
    /// # Errors
    /// - `InvalidTransition` when the entity is not `Loaded` or `Dirty`.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> StoreResult<u64> {
        let event = {
            let mut state = self.inner.state.write();
            match state.status {
                EntityStatus::Loaded => {
                    state.snapshot = Some(Snapshot {
                        value: state.value.clone(),
                        status: EntityStatus::Loaded,
                    });
                    state.status = EntityStatus::Dirty;
                }
                EntityStatus::Dirty => {}
                from => return Err(self.invalid(from, "update")),
            }
            f(&mut state.value);
            let id = self.id();
            state.value.set_id(&id);
            (self.event(&state), state.server_version)
        };
        let (event, base_version) = event;
        self.inner.listeners.emit(&event);
        Ok(base_version)
    }

    /// Replaces the value with a server-confirmed one.
    ///
    /// Clears any pending local edit. The version becomes `new_version`, or
    /// one past the current version if that is higher.
    pub fn commit(&self, server_value: T, new_version: u64) {
        let event = {
            let mut state = self.inner.state.write();
            self.apply_server_value(&mut state, server_value, new_version, true);
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
    }

    /// Applies a server-initiated update (subscription push or background
    /// refresh). The last write to arrive wins.
    pub fn push(&self, server_value: T, version: u64) {
        debug!(
            "event=entity_push module=store status=ok domain={} id={} version={}",
            T::DOMAIN,
            self.id(),
            version
        );
        self.commit(server_value, version);
    }

    /// Commits a mutation response for a write based on `base_version`.
    ///
    /// # Errors
    /// - `Conflict` when a load, upsert or push landed since the write was
    ///   made. The cached value is left untouched in that case. Confirmations
    ///   of other local writes never conflict.
    pub fn reconcile(&self, base_version: u64, server_value: T) -> StoreResult<()> {
        let event = {
            let mut state = self.inner.state.write();
            if state.server_version != base_version {
                let err = StoreError::Conflict {
                    id: self.id(),
                    expected_version: base_version,
                    actual_version: state.server_version,
                };
                warn!(
                    "event=entity_reconcile module=store status=conflict domain={} id={} expected_version={} actual_version={}",
                    T::DOMAIN,
                    self.id(),
                    base_version,
                    state.server_version
                );
                return Err(err);
            }
            let next = state.version + 1;
            self.apply_server_value(&mut state, server_value, next, false);
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
        Ok(())
    }

    /// Restores the pre-update snapshot.
    ///
    /// # Errors
    /// - `InvalidTransition` when there is no pending local edit.
    pub fn rollback(&self) -> StoreResult<()> {
        let event = {
            let mut state = self.inner.state.write();
            if state.status != EntityStatus::Dirty {
                return Err(self.invalid(state.status, "rollback"));
            }
            let Some(snapshot) = state.snapshot.take() else {
                return Err(self.invalid(state.status, "rollback"));
            };
            state.value = snapshot.value;
            state.status = snapshot.status;
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
        Ok(())
    }

    /// Records a fetch failure.
    ///
    /// # Errors
    /// - `InvalidTransition` unless the entity is `Loading` or `Loaded`.
    pub fn fail(&self, error: StoreError) -> StoreResult<()> {
        let event = {
            let mut state = self.inner.state.write();
            match state.status {
                EntityStatus::Loading | EntityStatus::Loaded => {
                    state.status = EntityStatus::Error;
                    state.error = Some(error);
                }
                from => return Err(self.invalid(from, "fail")),
            }
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
        Ok(())
    }

    /// Moves a failed entity back to `Loading`.
    ///
    /// The owning collection's next `load` picks the entity up.
    ///
    /// # Errors
    /// - `InvalidTransition` unless the entity is in `Error`.
    pub fn retry(&self) -> StoreResult<()> {
        let event = {
            let mut state = self.inner.state.write();
            if state.status != EntityStatus::Error {
                return Err(self.invalid(state.status, "retry"));
            }
            state.status = EntityStatus::Loading;
            state.generation += 1;
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
        Ok(())
    }

    /// Marks the entity `Unloaded` and discards any response still in flight.
    ///
    /// The last known value stays readable until the refetch lands.
    pub fn invalidate(&self) {
        let event = {
            let mut state = self.inner.state.write();
            state.status = EntityStatus::Unloaded;
            state.snapshot = None;
            state.loaded_at = None;
            state.generation += 1;
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
    }

    pub(crate) fn needs_load(&self, staleness: StalenessPolicy, now: Instant) -> bool {
        let state = self.inner.state.read();
        match state.status {
            EntityStatus::Unloaded | EntityStatus::Error | EntityStatus::Loading => true,
            EntityStatus::Dirty => false,
            EntityStatus::Loaded => match (staleness, state.loaded_at) {
                (StalenessPolicy::Never, _) => false,
                (StalenessPolicy::After(max_age), Some(loaded_at)) => {
                    now.saturating_duration_since(loaded_at) >= max_age
                }
                (StalenessPolicy::After(_), None) => true,
            },
        }
    }

    /// Enters `Loading` for a new fetch and returns its generation.
    ///
    /// Does not notify; the caller runs [`EntityStore::notify`] once its
    /// own locks are released.
    pub(crate) fn begin_load(&self) -> u64 {
        let mut state = self.inner.state.write();
        state.status = EntityStatus::Loading;
        state.generation += 1;
        state.generation
    }

    /// Emits the current state to listeners.
    pub(crate) fn notify(&self) {
        let event = self.event(&self.inner.state.read());
        self.inner.listeners.emit(&event);
    }

    /// Applies a fetched value unless the fetch was superseded.
    pub(crate) fn complete_load(&self, generation: u64, server_value: T) -> bool {
        let event = {
            let mut state = self.inner.state.write();
            if state.generation != generation {
                return false;
            }
            let next = state.version + 1;
            self.apply_server_value(&mut state, server_value, next, true);
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
        true
    }

    /// Records a fetch failure unless the fetch was superseded.
    pub(crate) fn fail_load(&self, generation: u64, error: StoreError) -> bool {
        let event = {
            let mut state = self.inner.state.write();
            if state.generation != generation || state.status != EntityStatus::Loading {
                return false;
            }
            state.status = EntityStatus::Error;
            state.error = Some(error);
            self.event(&state)
        };
        self.inner.listeners.emit(&event);
        true
    }

    pub(crate) fn set_id(&self, id: &str) {
        *self.inner.id.write() = id.to_string();
        self.inner.state.write().value.set_id(id);
    }

    fn apply_server_value(
        &self,
        state: &mut EntityState<T>,
        mut value: T,
        new_version: u64,
        server_initiated: bool,
    ) {
        let id = self.id();
        value.set_id(&id);
        state.value = value;
        state.status = EntityStatus::Loaded;
        state.version = new_version.max(state.version + 1);
        if server_initiated {
            state.server_version = state.version;
        }
        state.snapshot = None;
        state.error = None;
        state.loaded_at = Some(Instant::now());
    }

    fn event(&self, state: &EntityState<T>) -> EntityEvent {
        EntityEvent {
            id: self.id(),
            status: state.status,
            version: state.version,
        }
    }

    fn invalid(&self, from: EntityStatus, action: &'static str) -> StoreError {
        StoreError::InvalidTransition {
            id: self.id(),
            from,
            action,
        }
    }
}
