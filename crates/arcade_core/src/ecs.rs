//! Component store.
//!
//! Typed, sparse storage of component records keyed by entity id. Each
//! component type owns one [`BTreeMap`] so iteration is always in
//! ascending entity order, which keeps every system deterministic without
//! an explicit sort.
//!
//! Two tick-scoped rules are enforced here:
//! - Entities created during a tick are invisible to [`ComponentStore::query`]
//!   until the next [`ComponentStore::begin_tick`].
//! - [`ComponentStore::destroy`] called while a system pass is active is
//!   deferred to [`ComponentStore::end_pass`], so no system ever observes a
//!   half-destroyed entity.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Unique identifier for an entity.
pub type EntityId = u64;

/// Name of a component kind, used for queries and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentKind(&'static str);

impl ComponentKind {
    /// Create a kind with the given name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A typed record that can be attached to an entity.
pub trait Component: Any + Clone + Hash + fmt::Debug {
    /// Kind under which records of this type are stored.
    const KIND: ComponentKind;
}

/// Type-erased view of one component storage.
trait ErasedStorage {
    fn remove_entity(&mut self, id: EntityId);
    fn contains(&self, id: EntityId) -> bool;
    fn len(&self) -> usize;
    fn ids(&self) -> Vec<EntityId>;
    fn hash_records(&self, state: &mut dyn Hasher);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Storage<T> {
    records: BTreeMap<EntityId, T>,
}

impl<T: Component> ErasedStorage for Storage<T> {
    fn remove_entity(&mut self, id: EntityId) {
        self.records.remove(&id);
    }

    fn contains(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn ids(&self) -> Vec<EntityId> {
        self.records.keys().copied().collect()
    }

    fn hash_records(&self, mut state: &mut dyn Hasher) {
        self.records.len().hash(&mut state);
        for (id, record) in &self.records {
            id.hash(&mut state);
            record.hash(&mut state);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owner of every entity and component record in a simulation.
#[derive(Default)]
pub struct ComponentStore {
    next_id: EntityId,
    alive: BTreeSet<EntityId>,
    /// Created since the last `begin_tick`; hidden from queries.
    fresh: BTreeSet<EntityId>,
    storages: BTreeMap<ComponentKind, Box<dyn ErasedStorage>>,
    pass_active: bool,
    pending_destroy: BTreeSet<EntityId>,
}

impl fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: BTreeMap<&str, usize> = self
            .storages
            .iter()
            .map(|(kind, storage)| (kind.name(), storage.len()))
            .collect();
        f.debug_struct("ComponentStore")
            .field("alive", &self.alive.len())
            .field("storages", &sizes)
            .finish()
    }
}

impl ComponentStore {
    /// Create an empty store. The first entity gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Allocate a new entity id. Ids are never reused.
    pub fn create(&mut self) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.alive.insert(id);
        self.fresh.insert(id);
        id
    }

    /// Whether the entity exists (pending destruction still counts).
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    /// Whether the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// Attach `record` to `id`, replacing any existing record of that kind.
    ///
    /// Returns `false` (and does nothing) if the entity does not exist.
    pub fn attach<T: Component>(&mut self, id: EntityId, record: T) -> bool {
        if !self.alive.contains(&id) {
            tracing::trace!(entity = id, kind = %T::KIND, "attach to missing entity ignored");
            return false;
        }
        let storage = self
            .storages
            .entry(T::KIND)
            .or_insert_with(|| Box::new(Storage::<T> { records: BTreeMap::new() }));
        match storage.as_any_mut().downcast_mut::<Storage<T>>() {
            Some(typed) => {
                typed.records.insert(id, record);
                true
            }
            None => {
                tracing::warn!(kind = %T::KIND, "component kind registered with a different type");
                false
            }
        }
    }

    /// Get the record of type `T` attached to `id`, if any.
    #[must_use]
    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.storage::<T>()?.records.get(&id)
    }

    /// Mutable access to the record of type `T` attached to `id`.
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.storages
            .get_mut(&T::KIND)?
            .as_any_mut()
            .downcast_mut::<Storage<T>>()?
            .records
            .get_mut(&id)
    }

    /// Whether `id` holds a record of type `T`.
    #[must_use]
    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        self.get::<T>(id).is_some()
    }

    /// Remove and return the record of type `T`. No-op if absent.
    pub fn remove<T: Component>(&mut self, id: EntityId) -> Option<T> {
        self.storages
            .get_mut(&T::KIND)?
            .as_any_mut()
            .downcast_mut::<Storage<T>>()?
            .records
            .remove(&id)
    }

    /// Iterate `(id, record)` pairs of type `T` in ascending id order.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.storage::<T>()
            .into_iter()
            .flat_map(|storage| storage.records.iter().map(|(id, record)| (*id, record)))
    }

    /// Entities holding every listed kind, in ascending id order.
    ///
    /// An empty kind list returns every live entity. Entities created during
    /// the current tick are excluded.
    #[must_use]
    pub fn query(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        if kinds.is_empty() {
            return self
                .alive
                .iter()
                .filter(|id| !self.fresh.contains(id))
                .copied()
                .collect();
        }

        let mut storages = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match self.storages.get(kind) {
                Some(storage) => storages.push(storage),
                None => return Vec::new(),
            }
        }
        // Iterate the smallest storage, probe the rest.
        storages.sort_by_key(|storage| storage.len());
        let (smallest, rest) = storages.split_at(1);

        smallest[0]
            .ids()
            .into_iter()
            .filter(|id| !self.fresh.contains(id))
            .filter(|id| rest.iter().all(|storage| storage.contains(*id)))
            .collect()
    }

    /// Destroy an entity and all of its records.
    ///
    /// While a system pass is active the destruction is queued and applied
    /// when the pass ends.
    pub fn destroy(&mut self, id: EntityId) {
        if !self.alive.contains(&id) {
            return;
        }
        if self.pass_active {
            self.pending_destroy.insert(id);
        } else {
            self.destroy_now(id);
        }
    }

    /// Whether `id` is queued for destruction at the end of the current pass.
    #[must_use]
    pub fn is_pending_destroy(&self, id: EntityId) -> bool {
        self.pending_destroy.contains(&id)
    }

    fn destroy_now(&mut self, id: EntityId) {
        for storage in self.storages.values_mut() {
            storage.remove_entity(id);
        }
        self.alive.remove(&id);
        self.fresh.remove(&id);
    }

    /// Start a new tick: entities created before now become queryable.
    pub fn begin_tick(&mut self) {
        self.fresh.clear();
    }

    /// Mark the start of a system pass.
    pub fn begin_pass(&mut self) {
        self.pass_active = true;
    }

    /// Mark the end of a system pass and apply queued destruction.
    pub fn end_pass(&mut self) {
        self.pass_active = false;
        let pending = std::mem::take(&mut self.pending_destroy);
        for id in pending {
            self.destroy_now(id);
        }
    }

    /// Fold every entity and record into `state` in a deterministic order.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.next_id.hash(state);
        self.alive.len().hash(state);
        for id in &self.alive {
            id.hash(state);
        }
        for (kind, storage) in &self.storages {
            kind.hash(state);
            storage.hash_records(state);
        }
    }

    fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        self.storages
            .get(&T::KIND)?
            .as_any()
            .downcast_ref::<Storage<T>>()
    }
}
