use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use folio_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Object store held in a `HashMap`. Used by tests and by repositories that
/// never touch disk.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    fn objects(&self) -> RwLockReadGuard<'_, HashMap<ObjectId, StoredObject>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Sum of the payload sizes of every stored object.
    pub fn total_bytes(&self) -> u64 {
        self.objects().values().map(|obj| obj.size).sum()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.objects().get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        // Same ID always maps to the same content, so an existing entry wins.
        map.entry(id).or_insert_with(|| {
            tracing::debug!(%id, kind = %object.kind, size = object.size, "stored object");
            object.clone()
        });
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects().contains_key(id))
    }

    fn size(&self, id: &ObjectId) -> StoreResult<Option<u64>> {
        Ok(self.objects().get(id).map(|obj| obj.size))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}
