//! In-memory resource store.
//!
//! Backs the engine's unit tests and doubles as a reference implementation of
//! the store contract: registered types, deterministic list ordering,
//! optimistic-concurrency updates, and scripted fault injection so retry
//! behavior can be exercised without a real backend.

use crate::document::{Resource, TypeRef};
use crate::error::{Result, StewardError};
use crate::store::{merge_document, ResourceClient, ResourceStore, Selector};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

type Key = (TypeRef, String, String);

#[derive(Debug, Default)]
pub struct MemoryStore {
    types: RwLock<BTreeSet<TypeRef>>,
    objects: RwLock<BTreeMap<Key, Resource>>,
    // scripted faults, consumed one per matching call
    update_conflicts: AtomicUsize,
    unavailable: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(types: impl IntoIterator<Item = TypeRef>) -> Self {
        let store = Self::new();
        for t in types {
            store.register_type(t);
        }
        store
    }

    pub fn register_type(&self, type_ref: TypeRef) {
        self.types.write().unwrap().insert(type_ref);
    }

    /// Insert a document directly, registering its type. Assigns resource
    /// version "1" when the document carries none.
    pub fn seed(&self, resource: Resource) -> Result<()> {
        let key = key_of(&resource)?;
        self.register_type(resource.type_ref());
        let mut resource = resource;
        if resource.resource_version().is_none() {
            resource.set_resource_version("1");
        }
        self.objects.write().unwrap().insert(key, resource);
        Ok(())
    }

    /// Fetch a stored document without going through a client.
    pub fn lookup(&self, type_ref: &TypeRef, namespace: &str, name: &str) -> Option<Resource> {
        let key = (type_ref.clone(), namespace.to_string(), name.to_string());
        self.objects.read().unwrap().get(&key).cloned()
    }

    /// The next `n` update calls fail with `Conflict` before touching state.
    pub fn inject_update_conflicts(&self, n: usize) {
        self.update_conflicts.store(n, Ordering::SeqCst);
    }

    /// The next `n` store calls of any kind fail with `Unavailable`.
    pub fn inject_unavailability(&self, n: usize) {
        self.unavailable.store(n, Ordering::SeqCst);
    }

    fn take_unavailability(&self) -> Result<()> {
        if take_one(&self.unavailable) {
            return Err(StewardError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

/// Decrement-if-positive on a fault counter.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn key_of(resource: &Resource) -> Result<Key> {
    if resource.name().is_empty() {
        return Err(StewardError::InvalidDocument(
            "document has no metadata.name".to_string(),
        ));
    }
    Ok((
        resource.type_ref(),
        resource.namespace().to_string(),
        resource.name().to_string(),
    ))
}

fn bump_version(resource: &mut Resource) {
    let next = resource
        .resource_version()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    resource.set_resource_version(&next.to_string());
}

impl ResourceStore for MemoryStore {
    fn client_for(&self, type_ref: &TypeRef) -> Result<Box<dyn ResourceClient + '_>> {
        if !self.types.read().unwrap().contains(type_ref) {
            return Err(StewardError::UnknownResourceType(type_ref.to_string()));
        }
        Ok(Box::new(MemoryClient {
            store: self,
            type_ref: type_ref.clone(),
        }))
    }
}

#[derive(Debug)]
struct MemoryClient<'a> {
    store: &'a MemoryStore,
    type_ref: TypeRef,
}

impl ResourceClient for MemoryClient<'_> {
    fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<Resource>> {
        self.store.take_unavailability()?;
        let objects = self.store.objects.read().unwrap();
        Ok(objects
            .iter()
            .filter(|((t, ns, _), _)| *t == self.type_ref && ns == namespace)
            .filter(|(_, r)| selector.matches(&r.labels()))
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn get(&self, namespace: &str, name: &str) -> Result<Option<Resource>> {
        self.store.take_unavailability()?;
        let key = (
            self.type_ref.clone(),
            namespace.to_string(),
            name.to_string(),
        );
        Ok(self.store.objects.read().unwrap().get(&key).cloned())
    }

    fn update(&self, desired: &Resource) -> Result<Resource> {
        self.store.take_unavailability()?;
        if take_one(&self.store.update_conflicts) {
            return Err(StewardError::Conflict(format!(
                "injected conflict on {}/{}",
                desired.namespace(),
                desired.name()
            )));
        }
        let key = key_of(desired)?;
        let mut objects = self.store.objects.write().unwrap();
        let existing = objects.get(&key).ok_or_else(|| {
            StewardError::NotFound(format!("{}/{}", desired.namespace(), desired.name()))
        })?;
        // stale writers lose; a document without a version writes blind
        if let (Some(want), Some(have)) = (desired.resource_version(), existing.resource_version())
        {
            if want != have {
                return Err(StewardError::Conflict(format!(
                    "resource version {want} is stale (current {have})"
                )));
            }
        }
        let mut stored = desired.clone();
        bump_version(&mut stored);
        objects.insert(key, stored.clone());
        Ok(stored)
    }

    fn create_or_merge(&self, desired: &Resource) -> Result<Resource> {
        self.store.take_unavailability()?;
        let key = key_of(desired)?;
        let mut objects = self.store.objects.write().unwrap();
        let stored = match objects.get(&key) {
            Some(existing) => {
                let mut map = existing.as_map().clone();
                merge_document(&mut map, desired.as_map());
                let mut merged = Resource::from_value(serde_json::Value::Object(map))?;
                merged.set_resource_version(
                    existing.resource_version().unwrap_or("0"),
                );
                bump_version(&mut merged);
                merged
            }
            None => {
                let mut created = desired.clone();
                created.set_resource_version("1");
                created
            }
        };
        objects.insert(key, stored.clone());
        Ok(stored)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
