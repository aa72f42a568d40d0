// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory backend for documents and marks.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rprotocols_core::{Cid, Mark, MarkId, MarkKey, RootId, RootRecord, Slug, Version, VersionRecord};
use serde_json::Value;

use crate::roots::SlugClaim;

/// State of the in-memory store.
#[derive(Clone, Debug, Default)]
pub struct InnerMemoryStore {
    /// Version records per root, ordered by version.
    pub(crate) versions: HashMap<RootId, BTreeMap<Version, VersionRecord>>,
    /// Canonical content by identifier, shared across roots.
    pub(crate) contents: HashMap<Cid, Value>,
    pub(crate) roots: HashMap<RootId, RootRecord>,
    /// Claims of every slug, oldest first.
    pub(crate) slugs: HashMap<Slug, Vec<SlugClaim>>,
    pub(crate) marks: HashMap<MarkId, Mark>,
    /// Mark currently occupying a slot, ended marks are not referenced.
    pub(crate) mark_slots: HashMap<MarkKey, MarkId>,
}

/// An in-memory store implementing every storage capability of the registry.
///
/// `MemoryStore` supports usage in asynchronous and multi-threaded contexts by wrapping an
/// `InnerMemoryStore` with an `RwLock` and `Arc`. Locks are never held across `.await` points,
/// readers get cloned snapshots.
///
/// This does not persist data permanently, all changes are lost when the process ends.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }
}

// Trait implementations are in the regarding modules, see for example `versions` or `marks`.
