// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{Debug, Display};

use rprotocols_core::{Cid, RootId, Version, VersionRecord};
use serde_json::Value;

/// Interface for storing and querying immutable document versions.
///
/// Two variants of the trait are provided: one which is thread-safe (implementing `Send`) and one
/// which is purely intended for single-threaded execution contexts.
///
/// Backends only store and look up records. Lineage and immutability rules are enforced by the
/// functions in the `versions` module on top of this interface.
#[trait_variant::make(VersionStore: Send)]
pub trait LocalVersionStore {
    type Error: Display + Debug + Send;

    /// Insert a version record unless the `(root, version)` slot is taken.
    ///
    /// Returns `None` when the insert occurred, or the record occupying the slot otherwise. An
    /// existing record is never overwritten.
    async fn insert_version(
        &self,
        record: &VersionRecord,
    ) -> Result<Option<VersionRecord>, Self::Error>;

    /// Get a version of a root.
    async fn get_version(
        &self,
        root_id: &RootId,
        version: &Version,
    ) -> Result<Option<VersionRecord>, Self::Error>;

    /// Get canonical content by its identifier, regardless of the root it was published in.
    async fn get_content(&self, cid: &Cid) -> Result<Option<Value>, Self::Error>;

    /// All versions of a root, ordered by ascending version number.
    async fn versions(&self, root_id: &RootId) -> Result<Vec<VersionRecord>, Self::Error>;

    /// The version of a root with the highest version number.
    async fn latest_version(&self, root_id: &RootId)
    -> Result<Option<VersionRecord>, Self::Error>;
}
