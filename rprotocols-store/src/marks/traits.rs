// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{Debug, Display};

use rprotocols_core::{ActorId, Mark, MarkId, MarkKey, MarkVerb};

use crate::marks::NewMark;

/// Interface for storing and querying marks.
///
/// Two variants of the trait are provided: one which is thread-safe (implementing `Send`) and one
/// which is purely intended for single-threaded execution contexts.
///
/// Backends do not enforce that only one mark per slot is live, callers serialize writes per
/// `MarkKey` and look up the slot with `find_mark` before inserting.
#[trait_variant::make(MarkStore: Send)]
pub trait LocalMarkStore {
    type Error: Display + Debug + Send;

    /// Insert a new mark.
    ///
    /// Returns the stored mark with the identifier assigned by the backend.
    async fn insert_mark(&self, mark: NewMark) -> Result<Mark, Self::Error>;

    /// Replace a stored mark with the same identifier.
    ///
    /// Returns `false` if no such mark exists and nothing was written.
    async fn update_mark(&self, mark: &Mark) -> Result<bool, Self::Error>;

    /// Remove a mark.
    ///
    /// Returns `true` when the removal occurred and `false` when the mark was not found.
    async fn delete_mark(&self, id: &MarkId) -> Result<bool, Self::Error>;

    /// Returns the mark occupying a slot, that is the newest one which has not ended.
    async fn find_mark(&self, key: &MarkKey) -> Result<Option<Mark>, Self::Error>;

    /// All marks of an actor in any status, optionally only with one verb, oldest first.
    async fn list_marks(
        &self,
        actor: &ActorId,
        verb: Option<MarkVerb>,
    ) -> Result<Vec<Mark>, Self::Error>;
}
