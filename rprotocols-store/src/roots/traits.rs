// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{Debug, Display};

use rprotocols_core::{DocumentKind, RootId, RootRecord, Slug};

use crate::roots::SlugClaim;

/// Interface for storing root entries and the slugs pointing at them.
///
/// Two variants of the trait are provided: one which is thread-safe (implementing `Send`) and one
/// which is purely intended for single-threaded execution contexts.
#[trait_variant::make(RootStore: Send)]
pub trait LocalRootStore {
    type Error: Display + Debug + Send;

    /// Get the entry of a root.
    async fn get_root(&self, root_id: &RootId) -> Result<Option<RootRecord>, Self::Error>;

    /// Insert or replace the entry of a root.
    async fn put_root(&self, root: &RootRecord) -> Result<(), Self::Error>;

    /// Record that a root claims a slug.
    ///
    /// Claims are never removed. Returns `false` if the root already holds the most recent claim
    /// of this slug and nothing was recorded.
    async fn claim_slug(&self, claim: SlugClaim) -> Result<bool, Self::Error>;

    /// All claims of a slug, oldest first.
    async fn slug_claims(&self, slug: &Slug) -> Result<Vec<SlugClaim>, Self::Error>;

    /// Entries of all roots, optionally only of one kind, ordered by root id.
    async fn roots(&self, kind: Option<DocumentKind>) -> Result<Vec<RootRecord>, Self::Error>;
}
