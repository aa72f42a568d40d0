// SPDX-License-Identifier: MIT OR Apache-2.0

use std::convert::Infallible;

use rprotocols_core::{DocumentKind, RootId, RootRecord, Slug};

use crate::memory::MemoryStore;
use crate::roots::{RootStore, SlugClaim};

impl RootStore for MemoryStore {
    type Error = Infallible;

    async fn get_root(&self, root_id: &RootId) -> Result<Option<RootRecord>, Self::Error> {
        Ok(self.read_store().roots.get(root_id).cloned())
    }

    async fn put_root(&self, root: &RootRecord) -> Result<(), Self::Error> {
        let mut store = self.write_store();
        store.roots.insert(root.root_id.clone(), root.clone());
        Ok(())
    }

    async fn claim_slug(&self, claim: SlugClaim) -> Result<bool, Self::Error> {
        let mut store = self.write_store();
        let claims = store.slugs.entry(claim.slug.clone()).or_default();
        if claims.last().is_some_and(|last| last.root_id == claim.root_id) {
            return Ok(false);
        }
        claims.push(claim);
        Ok(true)
    }

    async fn slug_claims(&self, slug: &Slug) -> Result<Vec<SlugClaim>, Self::Error> {
        Ok(self
            .read_store()
            .slugs
            .get(slug)
            .cloned()
            .unwrap_or_default())
    }

    async fn roots(&self, kind: Option<DocumentKind>) -> Result<Vec<RootRecord>, Self::Error> {
        let store = self.read_store();
        let mut roots: Vec<RootRecord> = store
            .roots
            .values()
            .filter(|root| kind.is_none_or(|kind| root.kind == kind))
            .cloned()
            .collect();
        roots.sort_by(|a, b| a.root_id.cmp(&b.root_id));
        Ok(roots)
    }
}
