// SPDX-License-Identifier: MIT OR Apache-2.0

//! Root entries and slug resolution.
#[cfg(feature = "memory")]
mod memory;
pub mod traits;

use rprotocols_core::{RootId, RootRecord, Slug};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

pub use traits::RootStore;

/// A root taking a slug at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugClaim {
    pub slug: Slug,
    pub root_id: RootId,
    pub at: u64,
}

/// Outcome of resolving a slug or root id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub root_id: RootId,
    /// Current slug of the root.
    pub preferred_slug: Slug,
    /// Root replacing this one, if it got deprecated with a successor.
    pub successor_root_id: Option<RootId>,
    /// `true` if the resolved name is not the preferred slug and callers should redirect.
    pub redirect: bool,
}

impl Resolution {
    fn new(root: &RootRecord, name: &str) -> Self {
        Self {
            root_id: root.root_id.clone(),
            preferred_slug: root.slug.clone(),
            successor_root_id: root.successor_root_id.clone(),
            redirect: root.slug.as_str() != name,
        }
    }
}

/// Resolves a slug, an older alias or a root id to a root.
///
/// When several roots claimed the same slug, the most recent claim wins. A name which was never
/// claimed as a slug is looked up as root id.
pub async fn resolve<S>(store: &S, name: &str) -> Result<Option<Resolution>, RegistryError>
where
    S: RootStore,
    RegistryError: From<S::Error>,
{
    if let Ok(slug) = Slug::new(name) {
        let claims = store.slug_claims(&slug).await?;
        if let Some(claim) = claims.last() {
            if let Some(root) = store.get_root(&claim.root_id).await? {
                return Ok(Some(Resolution::new(&root, name)));
            }
        }
    }

    let Ok(root_id) = RootId::new(name) else {
        return Ok(None);
    };
    Ok(store
        .get_root(&root_id)
        .await?
        .map(|root| Resolution::new(&root, name)))
}
