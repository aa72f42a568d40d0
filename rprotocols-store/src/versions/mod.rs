// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable, content-addressed document versions and their lineage.
//!
//! Every root has a backward chain of versions: each version after the first points at the
//! identifier of its predecessor with `prev_cid`. The functions in this module enforce the rules
//! of that chain on top of any [`VersionStore`] backend:
//!
//! - a `(root, version)` slot is written once, re-submitting the same content is a no-op,
//! - version numbers of a root strictly increase,
//! - `prev_cid` always names the newest version of the root at the time of writing,
//! - a root never re-publishes content one of its earlier versions already addresses, which keeps
//!   its chain free of cycles.
#[cfg(feature = "memory")]
mod memory;
#[cfg(test)]
mod tests;
pub mod traits;

use std::collections::{HashMap, HashSet};

use rprotocols_core::{
    ActorId, Cid, ForkRef, RootId, Stage, Version, VersionRecord, address_of, canonicalize,
};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::RegistryError;

pub use traits::VersionStore;

/// A version about to be written.
#[derive(Clone, Debug)]
pub struct NewVersion {
    pub root_id: RootId,
    pub version: Version,
    /// Payload, canonicalized before it gets addressed.
    pub content: Value,
    /// Identifier of the newest version of the root, `None` for its first version.
    pub prev_cid: Option<Cid>,
    pub fork_of: Option<ForkRef>,
    /// Stage the version enters the root entry with.
    pub stage: Stage,
    pub author: Option<ActorId>,
    pub notes: Option<String>,
}

/// Writes a new version.
///
/// Returns the stored record. Submitting content identical to what is already stored at
/// `(root, version)` returns the existing record without writing anything.
pub async fn put<S>(
    store: &S,
    new: NewVersion,
    created_at: u64,
) -> Result<VersionRecord, RegistryError>
where
    S: VersionStore,
    RegistryError: From<S::Error>,
{
    let content = canonicalize(&new.content)?;
    let cid = address_of(&content)?;

    if let Some(existing) = store.get_version(&new.root_id, &new.version).await? {
        return resubmitted(existing, cid);
    }

    let versions = store.versions(&new.root_id).await?;
    let latest = versions.last();
    match latest {
        Some(latest) if new.version <= latest.version => {
            return Err(RegistryError::StaleVersion {
                root_id: new.root_id,
                version: new.version,
                latest: latest.version,
            });
        }
        _ => (),
    }

    let expected = latest.map(|record| record.cid);
    if new.prev_cid != expected {
        return Err(RegistryError::PreviousMismatch {
            root_id: new.root_id,
            expected,
            found: new.prev_cid,
        });
    }

    if versions.iter().any(|record| record.cid == cid) {
        return Err(RegistryError::LineageCycle {
            root_id: new.root_id,
            cid,
        });
    }

    let record = VersionRecord {
        root_id: new.root_id,
        version: new.version,
        cid,
        prev_cid: new.prev_cid,
        content,
        fork_of: new.fork_of,
        stage: new.stage,
        created_at,
        author: new.author,
        notes: new.notes,
    };

    match store.insert_version(&record).await? {
        None => {
            debug!(root_id = %record.root_id, version = %record.version, cid = %record.cid, "stored version");
            Ok(record)
        }
        // Someone else wrote the slot in the meantime.
        Some(existing) => resubmitted(existing, cid),
    }
}

fn resubmitted(existing: VersionRecord, cid: Cid) -> Result<VersionRecord, RegistryError> {
    if existing.cid == cid {
        trace!(root_id = %existing.root_id, version = %existing.version, "version already stored");
        Ok(existing)
    } else {
        Err(RegistryError::ImmutableConflict {
            root_id: existing.root_id,
            version: existing.version,
            existing: existing.cid,
            new: cid,
        })
    }
}

/// Returns the lineage of a root from its first to its newest version.
///
/// The chain is obtained by following `prev_cid` backwards from the newest version. It has to
/// visit every stored version in version order, otherwise the lineage is broken.
pub async fn chain<S>(store: &S, root_id: &RootId) -> Result<Vec<VersionRecord>, RegistryError>
where
    S: VersionStore,
    RegistryError: From<S::Error>,
{
    let versions = store.versions(root_id).await?;
    let Some(head) = versions.last() else {
        return Ok(Vec::new());
    };

    let by_cid: HashMap<Cid, &VersionRecord> =
        versions.iter().map(|record| (record.cid, record)).collect();

    let mut visited = HashSet::new();
    let mut lineage = Vec::with_capacity(versions.len());
    let mut next = Some(head);
    while let Some(record) = next {
        if !visited.insert(record.cid) {
            return Err(RegistryError::LineageCycle {
                root_id: root_id.clone(),
                cid: record.cid,
            });
        }
        lineage.push(record.clone());

        next = match &record.prev_cid {
            Some(prev_cid) => Some(
                by_cid
                    .get(prev_cid)
                    .copied()
                    .ok_or_else(|| RegistryError::BrokenLineage(root_id.clone()))?,
            ),
            None => None,
        };
    }
    lineage.reverse();

    if lineage != versions {
        return Err(RegistryError::BrokenLineage(root_id.clone()));
    }

    Ok(lineage)
}

/// Get content by its identifier.
///
/// With `verify` set the content gets re-addressed and compared with `cid`.
pub async fn get_by_cid<S>(
    store: &S,
    cid: &Cid,
    verify: bool,
) -> Result<Option<Value>, RegistryError>
where
    S: VersionStore,
    RegistryError: From<S::Error>,
{
    let Some(content) = store.get_content(cid).await? else {
        return Ok(None);
    };
    if verify {
        check_address(&content, cid)?;
    }
    Ok(Some(content))
}

/// Get a version of a root.
///
/// With `verify` set the content gets re-addressed and compared with the stored identifier.
pub async fn get_by_root_version<S>(
    store: &S,
    root_id: &RootId,
    version: &Version,
    verify: bool,
) -> Result<Option<VersionRecord>, RegistryError>
where
    S: VersionStore,
    RegistryError: From<S::Error>,
{
    let Some(record) = store.get_version(root_id, version).await? else {
        return Ok(None);
    };
    if verify {
        check_address(&record.content, &record.cid)?;
    }
    Ok(Some(record))
}

fn check_address(content: &Value, expected: &Cid) -> Result<(), RegistryError> {
    let actual = address_of(content)?;
    if &actual != expected {
        return Err(RegistryError::AddressMismatch {
            expected: *expected,
            actual,
        });
    }
    Ok(())
}
