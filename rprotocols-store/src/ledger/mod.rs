// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marks kept in per-actor record repositories of a remote ledger.
//!
//! Every mark is a record of the `org.rp.mark` collection in the repository of the marking actor,
//! written through a `LedgerClient` holding the actor's session. `MemoryLedger` is an in-process
//! ledger for tests and development.
mod client;
#[cfg(feature = "memory")]
mod memory;
mod store;
#[cfg(test)]
mod tests;

pub use client::{
    LedgerClient, LedgerError, LedgerRecord, LocalLedgerClient, RECORD_URI_SCHEME, RecordPage,
    RecordUri,
};
#[cfg(feature = "memory")]
pub use memory::MemoryLedger;
pub use store::{LedgerMarkStore, MARK_COLLECTION, STRONG_REF_TYPE};

use crate::error::RegistryError;

impl From<LedgerError> for RegistryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unauthorized(repo) => RegistryError::Unauthorized(format!(
                "session may not write to repository '{repo}'"
            )),
            err => RegistryError::Backend(err.to_string()),
        }
    }
}
