// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interface to a remote, per-actor signed record repository.
use std::fmt;
use std::str::FromStr;

use rprotocols_core::{ActorId, Cid, IdError};
use serde_json::Value;
use thiserror::Error;

/// URI scheme of ledger records.
pub const RECORD_URI_SCHEME: &str = "at://";

/// Location of a record: `at://{repo}/{collection}/{rkey}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordUri {
    pub repo: ActorId,
    pub collection: String,
    pub rkey: String,
}

impl RecordUri {
    pub fn new(repo: ActorId, collection: impl Into<String>, rkey: impl Into<String>) -> Self {
        Self {
            repo,
            collection: collection.into(),
            rkey: rkey.into(),
        }
    }
}

impl fmt::Display for RecordUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{RECORD_URI_SCHEME}{}/{}/{}",
            self.repo, self.collection, self.rkey
        )
    }
}

impl FromStr for RecordUri {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidUri(value.to_owned());

        let path = value.strip_prefix(RECORD_URI_SCHEME).ok_or_else(invalid)?;
        // Repositories are DIDs which never contain a slash, the record key is the last segment.
        let mut segments = path.split('/');
        let (Some(repo), Some(collection), Some(rkey), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(invalid());
        };
        if collection.is_empty() || rkey.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(ActorId::new(repo)?, collection, rkey))
    }
}

/// A record as stored in a ledger repository.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerRecord {
    pub uri: RecordUri,
    /// Identifier of the record value.
    pub cid: Cid,
    pub value: Value,
}

/// One page of a record listing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<LedgerRecord>,
    /// Pass this to the next `list_records` call to continue, `None` on the last page.
    pub cursor: Option<String>,
}

/// Client of a remote record repository.
///
/// Two variants of the trait are provided: one which is thread-safe (implementing `Send`) and one
/// which is purely intended for single-threaded execution contexts.
///
/// Writes are signed by the session of the client and usually only allowed in the repository of
/// the authenticated actor.
#[trait_variant::make(LedgerClient: Send)]
pub trait LocalLedgerClient {
    /// List records of a collection in creation order.
    async fn list_records(
        &self,
        repo: &ActorId,
        collection: &str,
        limit: usize,
        cursor: Option<String>,
    ) -> Result<RecordPage, LedgerError>;

    /// Create a record with a record key chosen by the ledger.
    async fn create_record(
        &self,
        repo: &ActorId,
        collection: &str,
        value: Value,
    ) -> Result<LedgerRecord, LedgerError>;

    /// Create or replace the record at `rkey`.
    async fn put_record(
        &self,
        repo: &ActorId,
        collection: &str,
        rkey: &str,
        value: Value,
    ) -> Result<LedgerRecord, LedgerError>;

    /// Remove a record.
    ///
    /// Returns `false` if there was no record at `rkey`.
    async fn delete_record(
        &self,
        repo: &ActorId,
        collection: &str,
        rkey: &str,
    ) -> Result<bool, LedgerError>;
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The session is not allowed to write to this repository.
    #[error("not authorized to write to repository '{0}'")]
    Unauthorized(ActorId),

    #[error("invalid record uri '{0}'")]
    InvalidUri(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Id(#[from] IdError),

    /// The remote could not be reached or answered with an error.
    #[error("ledger request failed: {0}")]
    Request(String),
}
