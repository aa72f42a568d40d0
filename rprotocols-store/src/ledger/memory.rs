// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process ledger for tests and development.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rprotocols_core::{ActorId, address_of};
use serde_json::Value;

use crate::ledger::client::{LedgerClient, LedgerError, LedgerRecord, RecordPage, RecordUri};

type Collection = BTreeMap<String, LedgerRecord>;

#[derive(Debug, Default)]
struct InnerMemoryLedger {
    repos: HashMap<(ActorId, String), Collection>,
    next_rkey: u64,
}

/// A `LedgerClient` keeping all repositories in memory.
///
/// Record values are addressed with the same content identifiers as documents. Record keys are
/// sortable, so listings return records in creation order like a remote ledger does.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<InnerMemoryLedger>>,
    /// Only this actor may write when set, like a client with an authenticated session.
    session: Option<ActorId>,
}

impl MemoryLedger {
    /// Ledger accepting writes to every repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client of the same ledger which may only write to the repository of `actor`.
    pub fn session(&self, actor: ActorId) -> Self {
        Self {
            inner: self.inner.clone(),
            session: Some(actor),
        }
    }

    /// Number of records in a collection.
    pub fn len(&self, repo: &ActorId, collection: &str) -> usize {
        self.read_ledger()
            .repos
            .get(&(repo.clone(), collection.to_owned()))
            .map(Collection::len)
            .unwrap_or_default()
    }

    fn read_ledger(&self) -> RwLockReadGuard<'_, InnerMemoryLedger> {
        self.inner
            .read()
            .expect("acquire shared read access on ledger")
    }

    fn write_ledger(&self) -> RwLockWriteGuard<'_, InnerMemoryLedger> {
        self.inner
            .write()
            .expect("acquire exclusive write access on ledger")
    }

    fn authorize(&self, repo: &ActorId) -> Result<(), LedgerError> {
        match &self.session {
            Some(actor) if actor != repo => Err(LedgerError::Unauthorized(repo.clone())),
            _ => Ok(()),
        }
    }

    fn write(
        &self,
        repo: &ActorId,
        collection: &str,
        rkey: Option<&str>,
        value: Value,
    ) -> Result<LedgerRecord, LedgerError> {
        self.authorize(repo)?;
        let cid = address_of(&value).map_err(|err| LedgerError::InvalidRecord(err.to_string()))?;

        let mut ledger = self.write_ledger();
        let rkey = match rkey {
            Some(rkey) => rkey.to_owned(),
            None => {
                ledger.next_rkey += 1;
                format!("{:016x}", ledger.next_rkey)
            }
        };

        let record = LedgerRecord {
            uri: RecordUri::new(repo.clone(), collection, rkey.clone()),
            cid,
            value,
        };
        ledger
            .repos
            .entry((repo.clone(), collection.to_owned()))
            .or_default()
            .insert(rkey, record.clone());
        Ok(record)
    }
}

impl LedgerClient for MemoryLedger {
    async fn list_records(
        &self,
        repo: &ActorId,
        collection: &str,
        limit: usize,
        cursor: Option<String>,
    ) -> Result<RecordPage, LedgerError> {
        let ledger = self.read_ledger();
        let Some(records) = ledger.repos.get(&(repo.clone(), collection.to_owned())) else {
            return Ok(RecordPage::default());
        };

        let limit = limit.max(1);
        let mut page: Vec<LedgerRecord> = records
            .iter()
            .filter(|(rkey, _)| cursor.as_ref().is_none_or(|cursor| *rkey > cursor))
            .take(limit + 1)
            .map(|(_, record)| record.clone())
            .collect();

        let cursor = if page.len() > limit {
            page.truncate(limit);
            page.last().map(|record| record.uri.rkey.clone())
        } else {
            None
        };

        Ok(RecordPage {
            records: page,
            cursor,
        })
    }

    async fn create_record(
        &self,
        repo: &ActorId,
        collection: &str,
        value: Value,
    ) -> Result<LedgerRecord, LedgerError> {
        self.write(repo, collection, None, value)
    }

    async fn put_record(
        &self,
        repo: &ActorId,
        collection: &str,
        rkey: &str,
        value: Value,
    ) -> Result<LedgerRecord, LedgerError> {
        self.write(repo, collection, Some(rkey), value)
    }

    async fn delete_record(
        &self,
        repo: &ActorId,
        collection: &str,
        rkey: &str,
    ) -> Result<bool, LedgerError> {
        self.authorize(repo)?;
        let mut ledger = self.write_ledger();
        Ok(ledger
            .repos
            .get_mut(&(repo.clone(), collection.to_owned()))
            .is_some_and(|records| records.remove(rkey).is_some()))
    }
}
