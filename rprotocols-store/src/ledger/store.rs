// SPDX-License-Identifier: MIT OR Apache-2.0

use rprotocols_core::{
    ActorId, DocumentKind, Mark, MarkId, MarkKey, MarkStatus, MarkVerb, RootId, Version,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{trace, warn};

use crate::config::{DEFAULT_LEDGER_PAGE_SIZE, RegistryConfig};
use crate::ledger::client::{LedgerClient, LedgerError, LedgerRecord, RecordUri};
use crate::marks::{MarkStore, NewMark};

/// Collection marks are stored in.
pub const MARK_COLLECTION: &str = "org.rp.mark";

/// Record type of mark subjects.
pub const STRONG_REF_TYPE: &str = "com.atproto.repo.strongRef";

/// Value of a mark record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkRecord {
    #[serde(rename = "$type")]
    record_type: String,
    verb: MarkVerb,
    subject: MarkSubject,
    status: MarkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkSubject {
    #[serde(rename = "$type")]
    record_type: String,
    /// Root id of the marked document.
    uri: RootId,
    kind: DocumentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<Version>,
}

impl MarkSubject {
    fn new(kind: DocumentKind, root_id: RootId, version: Option<Version>) -> Self {
        Self {
            record_type: STRONG_REF_TYPE.to_owned(),
            uri: root_id,
            kind,
            version,
        }
    }
}

impl MarkRecord {
    fn into_mark(self, id: MarkId, actor: ActorId) -> Mark {
        Mark {
            id,
            verb: self.verb,
            subject_kind: self.subject.kind,
            subject_root_id: self.subject.uri,
            subject_version: self.subject.version,
            status: self.status,
            actor,
            context: self.context,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<&Mark> for MarkRecord {
    fn from(mark: &Mark) -> Self {
        Self {
            record_type: MARK_COLLECTION.to_owned(),
            verb: mark.verb,
            subject: MarkSubject::new(
                mark.subject_kind,
                mark.subject_root_id.clone(),
                mark.subject_version,
            ),
            status: mark.status,
            context: mark.context.clone(),
            created_at: mark.created_at,
            updated_at: mark.updated_at,
        }
    }
}

impl From<&NewMark> for MarkRecord {
    fn from(mark: &NewMark) -> Self {
        Self {
            record_type: MARK_COLLECTION.to_owned(),
            verb: mark.verb,
            subject: MarkSubject::new(
                mark.subject_kind,
                mark.subject_root_id.clone(),
                mark.subject_version,
            ),
            status: mark.status,
            context: mark.context.clone(),
            created_at: mark.created_at,
            updated_at: None,
        }
    }
}

fn to_value(record: &MarkRecord) -> Result<Value, LedgerError> {
    serde_json::to_value(record).map_err(|err| LedgerError::InvalidRecord(err.to_string()))
}

/// Marks stored as `org.rp.mark` records in the repository of the marking actor.
///
/// The record URI serves as mark id. Ledgers have no secondary indexes, so looking up the mark of
/// a slot lists all mark records of the actor page by page.
#[derive(Clone, Debug)]
pub struct LedgerMarkStore<C> {
    client: C,
    page_size: usize,
}

impl<C> LedgerMarkStore<C>
where
    C: LedgerClient + Sync,
{
    pub fn new(client: C) -> Self {
        Self {
            client,
            page_size: DEFAULT_LEDGER_PAGE_SIZE,
        }
    }

    pub fn from_config(client: C, config: &RegistryConfig) -> Self {
        Self::new(client).page_size(config.ledger_page_size)
    }

    /// Records requested per listing page.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Lists all mark records of an actor.
    ///
    /// Records which do not parse as marks are skipped.
    async fn all_marks(&self, actor: &ActorId) -> Result<Vec<Mark>, LedgerError> {
        let mut marks = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .client
                .list_records(actor, MARK_COLLECTION, self.page_size, cursor)
                .await?;
            trace!(actor = %actor, records = page.records.len(), "listed mark records");

            marks.extend(page.records.into_iter().filter_map(|record| parse(actor, record)));

            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(marks)
    }
}

fn parse(actor: &ActorId, record: LedgerRecord) -> Option<Mark> {
    match serde_json::from_value::<MarkRecord>(record.value) {
        Ok(value) => Some(value.into_mark(MarkId::new(record.uri.to_string()), actor.clone())),
        Err(err) => {
            warn!(uri = %record.uri, "skipping malformed mark record: {err}");
            None
        }
    }
}

impl<C> MarkStore for LedgerMarkStore<C>
where
    C: LedgerClient + Sync,
{
    type Error = LedgerError;

    async fn insert_mark(&self, mark: NewMark) -> Result<Mark, Self::Error> {
        let value = to_value(&MarkRecord::from(&mark))?;
        let record = self
            .client
            .create_record(&mark.actor, MARK_COLLECTION, value)
            .await?;
        Ok(mark.into_mark(MarkId::new(record.uri.to_string())))
    }

    async fn update_mark(&self, mark: &Mark) -> Result<bool, Self::Error> {
        let uri: RecordUri = mark.id.as_str().parse()?;
        let exists = self
            .all_marks(&uri.repo)
            .await?
            .iter()
            .any(|stored| stored.id == mark.id);
        if !exists {
            return Ok(false);
        }

        let value = to_value(&MarkRecord::from(mark))?;
        self.client
            .put_record(&uri.repo, &uri.collection, &uri.rkey, value)
            .await?;
        Ok(true)
    }

    async fn delete_mark(&self, id: &MarkId) -> Result<bool, Self::Error> {
        let uri: RecordUri = id.as_str().parse()?;
        self.client
            .delete_record(&uri.repo, &uri.collection, &uri.rkey)
            .await
    }

    async fn find_mark(&self, key: &MarkKey) -> Result<Option<Mark>, Self::Error> {
        let marks = self.all_marks(&key.actor).await?;
        Ok(marks
            .into_iter()
            .rev()
            .find(|mark| mark.key() == *key && !mark.is_ended()))
    }

    async fn list_marks(
        &self,
        actor: &ActorId,
        verb: Option<MarkVerb>,
    ) -> Result<Vec<Mark>, Self::Error> {
        let mut marks = self.all_marks(actor).await?;
        marks.retain(|mark| verb.is_none_or(|verb| mark.verb == verb));
        Ok(marks)
    }
}
