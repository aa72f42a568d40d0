// SPDX-License-Identifier: MIT OR Apache-2.0

//! Root registry orchestrating versions, roots and marks on top of the storage backends.
//!
//! A [`Registry`] is composed from a documents backend implementing [`VersionStore`] and
//! [`RootStore`] and a marks backend implementing [`MarkStore`]. Every write touching a root entry
//! holds the lock of that root, writes to different roots run in parallel.
//!
//! Publishing is not atomic across the version store and the root entry. When the root entry
//! could not be written after the version got stored, the version stays reachable by its
//! identifier and version number, publishing it again or calling [`Registry::repair_head`]
//! brings the root entry up to date.
mod builder;
mod lifecycle;
mod marks;

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rprotocols_core::{
    ActorId, Cid, DocumentKind, ForkRef, MarkKey, Release, RootError, RootId, RootRecord,
    Selector, Slug, Stage, Version, VersionRecord, address_of,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::locks::KeyedLocks;
use crate::marks::MarkStore;
use crate::roots::{self, Resolution, RootStore, SlugClaim};
use crate::versions::{self, NewVersion, VersionStore};

pub use builder::RegistryBuilder;
pub use marks::SetMark;

/// Longest slug taken over from a title or source slug, leaving room for prefix and suffix.
const MAX_HINT_LEN: usize = 96;

/// Attempts to find a free root id before giving up.
const MAX_ALLOCATION_ATTEMPTS: usize = 8;

/// Request to publish a version of a root.
#[derive(Clone, Debug)]
pub struct Publish {
    pub root_id: RootId,
    /// Required when the root does not exist yet, must match the root otherwise.
    pub kind: Option<DocumentKind>,
    pub version: Version,
    pub content: Value,
    /// Stage to publish with instead of the default one of the version.
    pub stage: Option<Stage>,
    /// Preferred slug, derived from the root id for new roots when not set.
    pub slug: Option<Slug>,
    pub author: Option<ActorId>,
    pub notes: Option<String>,
}

impl Publish {
    pub fn new(root_id: RootId, version: Version, content: Value) -> Self {
        Self {
            root_id,
            kind: None,
            version,
            content,
            stage: None,
            slug: None,
            author: None,
            notes: None,
        }
    }

    pub fn kind(mut self, kind: DocumentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn slug(mut self, slug: Slug) -> Self {
        self.slug = Some(slug);
        self
    }

    pub fn author(mut self, author: ActorId) -> Self {
        self.author = Some(author);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Request to derive a new root from a version of another one.
#[derive(Clone, Debug)]
pub struct Fork {
    pub source: RootId,
    /// Version to fork, the published head of the source when not set.
    pub version: Option<Version>,
    /// Id of the new root, allocated from the slug of the source when not set.
    pub root_id: Option<RootId>,
    pub slug: Option<Slug>,
    /// Content of the first version, the content of the forked version when not set.
    pub content: Option<Value>,
    pub author: Option<ActorId>,
    pub notes: Option<String>,
}

impl Fork {
    pub fn new(source: RootId) -> Self {
        Self {
            source,
            version: None,
            root_id: None,
            slug: None,
            content: None,
            author: None,
            notes: None,
        }
    }
}

/// Request to create a new need, suite or protocol.
#[derive(Clone, Debug)]
pub struct CreateDocument {
    /// Human readable title, the slug and root id are derived from it.
    pub title: String,
    pub content: Value,
    pub author: Option<ActorId>,
    pub notes: Option<String>,
}

impl CreateDocument {
    pub fn new(title: impl Into<String>, content: Value) -> Self {
        Self {
            title: title.into(),
            content,
            author: None,
            notes: None,
        }
    }
}

/// Registry of versioned needs, suites and protocols and the marks actors put on them.
#[derive(Clone, Debug)]
pub struct Registry<D, M> {
    documents: D,
    marks: M,
    config: RegistryConfig,
    root_locks: KeyedLocks<RootId>,
    mark_locks: KeyedLocks<MarkKey>,
}

impl<D, M> Registry<D, M> {
    /// Compose a registry from its backends.
    ///
    /// The registry is ready after `RegistryBuilder::open` returned.
    pub fn builder(documents: D, marks: M) -> RegistryBuilder<D, M> {
        RegistryBuilder::new(documents, marks)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn marks(&self) -> &M {
        &self.marks
    }
}

impl<D, M> Registry<D, M>
where
    D: VersionStore + RootStore + Sync,
    M: MarkStore + Sync,
    RegistryError: From<<D as VersionStore>::Error>
        + From<<D as RootStore>::Error>
        + From<<M as MarkStore>::Error>,
{
    /// Publish a version of a root, creating the root on first use.
    ///
    /// Re-publishing identical content under an existing version returns the stored release.
    pub async fn publish(&self, publish: Publish) -> Result<Release, RegistryError> {
        let _guard = self.root_locks.lock(&publish.root_id).await;
        self.publish_locked(publish, None).await
    }

    /// Publish with the lock of the root held by the caller.
    async fn publish_locked(
        &self,
        publish: Publish,
        fork_of: Option<ForkRef>,
    ) -> Result<Release, RegistryError> {
        let now = current_timestamp();
        let root_id = publish.root_id;

        let existing = self.documents.get_root(&root_id).await?;
        let kind = match (&existing, publish.kind) {
            (Some(root), Some(kind)) if root.kind != kind => {
                return Err(RegistryError::KindMismatch {
                    root_id,
                    expected: root.kind,
                    found: kind,
                });
            }
            (Some(root), _) => root.kind,
            (None, Some(kind)) => kind,
            (None, None) => return Err(RegistryError::UnknownRoot(root_id)),
        };
        if let Some(root) = existing.as_ref().filter(|root| root.is_deprecated) {
            return self
                .republish_deprecated(root, &publish.version, &publish.content)
                .await;
        }

        let stage = Stage::initial(&publish.version, publish.stage)?;
        let stored = self.documents.latest_version(&root_id).await?;
        let prev_cid = stored.as_ref().map(|record| record.cid);
        // Versions stored by an earlier publish whose root entry write failed.
        let behind = match (&existing, &stored) {
            (Some(root), Some(stored)) => root.entry(&stored.version).is_none(),
            (None, latest) => latest.is_some(),
            (Some(_), None) => false,
        };

        let record = versions::put(
            &self.documents,
            NewVersion {
                root_id: root_id.clone(),
                version: publish.version,
                content: publish.content,
                prev_cid,
                fork_of,
                stage,
                author: publish.author,
                notes: publish.notes,
            },
            now,
        )
        .await?;

        let (mut root, claim) = match existing {
            None => {
                let slug = match publish.slug {
                    Some(slug) => slug,
                    None => Slug::slugify(root_id.as_str())
                        .ok_or_else(|| RegistryError::MissingSlug(root_id.clone()))?,
                };
                let root = RootRecord::new(kind, slug.clone(), &record, record.stage);
                (root, Some(slug))
            }
            Some(mut root) => {
                root.insert_version(&record, record.stage);
                let claim = match publish.slug {
                    Some(slug) if root.rename(slug.clone(), now) => Some(slug),
                    _ => None,
                };
                (root, claim)
            }
        };
        if behind {
            let indexed = self.index_lineage(&mut root).await?;
            warn!(root_id = %root_id, versions = indexed, "indexed versions missing in root entry");
        }

        self.documents.put_root(&root).await?;
        if let Some(slug) = claim {
            self.documents
                .claim_slug(SlugClaim {
                    slug,
                    root_id: root_id.clone(),
                    at: now,
                })
                .await?;
        }

        if self.config.check_lineage {
            versions::chain(&self.documents, &root_id).await?;
        }

        let stage = root.stage_of(&record.version).unwrap_or(record.stage);
        debug!(
            root_id = %root_id,
            version = %record.version,
            cid = %record.cid,
            stage = %stage,
            "published version"
        );
        Ok(Release { record, stage })
    }

    /// Publishing to a deprecated root only succeeds as an identical re-submission.
    async fn republish_deprecated(
        &self,
        root: &RootRecord,
        version: &Version,
        content: &Value,
    ) -> Result<Release, RegistryError> {
        let deprecated = || RegistryError::RootDeprecated(root.root_id.clone());
        let Some(record) = self
            .documents
            .get_version(&root.root_id, version)
            .await?
        else {
            return Err(deprecated());
        };
        if record.cid != address_of(content)? {
            return Err(deprecated());
        }
        let stage = root.stage_of(&record.version).unwrap_or(record.stage);
        Ok(Release { record, stage })
    }

    /// Adds versions of the stored lineage which are missing in the root entry, with the stage
    /// they were published with.
    async fn index_lineage(&self, root: &mut RootRecord) -> Result<usize, RegistryError> {
        let lineage = versions::chain(&self.documents, &root.root_id).await?;
        let mut indexed = 0;
        for record in &lineage {
            if root.insert_version(record, record.stage) {
                indexed += 1;
            }
        }
        Ok(indexed)
    }

    /// Resolve a head of a root.
    pub async fn get_head(
        &self,
        root_id: &RootId,
        selector: Selector,
    ) -> Result<Option<Release>, RegistryError> {
        let Some(root) = self.documents.get_root(root_id).await? else {
            return Ok(None);
        };
        let Some((version, entry)) = root.select(&selector) else {
            return Ok(None);
        };
        self.release(root_id, &version, &entry.cid, entry.stage)
            .await
    }

    /// All indexed versions of a root, oldest first.
    pub async fn list_versions(&self, root_id: &RootId) -> Result<Vec<Release>, RegistryError> {
        let root = self
            .documents
            .get_root(root_id)
            .await?
            .ok_or_else(|| RegistryError::UnknownRoot(root_id.clone()))?;

        let mut releases = Vec::with_capacity(root.versions.len());
        for (version, entry) in &root.versions {
            if let Some(release) = self
                .release(root_id, version, &entry.cid, entry.stage)
                .await?
            {
                releases.push(release);
            }
        }
        Ok(releases)
    }

    async fn release(
        &self,
        root_id: &RootId,
        version: &Version,
        cid: &Cid,
        stage: Stage,
    ) -> Result<Option<Release>, RegistryError> {
        let record = versions::get_by_root_version(
            &self.documents,
            root_id,
            version,
            self.config.verify_content,
        )
        .await?;
        let Some(record) = record else {
            warn!(root_id = %root_id, version = %version, "indexed version missing in store");
            return Ok(None);
        };
        if &record.cid != cid {
            return Err(RegistryError::AddressMismatch {
                expected: *cid,
                actual: record.cid,
            });
        }
        Ok(Some(Release { record, stage }))
    }

    /// Content addressed by `cid`.
    pub async fn get_by_cid(&self, cid: &Cid) -> Result<Option<Value>, RegistryError> {
        versions::get_by_cid(&self.documents, cid, self.config.verify_content).await
    }

    /// Stored version record, also when the root entry does not index it yet.
    pub async fn get_version(
        &self,
        root_id: &RootId,
        version: &Version,
    ) -> Result<Option<VersionRecord>, RegistryError> {
        versions::get_by_root_version(
            &self.documents,
            root_id,
            version,
            self.config.verify_content,
        )
        .await
    }

    pub async fn get_root(&self, root_id: &RootId) -> Result<Option<RootRecord>, RegistryError> {
        Ok(self.documents.get_root(root_id).await?)
    }

    /// Entries of all roots, optionally only of one kind.
    pub async fn list_roots(
        &self,
        kind: Option<DocumentKind>,
    ) -> Result<Vec<RootRecord>, RegistryError> {
        Ok(self.documents.roots(kind).await?)
    }

    /// Resolve a slug, a former slug or a root id.
    pub async fn resolve_slug(&self, name: &str) -> Result<Option<Resolution>, RegistryError> {
        roots::resolve(&self.documents, name).await
    }

    /// Derive a new root from a version of another root.
    ///
    /// The first version of the new root is a draft `0.1` without predecessor, pointing at the
    /// forked version with `fork_of`.
    pub async fn fork(&self, fork: Fork) -> Result<Release, RegistryError> {
        let selector = fork
            .version
            .map(Selector::Version)
            .unwrap_or(Selector::Published);
        let source_root = self
            .documents
            .get_root(&fork.source)
            .await?
            .ok_or_else(|| RegistryError::UnknownRoot(fork.source.clone()))?;
        let source = self
            .get_head(&fork.source, selector)
            .await?
            .ok_or_else(|| match fork.version {
                Some(version) => RegistryError::UnknownVersion(fork.source.clone(), version),
                None => RegistryError::UnknownRoot(fork.source.clone()),
            })?;

        let fork_of = ForkRef {
            root_id: fork.source.clone(),
            version: source.version(),
            cid: *source.cid(),
        };
        let mut publish = Publish::new(
            fork.source.clone(),
            Version::first_draft(),
            fork.content.unwrap_or(source.record.content),
        )
        .kind(source_root.kind)
        .stage(Stage::Draft);
        publish.author = fork.author;
        publish.notes = fork.notes;

        match fork.root_id {
            Some(root_id) => {
                let _guard = self.root_locks.lock(&root_id).await;
                if !self.is_vacant(&root_id, None).await? {
                    return Err(RegistryError::RootExists(root_id));
                }
                publish.root_id = root_id;
                publish.slug = fork.slug;
                self.publish_locked(publish, Some(fork_of)).await
            }
            None => {
                let hint = fork.slug.unwrap_or(source_root.slug);
                self.publish_fresh(publish, &hint, Some(fork_of)).await
            }
        }
    }

    pub async fn create_need(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        self.create(DocumentKind::Need, create).await
    }

    pub async fn create_suite(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        self.create(DocumentKind::Suite, create).await
    }

    pub async fn create_protocol(
        &self,
        create: CreateDocument,
    ) -> Result<Release, RegistryError> {
        self.create(DocumentKind::Protocol, create).await
    }

    /// Allocate a root for a new document and publish its first draft.
    async fn create(
        &self,
        kind: DocumentKind,
        create: CreateDocument,
    ) -> Result<Release, RegistryError> {
        let hint = match Slug::slugify(&create.title) {
            Some(slug) => slug,
            None => Slug::new(kind.as_str())?,
        };

        let mut publish = Publish::new(
            RootId::from(hint.clone()),
            Version::first_draft(),
            create.content,
        )
        .kind(kind)
        .stage(Stage::Draft);
        publish.author = create.author;
        publish.notes = create.notes;

        self.publish_fresh(publish, &hint, None).await
    }

    /// Publish the first version of a root with an id and slug derived from `hint`.
    ///
    /// The id is `root-{slug}`, a random suffix gets appended to the slug while the id or slug is
    /// taken.
    async fn publish_fresh(
        &self,
        mut publish: Publish,
        hint: &Slug,
        fork_of: Option<ForkRef>,
    ) -> Result<Release, RegistryError> {
        let base = shorten(hint);
        let mut slug = base.clone();
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let root_id = RootId::new(format!("root-{slug}"))?;

            let _guard = self.root_locks.lock(&root_id).await;
            if self.is_vacant(&root_id, Some(&slug)).await? {
                publish.root_id = root_id;
                publish.slug = Some(slug);
                return self.publish_locked(publish, fork_of).await;
            }

            let suffix = hex::encode(rand::random::<[u8; 3]>());
            slug = Slug::new(format!("{base}-{suffix}"))?;
        }
        Err(RegistryError::RootExists(RootId::new(format!("root-{base}"))?))
    }

    /// Returns `true` if nothing was ever stored under this root id or claimed this slug.
    async fn is_vacant(&self, root_id: &RootId, slug: Option<&Slug>) -> Result<bool, RegistryError> {
        if self.documents.get_root(root_id).await?.is_some() {
            return Ok(false);
        }
        if !self.documents.versions(root_id).await?.is_empty() {
            return Ok(false);
        }
        match slug {
            Some(slug) => Ok(self.documents.slug_claims(slug).await?.is_empty()),
            None => Ok(true),
        }
    }

    /// Make `slug` the preferred slug of a root, keeping the current one as alias.
    pub async fn rename_slug(
        &self,
        root_id: &RootId,
        slug: Slug,
    ) -> Result<RootRecord, RegistryError> {
        let _guard = self.root_locks.lock(root_id).await;
        let mut root = self.require_root(root_id).await?;

        let now = current_timestamp();
        if root.rename(slug.clone(), now) {
            self.documents.put_root(&root).await?;
            self.documents
                .claim_slug(SlugClaim {
                    slug,
                    root_id: root_id.clone(),
                    at: now,
                })
                .await?;
            debug!(root_id = %root_id, slug = %root.slug, "renamed root");
        }
        Ok(root)
    }

    /// Deprecate a whole root, optionally pointing at the root replacing it.
    ///
    /// Deprecation is terminal, the root does not accept new versions afterwards.
    pub async fn deprecate_root(
        &self,
        root_id: &RootId,
        successor: Option<RootId>,
        note: Option<String>,
    ) -> Result<RootRecord, RegistryError> {
        let _guard = self.root_locks.lock(root_id).await;
        let mut root = self.require_root(root_id).await?;

        if let Some(successor) = &successor {
            if successor == root_id {
                return Err(RegistryError::SelfSuccessor(root_id.clone()));
            }
            self.check_successor_chain(root_id, successor).await?;
        }

        root.deprecate(successor, note, current_timestamp())
            .map_err(|err| root_error(root_id, err))?;
        self.documents.put_root(&root).await?;
        debug!(root_id = %root_id, successor = ?root.successor_root_id, "deprecated root");
        Ok(root)
    }

    /// Follows the successors of `successor` and fails if they lead back to `root_id`.
    async fn check_successor_chain(
        &self,
        root_id: &RootId,
        successor: &RootId,
    ) -> Result<(), RegistryError> {
        let mut visited = HashSet::from([root_id.clone()]);
        let mut next = Some(successor.clone());
        while let Some(current) = next {
            if !visited.insert(current.clone()) {
                return Err(RegistryError::SuccessorCycle(root_id.clone()));
            }
            let root = self.require_root(&current).await?;
            next = root.successor_root_id;
        }
        Ok(())
    }

    /// Bring the root entry up to date with the lineage in the version store.
    ///
    /// Versions missing in the index get added with the stage they were published with. Calling
    /// this on an up-to-date root changes nothing.
    pub async fn repair_head(&self, root_id: &RootId) -> Result<RootRecord, RegistryError> {
        let _guard = self.root_locks.lock(root_id).await;
        let mut root = self.require_root(root_id).await?;

        let repaired = self.index_lineage(&mut root).await?;
        if repaired > 0 {
            self.documents.put_root(&root).await?;
            warn!(root_id = %root_id, versions = repaired, "repaired root head");
        }
        Ok(root)
    }

    async fn require_root(&self, root_id: &RootId) -> Result<RootRecord, RegistryError> {
        self.documents
            .get_root(root_id)
            .await?
            .ok_or_else(|| RegistryError::UnknownRoot(root_id.clone()))
    }
}

/// Cuts a slug down so prefix and suffix still fit into an id.
fn shorten(slug: &Slug) -> Slug {
    if slug.as_str().len() <= MAX_HINT_LEN {
        return slug.clone();
    }
    Slug::slugify(&slug.as_str()[..MAX_HINT_LEN]).unwrap_or_else(|| slug.clone())
}

fn root_error(root_id: &RootId, err: RootError) -> RegistryError {
    match err {
        RootError::UnknownVersion(version) => RegistryError::UnknownVersion(root_id.clone(), version),
        RootError::Deprecated(root_id) => RegistryError::RootDeprecated(root_id),
        RootError::SelfSuccessor(root_id) => RegistryError::SelfSuccessor(root_id),
        RootError::Stage(err) => RegistryError::Stage(err),
    }
}

/// UNIX timestamp in seconds.
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
