// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository interface exposed to applications.
//!
//! Reads and writes are separate traits, so a deployment can route them to different
//! implementations with [`SplitRepository`], for example reading from a local cache while writing
//! through a registry backed by a remote ledger.
use rprotocols_core::{
    ActorId, Cid, DocumentKind, Mark, MarkVerb, Release, RootId, RootRecord, Selector, Slug, Stage,
    Version, VersionRecord,
};
use serde_json::Value;

use crate::error::RegistryError;
use crate::marks::MarkStore;
use crate::registry::{CreateDocument, Fork, Publish, Registry, SetMark};
use crate::roots::{Resolution, RootStore};
use crate::versions::VersionStore;

/// Read side of the repository.
///
/// Two variants of the trait are provided: one which is thread-safe (implementing `Send`) and one
/// which is purely intended for single-threaded execution contexts.
#[trait_variant::make(RepositoryRead: Send)]
pub trait LocalRepositoryRead {
    async fn resolve_slug(&self, name: &str) -> Result<Option<Resolution>, RegistryError>;

    async fn get_head(
        &self,
        root_id: &RootId,
        selector: Selector,
    ) -> Result<Option<Release>, RegistryError>;

    async fn list_versions(&self, root_id: &RootId) -> Result<Vec<Release>, RegistryError>;

    async fn get_by_cid(&self, cid: &Cid) -> Result<Option<Value>, RegistryError>;

    /// Stored version record, whether or not the root entry indexes it.
    async fn get_version(
        &self,
        root_id: &RootId,
        version: &Version,
    ) -> Result<Option<VersionRecord>, RegistryError>;

    /// Active marks of an actor.
    async fn list_marks(
        &self,
        actor: &ActorId,
        verb: Option<MarkVerb>,
    ) -> Result<Vec<Mark>, RegistryError>;

    async fn get_root(&self, root_id: &RootId) -> Result<Option<RootRecord>, RegistryError>;

    async fn list_roots(&self, kind: Option<DocumentKind>)
    -> Result<Vec<RootRecord>, RegistryError>;
}

/// Write side of the repository.
///
/// Two variants of the trait are provided: one which is thread-safe (implementing `Send`) and one
/// which is purely intended for single-threaded execution contexts.
#[trait_variant::make(RepositoryWrite: Send)]
pub trait LocalRepositoryWrite {
    async fn publish(&self, publish: Publish) -> Result<Release, RegistryError>;

    async fn promote(
        &self,
        root_id: &RootId,
        version: &Version,
        to: Stage,
        note: Option<String>,
    ) -> Result<Release, RegistryError>;

    async fn set_mark(&self, set: SetMark) -> Result<Mark, RegistryError>;

    async fn clear_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError>;

    async fn pause_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError>;

    async fn create_need(&self, create: CreateDocument) -> Result<Release, RegistryError>;

    async fn create_suite(&self, create: CreateDocument) -> Result<Release, RegistryError>;

    async fn create_protocol(&self, create: CreateDocument) -> Result<Release, RegistryError>;

    async fn fork(&self, fork: Fork) -> Result<Release, RegistryError>;

    async fn rename_slug(&self, root_id: &RootId, slug: Slug)
    -> Result<RootRecord, RegistryError>;

    async fn deprecate_root(
        &self,
        root_id: &RootId,
        successor: Option<RootId>,
        note: Option<String>,
    ) -> Result<RootRecord, RegistryError>;
}

impl<D, M> RepositoryRead for Registry<D, M>
where
    D: VersionStore + RootStore + Sync,
    M: MarkStore + Sync,
    RegistryError: From<<D as VersionStore>::Error>
        + From<<D as RootStore>::Error>
        + From<<M as MarkStore>::Error>,
{
    async fn resolve_slug(&self, name: &str) -> Result<Option<Resolution>, RegistryError> {
        Registry::resolve_slug(self, name).await
    }

    async fn get_head(
        &self,
        root_id: &RootId,
        selector: Selector,
    ) -> Result<Option<Release>, RegistryError> {
        Registry::get_head(self, root_id, selector).await
    }

    async fn list_versions(&self, root_id: &RootId) -> Result<Vec<Release>, RegistryError> {
        Registry::list_versions(self, root_id).await
    }

    async fn get_by_cid(&self, cid: &Cid) -> Result<Option<Value>, RegistryError> {
        Registry::get_by_cid(self, cid).await
    }

    async fn get_version(
        &self,
        root_id: &RootId,
        version: &Version,
    ) -> Result<Option<VersionRecord>, RegistryError> {
        Registry::get_version(self, root_id, version).await
    }

    async fn list_marks(
        &self,
        actor: &ActorId,
        verb: Option<MarkVerb>,
    ) -> Result<Vec<Mark>, RegistryError> {
        Registry::list_marks(self, actor, verb).await
    }

    async fn get_root(&self, root_id: &RootId) -> Result<Option<RootRecord>, RegistryError> {
        Registry::get_root(self, root_id).await
    }

    async fn list_roots(
        &self,
        kind: Option<DocumentKind>,
    ) -> Result<Vec<RootRecord>, RegistryError> {
        Registry::list_roots(self, kind).await
    }
}

impl<D, M> RepositoryWrite for Registry<D, M>
where
    D: VersionStore + RootStore + Sync,
    M: MarkStore + Sync,
    RegistryError: From<<D as VersionStore>::Error>
        + From<<D as RootStore>::Error>
        + From<<M as MarkStore>::Error>,
{
    async fn publish(&self, publish: Publish) -> Result<Release, RegistryError> {
        Registry::publish(self, publish).await
    }

    async fn promote(
        &self,
        root_id: &RootId,
        version: &Version,
        to: Stage,
        note: Option<String>,
    ) -> Result<Release, RegistryError> {
        Registry::promote(self, root_id, version, to, note).await
    }

    async fn set_mark(&self, set: SetMark) -> Result<Mark, RegistryError> {
        Registry::set_mark(self, set).await
    }

    async fn clear_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError> {
        Registry::clear_mark(self, actor, subject, verb).await
    }

    async fn pause_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError> {
        Registry::pause_mark(self, actor, subject, verb).await
    }

    async fn create_need(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        Registry::create_need(self, create).await
    }

    async fn create_suite(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        Registry::create_suite(self, create).await
    }

    async fn create_protocol(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        Registry::create_protocol(self, create).await
    }

    async fn fork(&self, fork: Fork) -> Result<Release, RegistryError> {
        Registry::fork(self, fork).await
    }

    async fn rename_slug(
        &self,
        root_id: &RootId,
        slug: Slug,
    ) -> Result<RootRecord, RegistryError> {
        Registry::rename_slug(self, root_id, slug).await
    }

    async fn deprecate_root(
        &self,
        root_id: &RootId,
        successor: Option<RootId>,
        note: Option<String>,
    ) -> Result<RootRecord, RegistryError> {
        Registry::deprecate_root(self, root_id, successor, note).await
    }
}

/// Repository routing reads to `R` and writes to `W`.
#[derive(Clone, Debug)]
pub struct SplitRepository<R, W> {
    read: R,
    write: W,
}

impl<R, W> SplitRepository<R, W> {
    pub fn new(read: R, write: W) -> Self {
        Self { read, write }
    }

    pub fn reader(&self) -> &R {
        &self.read
    }

    pub fn writer(&self) -> &W {
        &self.write
    }
}

impl<R, W> RepositoryRead for SplitRepository<R, W>
where
    R: RepositoryRead + Sync,
    W: Send + Sync,
{
    async fn resolve_slug(&self, name: &str) -> Result<Option<Resolution>, RegistryError> {
        self.read.resolve_slug(name).await
    }

    async fn get_head(
        &self,
        root_id: &RootId,
        selector: Selector,
    ) -> Result<Option<Release>, RegistryError> {
        self.read.get_head(root_id, selector).await
    }

    async fn list_versions(&self, root_id: &RootId) -> Result<Vec<Release>, RegistryError> {
        self.read.list_versions(root_id).await
    }

    async fn get_by_cid(&self, cid: &Cid) -> Result<Option<Value>, RegistryError> {
        self.read.get_by_cid(cid).await
    }

    async fn get_version(
        &self,
        root_id: &RootId,
        version: &Version,
    ) -> Result<Option<VersionRecord>, RegistryError> {
        self.read.get_version(root_id, version).await
    }

    async fn list_marks(
        &self,
        actor: &ActorId,
        verb: Option<MarkVerb>,
    ) -> Result<Vec<Mark>, RegistryError> {
        self.read.list_marks(actor, verb).await
    }

    async fn get_root(&self, root_id: &RootId) -> Result<Option<RootRecord>, RegistryError> {
        self.read.get_root(root_id).await
    }

    async fn list_roots(
        &self,
        kind: Option<DocumentKind>,
    ) -> Result<Vec<RootRecord>, RegistryError> {
        self.read.list_roots(kind).await
    }
}

impl<R, W> RepositoryWrite for SplitRepository<R, W>
where
    R: Send + Sync,
    W: RepositoryWrite + Sync,
{
    async fn publish(&self, publish: Publish) -> Result<Release, RegistryError> {
        self.write.publish(publish).await
    }

    async fn promote(
        &self,
        root_id: &RootId,
        version: &Version,
        to: Stage,
        note: Option<String>,
    ) -> Result<Release, RegistryError> {
        self.write.promote(root_id, version, to, note).await
    }

    async fn set_mark(&self, set: SetMark) -> Result<Mark, RegistryError> {
        self.write.set_mark(set).await
    }

    async fn clear_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError> {
        self.write.clear_mark(actor, subject, verb).await
    }

    async fn pause_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError> {
        self.write.pause_mark(actor, subject, verb).await
    }

    async fn create_need(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        self.write.create_need(create).await
    }

    async fn create_suite(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        self.write.create_suite(create).await
    }

    async fn create_protocol(&self, create: CreateDocument) -> Result<Release, RegistryError> {
        self.write.create_protocol(create).await
    }

    async fn fork(&self, fork: Fork) -> Result<Release, RegistryError> {
        self.write.fork(fork).await
    }

    async fn rename_slug(
        &self,
        root_id: &RootId,
        slug: Slug,
    ) -> Result<RootRecord, RegistryError> {
        self.write.rename_slug(root_id, slug).await
    }

    async fn deprecate_root(
        &self,
        root_id: &RootId,
        successor: Option<RootId>,
        note: Option<String>,
    ) -> Result<RootRecord, RegistryError> {
        self.write.deprecate_root(root_id, successor, note).await
    }
}
