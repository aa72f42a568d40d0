// SPDX-License-Identifier: MIT OR Apache-2.0

use rprotocols_core::{ActorId, Mark, MarkKey, MarkSet, MarkStatus, MarkVerb, RootId, Version};
use tracing::{debug, warn};

use crate::config::MarkRetention;
use crate::error::RegistryError;
use crate::marks::{MarkStore, NewMark};
use crate::registry::{Registry, current_timestamp};
use crate::roots::RootStore;
use crate::versions::VersionStore;

/// Request to follow or adopt a root.
#[derive(Clone, Debug)]
pub struct SetMark {
    pub actor: ActorId,
    pub subject: RootId,
    pub verb: MarkVerb,
    /// Adopted version, the published head of the subject when not set.
    pub subject_version: Option<Version>,
    pub context: Option<String>,
}

impl SetMark {
    pub fn new(actor: ActorId, subject: RootId, verb: MarkVerb) -> Self {
        Self {
            actor,
            subject,
            verb,
            subject_version: None,
            context: None,
        }
    }

    pub fn follow(actor: ActorId, subject: RootId) -> Self {
        Self::new(actor, subject, MarkVerb::Follow)
    }

    pub fn adopt(actor: ActorId, subject: RootId) -> Self {
        Self::new(actor, subject, MarkVerb::Adopt)
    }
}

enum Counter {
    Increment,
    Decrement,
}

impl<D, M> Registry<D, M>
where
    D: VersionStore + RootStore + Sync,
    M: MarkStore + Sync,
    RegistryError: From<<D as VersionStore>::Error>
        + From<<D as RootStore>::Error>
        + From<<M as MarkStore>::Error>,
{
    /// Follow or adopt a root.
    ///
    /// An active mark in the same slot is returned unchanged, a paused one gets resumed. The
    /// follow or adopt counter of the subject changes only when the slot becomes active. If the
    /// counter can not be updated the mark write is undone.
    pub async fn set_mark(&self, set: SetMark) -> Result<Mark, RegistryError> {
        let key = MarkKey::new(set.actor.clone(), set.subject.clone(), set.verb);
        let _guard = self.mark_locks.lock(&key).await;

        let root = self.require_root(&set.subject).await?;
        if !root.kind.is_adoptable() && set.verb == MarkVerb::Adopt {
            return Err(RegistryError::MarkNotAllowed {
                subject: set.subject,
                verb: set.verb,
                reason: "needs can not be adopted",
            });
        }
        if !root.accepts(set.verb) {
            return Err(RegistryError::MarkNotAllowed {
                subject: set.subject,
                verb: set.verb,
                reason: "disabled on this root",
            });
        }

        let subject_version = match (set.verb, set.subject_version) {
            (MarkVerb::Adopt, version) => {
                let version = version
                    .or(root.published_version)
                    .unwrap_or(root.latest_version);
                let stage = root
                    .stage_of(&version)
                    .ok_or_else(|| RegistryError::UnknownVersion(set.subject.clone(), version))?;
                if !stage.allows_adopt() {
                    return Err(RegistryError::MarkNotAllowed {
                        subject: set.subject,
                        verb: set.verb,
                        reason: "only candidate and stable versions can be adopted",
                    });
                }
                Some(version)
            }
            (MarkVerb::Follow, Some(version)) => {
                if root.entry(&version).is_none() {
                    return Err(RegistryError::UnknownVersion(set.subject, version));
                }
                Some(version)
            }
            (MarkVerb::Follow, None) => None,
        };

        let (mark, previous) = match self.marks.find_mark(&key).await? {
            Some(mark) if mark.is_active() => return Ok(mark),
            Some(mut mark) => {
                let previous = mark.clone();
                mark.status = MarkStatus::Active;
                mark.updated_at = Some(current_timestamp());
                if subject_version.is_some() {
                    mark.subject_version = subject_version;
                }
                if set.context.is_some() {
                    mark.context = set.context;
                }
                self.marks.update_mark(&mark).await?;
                (mark, Some(previous))
            }
            None => {
                let mark = self
                    .marks
                    .insert_mark(NewMark {
                        actor: set.actor,
                        verb: set.verb,
                        subject_kind: root.kind,
                        subject_root_id: set.subject,
                        subject_version,
                        status: MarkStatus::Active,
                        context: set.context,
                        created_at: current_timestamp(),
                    })
                    .await?;
                (mark, None)
            }
        };

        if let Err(err) = self
            .count(&mark.subject_root_id, mark.verb, Counter::Increment)
            .await
        {
            self.restore(&mark, previous).await;
            return Err(err);
        }
        debug!(actor = %mark.actor, subject = %mark.subject_root_id, verb = %mark.verb, "set mark");
        Ok(mark)
    }

    /// Stop following or adopting a root.
    ///
    /// Returns `None` if the slot was empty. Depending on `MarkRetention` the mark is kept as
    /// ended or removed.
    pub async fn clear_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError> {
        let key = MarkKey::new(actor.clone(), subject.clone(), verb);
        let _guard = self.mark_locks.lock(&key).await;

        let Some(mut mark) = self.marks.find_mark(&key).await? else {
            return Ok(None);
        };
        let previous = mark.clone();

        mark.status = MarkStatus::Ended;
        mark.updated_at = Some(current_timestamp());
        match self.config.mark_retention {
            MarkRetention::Retain => {
                self.marks.update_mark(&mark).await?;
            }
            MarkRetention::Delete => {
                self.marks.delete_mark(&mark.id).await?;
            }
        }

        let counted = if previous.is_active() {
            self.count(subject, verb, Counter::Decrement).await
        } else {
            Ok(())
        };
        if let Err(err) = counted {
            self.restore(&mark, Some(previous)).await;
            return Err(err);
        }
        debug!(actor = %actor, subject = %subject, verb = %verb, "cleared mark");
        Ok(Some(mark))
    }

    /// Pause an active mark.
    ///
    /// The mark keeps its slot and can be resumed with `set_mark`. Returns `None` if the slot was
    /// empty.
    pub async fn pause_mark(
        &self,
        actor: &ActorId,
        subject: &RootId,
        verb: MarkVerb,
    ) -> Result<Option<Mark>, RegistryError> {
        let key = MarkKey::new(actor.clone(), subject.clone(), verb);
        let _guard = self.mark_locks.lock(&key).await;

        let Some(mut mark) = self.marks.find_mark(&key).await? else {
            return Ok(None);
        };
        if !mark.is_active() {
            return Ok(Some(mark));
        }

        let previous = mark.clone();
        mark.status = MarkStatus::Paused;
        mark.updated_at = Some(current_timestamp());
        self.marks.update_mark(&mark).await?;
        if let Err(err) = self.count(subject, verb, Counter::Decrement).await {
            self.restore(&mark, Some(previous)).await;
            return Err(err);
        }
        debug!(actor = %actor, subject = %subject, verb = %verb, "paused mark");
        Ok(Some(mark))
    }

    /// Active marks of an actor, optionally only with one verb, oldest first.
    pub async fn list_marks(
        &self,
        actor: &ActorId,
        verb: Option<MarkVerb>,
    ) -> Result<Vec<Mark>, RegistryError> {
        let mut marks = self.marks.list_marks(actor, verb).await?;
        marks.retain(Mark::is_active);
        Ok(marks)
    }

    /// Everything an actor currently follows or adopts.
    pub async fn mark_set(&self, actor: &ActorId) -> Result<MarkSet, RegistryError> {
        let marks = self.list_marks(actor, None).await?;
        Ok(marks.iter().collect())
    }

    /// Puts a mark slot back into the state it had before `written`, after the counter of the
    /// subject could not follow.
    async fn restore(&self, written: &Mark, previous: Option<Mark>) {
        let restored = match previous {
            None => self.marks.delete_mark(&written.id).await.map(|_| ()),
            Some(previous) => match self.marks.update_mark(&previous).await {
                Ok(true) => Ok(()),
                // The mark got deleted, write it again.
                Ok(false) => self
                    .marks
                    .insert_mark(NewMark {
                        actor: previous.actor,
                        verb: previous.verb,
                        subject_kind: previous.subject_kind,
                        subject_root_id: previous.subject_root_id,
                        subject_version: previous.subject_version,
                        status: previous.status,
                        context: previous.context,
                        created_at: previous.created_at,
                    })
                    .await
                    .map(|_| ()),
                Err(err) => Err(err),
            },
        };
        if let Err(err) = restored {
            warn!(mark = %written.id, %err, "failed restoring mark after counter update failed");
        }
    }

    /// Adjusts a counter of the subject under its root lock.
    ///
    /// Subjects which disappeared in the meantime are skipped.
    async fn count(
        &self,
        subject: &RootId,
        verb: MarkVerb,
        counter: Counter,
    ) -> Result<(), RegistryError> {
        let _guard = self.root_locks.lock(subject).await;
        let Some(mut root) = self.documents.get_root(subject).await? else {
            return Ok(());
        };
        match counter {
            Counter::Increment => root.increment(verb),
            Counter::Decrement => root.decrement(verb),
        }
        self.documents.put_root(&root).await?;
        Ok(())
    }
}
