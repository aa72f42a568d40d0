// SPDX-License-Identifier: MIT OR Apache-2.0

//! Social marks actors put on documents.
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, DocumentKind, RootId};
use crate::version::Version;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkVerb {
    Follow,
    Adopt,
}

impl MarkVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkVerb::Follow => "follow",
            MarkVerb::Adopt => "adopt",
        }
    }
}

impl fmt::Display for MarkVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkStatus {
    Active,
    Paused,
    Ended,
}

/// Identifier of a mark, assigned by the backend storing it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkId(String);

impl MarkId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slot a mark occupies. At most one mark per key is active at any time.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkKey {
    pub actor: ActorId,
    pub subject: RootId,
    pub verb: MarkVerb,
}

impl MarkKey {
    pub fn new(actor: ActorId, subject: RootId, verb: MarkVerb) -> Self {
        Self {
            actor,
            subject,
            verb,
        }
    }
}

/// An actor following or adopting a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub id: MarkId,
    pub verb: MarkVerb,
    pub subject_kind: DocumentKind,
    pub subject_root_id: RootId,
    /// Version the mark was made on, if it concerns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_version: Option<Version>,
    pub status: MarkStatus,
    #[serde(rename = "actorDid")]
    pub actor: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

impl Mark {
    pub fn key(&self) -> MarkKey {
        MarkKey::new(
            self.actor.clone(),
            self.subject_root_id.clone(),
            self.verb,
        )
    }

    pub fn is_active(&self) -> bool {
        self.status == MarkStatus::Active
    }

    pub fn is_ended(&self) -> bool {
        self.status == MarkStatus::Ended
    }
}

/// Active marks of one actor, materialized for constant-time membership checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkSet {
    marks: HashSet<(RootId, MarkVerb)>,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: RootId, verb: MarkVerb) -> bool {
        self.marks.insert((subject, verb))
    }

    pub fn contains(&self, subject: &RootId, verb: MarkVerb) -> bool {
        self.marks.contains(&(subject.clone(), verb))
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

/// Only active marks are taken over.
impl<'a> FromIterator<&'a Mark> for MarkSet {
    fn from_iter<T: IntoIterator<Item = &'a Mark>>(iter: T) -> Self {
        let mut set = Self::new();
        for mark in iter.into_iter().filter(|mark| mark.is_active()) {
            set.insert(mark.subject_root_id.clone(), mark.verb);
        }
        set
    }
}
