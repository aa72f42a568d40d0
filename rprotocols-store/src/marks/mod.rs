// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage of follow and adopt marks.
#[cfg(feature = "memory")]
mod memory;
#[cfg(test)]
mod tests;
pub mod traits;

use rprotocols_core::{ActorId, DocumentKind, Mark, MarkId, MarkKey, MarkStatus, MarkVerb, RootId, Version};

pub use traits::MarkStore;

/// A mark before a backend assigned its identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMark {
    pub actor: ActorId,
    pub verb: MarkVerb,
    pub subject_kind: DocumentKind,
    pub subject_root_id: RootId,
    pub subject_version: Option<Version>,
    pub status: MarkStatus,
    pub context: Option<String>,
    pub created_at: u64,
}

impl NewMark {
    pub fn key(&self) -> MarkKey {
        MarkKey::new(
            self.actor.clone(),
            self.subject_root_id.clone(),
            self.verb,
        )
    }

    pub fn into_mark(self, id: MarkId) -> Mark {
        Mark {
            id,
            verb: self.verb,
            subject_kind: self.subject_kind,
            subject_root_id: self.subject_root_id,
            subject_version: self.subject_version,
            status: self.status,
            actor: self.actor,
            context: self.context,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}
