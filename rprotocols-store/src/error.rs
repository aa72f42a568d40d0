// SPDX-License-Identifier: MIT OR Apache-2.0

use std::convert::Infallible;

use rprotocols_core::{
    CanonicalError, Cid, DocumentKind, IdError, MarkVerb, RootId, StageError, Version,
    VersionError,
};
use thiserror::Error;

/// Coarse classification of registry errors, for callers mapping them to responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown root, version, content or slug.
    NotFound,

    /// A different content was submitted for an existing version.
    ImmutableConflict,

    /// Stage or root transition which is not allowed.
    IllegalTransition,

    /// Stored content does not match its identifier.
    AddressMismatch,

    /// The backend refused the request for lack of authorization.
    Unauthorized,

    /// The request is malformed or violates a lineage, kind or mark rule.
    Invalid,

    /// The backend failed.
    Backend,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown root '{0}'")]
    UnknownRoot(RootId),

    #[error("unknown version {1} of root '{0}'")]
    UnknownVersion(RootId, Version),

    #[error("version {version} of root '{root_id}' already exists with cid {existing}, got {new}")]
    ImmutableConflict {
        root_id: RootId,
        version: Version,
        existing: Cid,
        new: Cid,
    },

    #[error("root '{0}' is deprecated")]
    RootDeprecated(RootId),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("content addressed as {expected} hashes to {actual}")]
    AddressMismatch { expected: Cid, actual: Cid },

    #[error("version {version} of root '{root_id}' is not newer than {latest}")]
    StaleVersion {
        root_id: RootId,
        version: Version,
        latest: Version,
    },

    #[error("previous cid of root '{root_id}' is {expected:?}, got {found:?}")]
    PreviousMismatch {
        root_id: RootId,
        expected: Option<Cid>,
        found: Option<Cid>,
    },

    #[error("root '{root_id}' is a {expected}, not a {found}")]
    KindMismatch {
        root_id: RootId,
        expected: DocumentKind,
        found: DocumentKind,
    },

    #[error("content {cid} was already published in root '{root_id}'")]
    LineageCycle { root_id: RootId, cid: Cid },

    #[error("lineage of root '{0}' does not match its version order")]
    BrokenLineage(RootId),

    #[error("can not {verb} root '{subject}': {reason}")]
    MarkNotAllowed {
        subject: RootId,
        verb: MarkVerb,
        reason: &'static str,
    },

    #[error("root '{0}' already exists")]
    RootExists(RootId),

    #[error("root '{0}' can not succeed itself")]
    SelfSuccessor(RootId),

    #[error("successor chain of root '{0}' loops back to it")]
    SuccessorCycle(RootId),

    #[error("no slug can be derived for root '{0}'")]
    MissingSlug(RootId),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("backend error: {0}")]
    Backend(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::UnknownRoot(_) | RegistryError::UnknownVersion(_, _) => {
                ErrorKind::NotFound
            }
            RegistryError::ImmutableConflict { .. } => ErrorKind::ImmutableConflict,
            RegistryError::RootDeprecated(_) => ErrorKind::IllegalTransition,
            RegistryError::Stage(StageError::Unknown(_)) => ErrorKind::Invalid,
            RegistryError::Stage(_) => ErrorKind::IllegalTransition,
            RegistryError::AddressMismatch { .. } => ErrorKind::AddressMismatch,
            RegistryError::Unauthorized(_) => ErrorKind::Unauthorized,
            RegistryError::Backend(_) => ErrorKind::Backend,
            RegistryError::StaleVersion { .. }
            | RegistryError::PreviousMismatch { .. }
            | RegistryError::KindMismatch { .. }
            | RegistryError::LineageCycle { .. }
            | RegistryError::BrokenLineage(_)
            | RegistryError::MarkNotAllowed { .. }
            | RegistryError::RootExists(_)
            | RegistryError::SelfSuccessor(_)
            | RegistryError::SuccessorCycle(_)
            | RegistryError::MissingSlug(_)
            | RegistryError::Canonical(_)
            | RegistryError::Id(_)
            | RegistryError::Version(_) => ErrorKind::Invalid,
        }
    }
}

/// The in-memory backend never fails.
impl From<Infallible> for RegistryError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

#[cfg(test)]
mod tests {
    use rprotocols_core::{RootId, Stage, StageError, Version};

    use super::{ErrorKind, RegistryError};

    #[test]
    fn kinds() {
        let root_id = RootId::new("root-a").unwrap();
        assert_eq!(
            RegistryError::UnknownVersion(root_id.clone(), Version::new(1, 0)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RegistryError::from(StageError::IllegalTransition {
                from: Stage::Stable,
                to: Stage::Draft
            })
            .kind(),
            ErrorKind::IllegalTransition
        );
        assert_eq!(
            RegistryError::RootDeprecated(root_id.clone()).kind(),
            ErrorKind::IllegalTransition
        );
        assert_eq!(
            RegistryError::BrokenLineage(root_id).kind(),
            ErrorKind::Invalid
        );
    }
}
