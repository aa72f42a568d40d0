// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle stages of a document version.
//!
//! Stages only ever move forward along `draft → candidate → stable → deprecated`. Skipping a stage
//! is fine, going back is not: a version which needs to be "un-released" gets superseded by a new
//! version or a fork instead.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::Version;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Draft,
    Candidate,
    Stable,
    Deprecated,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Draft,
        Stage::Candidate,
        Stage::Stable,
        Stage::Deprecated,
    ];

    /// Stage of a version when it gets published for the first time.
    ///
    /// Pre-stable versions (`0.x`) start as drafts and may be published as candidate or stable
    /// when asked to. Versions from `1.0` onwards start as stable and may only be held back as a
    /// candidate. Nothing gets published as deprecated.
    pub fn initial(version: &Version, hint: Option<Stage>) -> Result<Stage, StageError> {
        let stage = match (version.is_draft(), hint) {
            (true, None) => Stage::Draft,
            (false, None) => Stage::Stable,
            (true, Some(stage @ (Stage::Draft | Stage::Candidate | Stage::Stable))) => stage,
            (false, Some(stage @ (Stage::Candidate | Stage::Stable))) => stage,
            (_, Some(stage)) => {
                return Err(StageError::IllegalInitialStage(*version, stage));
            }
        };
        Ok(stage)
    }

    /// Returns `true` if a version may move from this stage to `to`.
    pub fn can_transition_to(self, to: Stage) -> bool {
        to > self
    }

    /// Validates a stage transition and returns the new stage.
    pub fn transition(self, to: Stage) -> Result<Stage, StageError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(StageError::IllegalTransition { from: self, to })
        }
    }

    /// Versions at this stage count as published.
    pub fn is_published(self) -> bool {
        self >= Stage::Stable
    }

    /// Only candidate and stable versions can be adopted.
    pub fn allows_adopt(self) -> bool {
        matches!(self, Stage::Candidate | Stage::Stable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Draft => "draft",
            Stage::Candidate => "candidate",
            Stage::Stable => "stable",
            Stage::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = StageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value)
            .ok_or_else(|| StageError::Unknown(value.to_owned()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("illegal stage transition from {from} to {to}")]
    IllegalTransition { from: Stage, to: Stage },

    #[error("version {0} can not be published as {1}")]
    IllegalInitialStage(Version, Stage),

    #[error("unknown stage '{0}'")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::version::Version;

    use super::{Stage, StageError};

    #[rstest]
    #[case(Stage::Draft, Stage::Candidate)]
    #[case(Stage::Draft, Stage::Stable)]
    #[case(Stage::Draft, Stage::Deprecated)]
    #[case(Stage::Candidate, Stage::Stable)]
    #[case(Stage::Candidate, Stage::Deprecated)]
    #[case(Stage::Stable, Stage::Deprecated)]
    fn forward_transitions(#[case] from: Stage, #[case] to: Stage) {
        assert_eq!(from.transition(to), Ok(to));
    }

    #[test]
    fn everything_else_is_illegal() {
        for from in Stage::ALL {
            for to in Stage::ALL {
                if to > from {
                    continue;
                }
                assert_eq!(
                    from.transition(to),
                    Err(StageError::IllegalTransition { from, to })
                );
            }
        }
    }

    #[rstest]
    #[case(Version::new(0, 1), None, Ok(Stage::Draft))]
    #[case(Version::new(0, 3), Some(Stage::Candidate), Ok(Stage::Candidate))]
    #[case(Version::new(1, 0), None, Ok(Stage::Stable))]
    #[case(Version::new(2, 1), Some(Stage::Candidate), Ok(Stage::Candidate))]
    #[case(
        Version::new(1, 0),
        Some(Stage::Draft),
        Err(StageError::IllegalInitialStage(Version::new(1, 0), Stage::Draft))
    )]
    #[case(
        Version::new(0, 1),
        Some(Stage::Deprecated),
        Err(StageError::IllegalInitialStage(Version::new(0, 1), Stage::Deprecated))
    )]
    fn initial_stage(
        #[case] version: Version,
        #[case] hint: Option<Stage>,
        #[case] expected: Result<Stage, StageError>,
    ) {
        assert_eq!(Stage::initial(&version, hint), expected);
    }

    #[test]
    fn adopt_and_publish_flags() {
        assert!(!Stage::Draft.allows_adopt());
        assert!(Stage::Candidate.allows_adopt());
        assert!(Stage::Stable.allows_adopt());
        assert!(!Stage::Deprecated.allows_adopt());

        assert!(!Stage::Candidate.is_published());
        assert!(Stage::Stable.is_published());
        assert!(Stage::Deprecated.is_published());
    }

    #[test]
    fn string_form() {
        assert_eq!("candidate".parse::<Stage>(), Ok(Stage::Candidate));
        assert_eq!(
            serde_json::to_string(&Stage::Deprecated).unwrap(),
            "\"deprecated\""
        );
        assert!("released".parse::<Stage>().is_err());
    }
}
