// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers of documents and actors.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of root ids and slugs.
pub const MAX_ID_LEN: usize = 128;

/// Stable identity of a logical document across all its versions.
///
/// Root ids are URL-safe: they consist only of ASCII letters, digits and the unreserved
/// characters `-`, `.`, `_` and `~`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootId(String);

impl RootId {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate(&value, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
        })?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Human-readable alias of a root, used in public URLs.
///
/// Slugs are lowercase ASCII letters and digits separated by single dashes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate(&value, |c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')?;
        if value.starts_with('-') || value.ends_with('-') || value.contains("--") {
            return Err(IdError::MisplacedDash(value));
        }
        Ok(Self(value))
    }

    /// Derives a slug from free text, for example a document title.
    ///
    /// Returns `None` if the text contains nothing a slug could be made of.
    pub fn slugify(text: &str) -> Option<Self> {
        let mut slug = String::with_capacity(text.len());
        for c in text.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                slug.push(c);
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }

        // Cut at a char boundary, everything is ASCII at this point.
        slug.truncate(MAX_ID_LEN);
        let slug = slug.trim_end_matches('-');
        Self::new(slug).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Every slug is also a valid root id.
impl From<Slug> for RootId {
    fn from(value: Slug) -> Self {
        Self(value.0)
    }
}

/// Opaque identity of an actor, usually a DID supplied by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(value: &str, allowed: impl Fn(char) -> bool) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_ID_LEN {
        return Err(IdError::TooLong(value.len(), MAX_ID_LEN));
    }
    match value.chars().find(|c| !allowed(*c)) {
        Some(c) => Err(IdError::InvalidCharacter(c, value.to_owned())),
        None => Ok(()),
    }
}

macro_rules! string_id {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::new(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(RootId);
string_id!(Slug);
string_id!(ActorId);

/// Kind of document a root stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Need,
    Suite,
    Protocol,
}

impl DocumentKind {
    /// Needs can be followed but not adopted.
    pub fn is_adoptable(&self) -> bool {
        !matches!(self, DocumentKind::Need)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Need => "need",
            DocumentKind::Suite => "suite",
            DocumentKind::Protocol => "protocol",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier has {0} characters, maximum is {1}")]
    TooLong(usize, usize),

    #[error("invalid character {0:?} in identifier '{1}'")]
    InvalidCharacter(char, String),

    #[error("slug '{0}' has a leading, trailing or repeated dash")]
    MisplacedDash(String),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ActorId, IdError, RootId, Slug};

    #[rstest]
    #[case("root-open-protocols")]
    #[case("did.plc_abc~1")]
    #[case("Protocol-X")]
    fn valid_root_ids(#[case] value: &str) {
        assert_eq!(RootId::new(value).unwrap().as_str(), value);
    }

    #[rstest]
    #[case("", IdError::Empty)]
    #[case("with space", IdError::InvalidCharacter(' ', "with space".into()))]
    #[case("a/b", IdError::InvalidCharacter('/', "a/b".into()))]
    fn invalid_root_ids(#[case] value: &str, #[case] expected: IdError) {
        assert_eq!(RootId::new(value), Err(expected));
    }

    #[test]
    fn root_id_length() {
        assert!(RootId::new("a".repeat(128)).is_ok());
        assert_eq!(
            RootId::new("a".repeat(129)),
            Err(IdError::TooLong(129, 128))
        );
    }

    #[rstest]
    #[case("protocol-x")]
    #[case("web-presence-2")]
    fn valid_slugs(#[case] value: &str) {
        assert!(Slug::new(value).is_ok());
    }

    #[rstest]
    #[case("-leading")]
    #[case("trailing-")]
    #[case("double--dash")]
    #[case("Upper")]
    #[case("under_score")]
    fn invalid_slugs(#[case] value: &str) {
        assert!(Slug::new(value).is_err());
    }

    #[rstest]
    #[case("Open Protocols", Some("open-protocols"))]
    #[case("  How do we   collaborate at work?  ", Some("how-do-we-collaborate-at-work"))]
    #[case("Ünïcode & more", Some("n-code-more"))]
    #[case("???", None)]
    fn slugify(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            Slug::slugify(text).as_ref().map(Slug::as_str),
            expected
        );
    }

    #[test]
    fn serde_validates() {
        assert!(serde_json::from_str::<RootId>("\"root-work\"").is_ok());
        assert!(serde_json::from_str::<RootId>("\"root work\"").is_err());
        assert!(serde_json::from_str::<ActorId>("\"\"").is_err());
    }
}
