// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-component `major.minor` version numbers.
//!
//! Versions with `major = 0` are pre-stable drafts. Bumping helpers only ever touch the numbers,
//! the lifecycle stage of a version is tracked separately.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of a document, ordered numerically by major and then minor component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// First version of a new document (`0.1`).
    pub const fn first_draft() -> Self {
        Self::new(0, 1)
    }

    /// First stable version (`1.0`).
    pub const fn first_stable() -> Self {
        Self::new(1, 0)
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    /// Returns `true` for pre-stable versions (`major = 0`).
    pub fn is_draft(&self) -> bool {
        self.major == 0
    }

    /// Increments the minor component.
    pub fn next_minor(&self) -> Result<Self, VersionError> {
        let minor = self.minor.checked_add(1).ok_or(VersionError::Overflow)?;
        Ok(Self::new(self.major, minor))
    }

    /// Increments the major component and resets minor to zero.
    pub fn next_major(&self) -> Result<Self, VersionError> {
        let major = self.major.checked_add(1).ok_or(VersionError::Overflow)?;
        Ok(Self::new(major, 0))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (major, minor) = value
            .split_once('.')
            .ok_or_else(|| VersionError::Malformed(value.to_owned()))?;
        Ok(Self::new(
            parse_component(value, major)?,
            parse_component(value, minor)?,
        ))
    }
}

impl TryFrom<&str> for Version {
    type Error = VersionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Components are plain decimal numbers without sign or leading zeros, so every version has
/// exactly one string form.
fn parse_component(version: &str, component: &str) -> Result<u64, VersionError> {
    let is_decimal = !component.is_empty() && component.bytes().all(|byte| byte.is_ascii_digit());
    let has_leading_zero = component.len() > 1 && component.starts_with('0');
    if !is_decimal || has_leading_zero {
        return Err(VersionError::Malformed(version.to_owned()));
    }
    component.parse().map_err(|_| VersionError::Overflow)
}

/// Range of versions, inclusive at the bottom and exclusive at the top.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_exclusive: Option<Version>,
}

impl VersionRange {
    /// All versions of one major line, for example `1.0 <= v < 2.0`.
    pub fn compatible_with(version: &Version) -> Result<Self, VersionError> {
        Ok(Self {
            min_inclusive: Some(Version::new(version.major(), 0)),
            max_exclusive: Some(version.next_major()?),
        })
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above_min = self.min_inclusive.is_none_or(|min| version >= &min);
        let below_max = self.max_exclusive.is_none_or(|max| version < &max);
        above_min && below_max
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("malformed version '{0}', expected 'major.minor'")]
    Malformed(String),

    #[error("version component out of range")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Version, VersionError, VersionRange};

    #[rstest]
    #[case("0.1", Version::new(0, 1))]
    #[case("1.0", Version::new(1, 0))]
    #[case("12.345", Version::new(12, 345))]
    fn parse_valid(#[case] input: &str, #[case] expected: Version) {
        let version: Version = input.parse().unwrap();
        assert_eq!(version, expected);
        assert_eq!(version.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("1")]
    #[case("1.")]
    #[case(".1")]
    #[case("1.0.0")]
    #[case("01.2")]
    #[case("1.02")]
    #[case("-1.0")]
    #[case("+1.0")]
    #[case("v1.0")]
    fn parse_invalid(#[case] input: &str) {
        assert!(input.parse::<Version>().is_err());
    }

    #[test]
    fn overflow() {
        assert_eq!(
            "99999999999999999999.0".parse::<Version>(),
            Err(VersionError::Overflow)
        );
        assert_eq!(
            Version::new(u64::MAX, 3).next_major(),
            Err(VersionError::Overflow)
        );
    }

    #[test]
    fn numeric_ordering() {
        let mut versions: Vec<Version> = ["1.10", "0.2", "1.2", "0.10", "2.0"]
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(sorted, vec!["0.2", "0.10", "1.2", "1.10", "2.0"]);
    }

    #[test]
    fn bumps() {
        let version = Version::new(1, 4);
        assert_eq!(version.next_minor().unwrap(), Version::new(1, 5));
        assert_eq!(version.next_major().unwrap(), Version::new(2, 0));
        assert_eq!(
            Version::first_draft().next_major().unwrap(),
            Version::first_stable()
        );
        assert!(Version::first_draft().is_draft());
        assert!(!Version::first_stable().is_draft());
    }

    #[test]
    fn ranges() {
        let range = VersionRange::compatible_with(&Version::new(1, 3)).unwrap();
        assert!(range.contains(&Version::new(1, 0)));
        assert!(range.contains(&Version::new(1, 99)));
        assert!(!range.contains(&Version::new(2, 0)));
        assert!(!range.contains(&Version::new(0, 9)));

        let open = VersionRange::default();
        assert!(open.contains(&Version::new(0, 1)));
    }
}
