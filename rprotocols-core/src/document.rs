// SPDX-License-Identifier: MIT OR Apache-2.0

//! Root and version records of the document registry.
//!
//! A `VersionRecord` is immutable: it holds the canonical content of one `major.minor` version of
//! a root, its content identifier and the lineage pointers. Everything mutable about a document
//! lives in its `RootRecord`: the per-version stage index, head pointers, slugs, counters and
//! deprecation state.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cid::Cid;
use crate::ids::{ActorId, DocumentKind, RootId, Slug};
use crate::mark::MarkVerb;
use crate::stage::{Stage, StageError};
use crate::version::Version;

/// Index entry of one version inside its root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub cid: Cid,
    pub stage: Stage,
    /// UNIX timestamp (seconds) of the first publish.
    pub date: u64,
}

/// Points at the version a forked root was derived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkRef {
    pub root_id: RootId,
    pub version: Version,
    pub cid: Cid,
}

/// Immutable, content-addressed version of a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    #[serde(rename = "parentId")]
    pub root_id: RootId,
    pub version: Version,
    pub cid: Cid,
    /// Identifier of the previous version of the same root, `None` for the first one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_cid: Option<Cid>,
    /// Canonical payload.
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_of: Option<ForkRef>,
    /// Stage the version was published with. Promotions only change the root entry.
    pub stage: Stage,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ActorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A version record together with the stage it currently has.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub record: VersionRecord,
    pub stage: Stage,
}

impl Release {
    pub fn version(&self) -> Version {
        self.record.version
    }

    pub fn cid(&self) -> &Cid {
        &self.record.cid
    }
}

/// Which head of a root to resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selector {
    /// Highest version number, whatever its stage.
    #[default]
    Latest,

    /// Highest version which is stable or later, falling back to the latest one.
    Published,

    /// Exactly this version.
    Version(Version),
}

/// What an audit note in the root history is about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HistoryChange {
    #[serde(rename_all = "camelCase")]
    Promoted {
        version: Version,
        from: Stage,
        to: Stage,
    },

    #[serde(rename_all = "camelCase")]
    Deprecated { successor_root_id: Option<RootId> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryNote {
    pub change: HistoryChange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: u64,
}

/// Mutable entry of one logical document.
///
/// A root only exists together with its first version, so `versions` is never empty and
/// `latest_version` always has an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootRecord {
    pub root_id: RootId,
    pub kind: DocumentKind,
    /// Preferred slug.
    pub slug: Slug,
    /// Slugs this root was known by before, kept for redirects.
    #[serde(default)]
    pub aliases: Vec<Slug>,

    pub latest_version: Version,
    pub latest_cid: Cid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_cid: Option<Cid>,
    pub versions: BTreeMap<Version, VersionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_draft_version: Option<Version>,
    pub has_unpublished_changes: bool,

    pub follow_enabled: bool,
    pub adopt_enabled: bool,
    pub follow_count: u64,
    pub adopt_count: u64,

    pub is_deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor_root_id: Option<RootId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<u64>,
    #[serde(default)]
    pub history: Vec<HistoryNote>,

    pub created_at: u64,
    pub updated_at: u64,
}

impl RootRecord {
    /// Creates the entry of a new root from its first version.
    pub fn new(kind: DocumentKind, slug: Slug, first: &VersionRecord, stage: Stage) -> Self {
        let entry = VersionEntry {
            cid: first.cid,
            stage,
            date: first.created_at,
        };

        let mut root = Self {
            root_id: first.root_id.clone(),
            kind,
            slug,
            aliases: Vec::new(),
            latest_version: first.version,
            latest_cid: first.cid,
            published_version: None,
            published_cid: None,
            versions: BTreeMap::from([(first.version, entry)]),
            latest_draft_version: None,
            has_unpublished_changes: true,
            follow_enabled: true,
            adopt_enabled: kind.is_adoptable(),
            follow_count: 0,
            adopt_count: 0,
            is_deprecated: false,
            successor_root_id: None,
            deprecated_at: None,
            history: Vec::new(),
            created_at: first.created_at,
            updated_at: first.created_at,
        };
        root.refresh();
        root
    }

    /// Adds a version to the index.
    ///
    /// Returns `false` if the version was already indexed, in which case nothing changes.
    pub fn insert_version(&mut self, record: &VersionRecord, stage: Stage) -> bool {
        if self.versions.contains_key(&record.version) {
            return false;
        }

        self.versions.insert(
            record.version,
            VersionEntry {
                cid: record.cid,
                stage,
                date: record.created_at,
            },
        );
        self.updated_at = self.updated_at.max(record.created_at);
        self.refresh();
        true
    }

    /// Recomputes all fields derived from the version index.
    pub fn refresh(&mut self) {
        if let Some((version, entry)) = self.versions.last_key_value() {
            self.latest_version = *version;
            self.latest_cid = entry.cid;
        }

        let published = self
            .versions
            .iter()
            .rev()
            .find(|(_, entry)| entry.stage.is_published());
        self.published_version = published.map(|(version, _)| *version);
        self.published_cid = published.map(|(_, entry)| entry.cid);

        self.latest_draft_version = self
            .versions
            .iter()
            .rev()
            .find(|(_, entry)| entry.stage == Stage::Draft)
            .map(|(version, _)| *version);

        self.has_unpublished_changes = self.published_version != Some(self.latest_version);
    }

    pub fn entry(&self, version: &Version) -> Option<&VersionEntry> {
        self.versions.get(version)
    }

    pub fn stage_of(&self, version: &Version) -> Option<Stage> {
        self.entry(version).map(|entry| entry.stage)
    }

    /// Resolves a selector to a version of this root.
    pub fn select(&self, selector: &Selector) -> Option<(Version, &VersionEntry)> {
        let version = match selector {
            Selector::Latest => self.latest_version,
            Selector::Published => self.published_version.unwrap_or(self.latest_version),
            Selector::Version(version) => *version,
        };
        self.entry(&version).map(|entry| (version, entry))
    }

    /// Moves a version forward in its lifecycle and records the change in the history.
    pub fn promote(
        &mut self,
        version: &Version,
        to: Stage,
        note: Option<String>,
        at: u64,
    ) -> Result<HistoryNote, RootError> {
        let entry = self
            .versions
            .get_mut(version)
            .ok_or(RootError::UnknownVersion(*version))?;
        let from = entry.stage;
        entry.stage = from.transition(to)?;

        let note = HistoryNote {
            change: HistoryChange::Promoted {
                version: *version,
                from,
                to,
            },
            note,
            at,
        };
        self.push_history(note.clone());
        self.refresh();
        Ok(note)
    }

    /// Marks the whole root as deprecated. This is terminal.
    pub fn deprecate(
        &mut self,
        successor: Option<RootId>,
        note: Option<String>,
        at: u64,
    ) -> Result<(), RootError> {
        if self.is_deprecated {
            return Err(RootError::Deprecated(self.root_id.clone()));
        }
        if successor.as_ref() == Some(&self.root_id) {
            return Err(RootError::SelfSuccessor(self.root_id.clone()));
        }

        self.is_deprecated = true;
        self.successor_root_id = successor.clone();
        self.deprecated_at = Some(at);
        self.push_history(HistoryNote {
            change: HistoryChange::Deprecated {
                successor_root_id: successor,
            },
            note,
            at,
        });
        Ok(())
    }

    /// Makes `slug` the preferred slug, keeping the current one as an alias.
    ///
    /// Returns `false` if `slug` already is the preferred slug.
    pub fn rename(&mut self, slug: Slug, at: u64) -> bool {
        if self.slug == slug {
            return false;
        }
        self.aliases.retain(|alias| alias != &slug);
        let previous = std::mem::replace(&mut self.slug, slug);
        self.aliases.push(previous);
        self.updated_at = self.updated_at.max(at);
        true
    }

    /// Returns `true` if actors may create marks with this verb on the root.
    pub fn accepts(&self, verb: MarkVerb) -> bool {
        match verb {
            MarkVerb::Follow => self.follow_enabled,
            MarkVerb::Adopt => self.adopt_enabled,
        }
    }

    pub fn count(&self, verb: MarkVerb) -> u64 {
        match verb {
            MarkVerb::Follow => self.follow_count,
            MarkVerb::Adopt => self.adopt_count,
        }
    }

    pub fn increment(&mut self, verb: MarkVerb) {
        let counter = self.counter_mut(verb);
        *counter = counter.saturating_add(1);
    }

    pub fn decrement(&mut self, verb: MarkVerb) {
        let counter = self.counter_mut(verb);
        *counter = counter.saturating_sub(1);
    }

    fn counter_mut(&mut self, verb: MarkVerb) -> &mut u64 {
        match verb {
            MarkVerb::Follow => &mut self.follow_count,
            MarkVerb::Adopt => &mut self.adopt_count,
        }
    }

    fn push_history(&mut self, note: HistoryNote) {
        self.updated_at = self.updated_at.max(note.at);
        self.history.push(note);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RootError {
    #[error("version {0} is not part of this root")]
    UnknownVersion(Version),

    #[error("root '{0}' is deprecated")]
    Deprecated(RootId),

    #[error("root '{0}' can not succeed itself")]
    SelfSuccessor(RootId),

    #[error(transparent)]
    Stage(#[from] StageError),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use crate::cid::address_of;
    use crate::ids::{DocumentKind, RootId, Slug};
    use crate::mark::MarkVerb;
    use crate::stage::{Stage, StageError};
    use crate::version::Version;

    use super::{HistoryChange, RootError, RootRecord, Selector, VersionRecord};

    fn record(version: Version, title: &str, at: u64) -> VersionRecord {
        let content = json!({ "title": title });
        VersionRecord {
            root_id: RootId::new("root-work").unwrap(),
            version,
            cid: address_of(&content).unwrap(),
            prev_cid: None,
            content,
            fork_of: None,
            stage: Stage::Draft,
            created_at: at,
            author: None,
            notes: None,
        }
    }

    fn root() -> RootRecord {
        RootRecord::new(
            DocumentKind::Protocol,
            Slug::new("work").unwrap(),
            &record(Version::new(0, 1), "Work", 1),
            Stage::Draft,
        )
    }

    #[test]
    fn derived_heads() {
        let mut root = root();
        assert_eq!(root.latest_version, Version::new(0, 1));
        assert_eq!(root.published_version, None);
        assert_eq!(root.latest_draft_version, Some(Version::new(0, 1)));
        assert!(root.has_unpublished_changes);

        let stable = record(Version::new(1, 0), "Work 1", 2);
        assert!(root.insert_version(&stable, Stage::Stable));
        assert_eq!(root.latest_version, Version::new(1, 0));
        assert_eq!(root.published_version, Some(Version::new(1, 0)));
        assert_eq!(root.published_cid, Some(stable.cid));
        assert!(!root.has_unpublished_changes);

        let draft = record(Version::new(1, 1), "Work 1.1", 3);
        assert!(root.insert_version(&draft, Stage::Candidate));
        assert_eq!(root.latest_version, Version::new(1, 1));
        assert_eq!(root.published_version, Some(Version::new(1, 0)));
        assert!(root.has_unpublished_changes);

        // Already indexed versions are left alone.
        assert!(!root.insert_version(&draft, Stage::Stable));
        assert_eq!(root.stage_of(&Version::new(1, 1)), Some(Stage::Candidate));
    }

    #[test]
    fn selectors() {
        let mut root = root();
        assert_eq!(
            root.select(&Selector::Published).map(|(v, _)| v),
            Some(Version::new(0, 1))
        );

        root.insert_version(&record(Version::new(0, 2), "Work 2", 2), Stage::Stable);
        root.insert_version(&record(Version::new(0, 3), "Work 3", 3), Stage::Draft);
        assert_eq!(
            root.select(&Selector::Latest).map(|(v, _)| v),
            Some(Version::new(0, 3))
        );
        assert_eq!(
            root.select(&Selector::Published).map(|(v, _)| v),
            Some(Version::new(0, 2))
        );
        assert!(root.select(&Selector::Version(Version::new(4, 0))).is_none());
    }

    #[test]
    fn promote_appends_history() {
        let mut root = root();
        let version = Version::new(0, 1);

        let note = root
            .promote(&version, Stage::Stable, Some("ready".into()), 5)
            .unwrap();
        assert_eq!(
            note.change,
            HistoryChange::Promoted {
                version,
                from: Stage::Draft,
                to: Stage::Stable
            }
        );
        assert_eq!(root.published_version, Some(version));
        assert_eq!(root.updated_at, 5);

        assert_matches!(
            root.promote(&version, Stage::Candidate, None, 6),
            Err(RootError::Stage(StageError::IllegalTransition { .. }))
        );
        assert_matches!(
            root.promote(&Version::new(3, 0), Stage::Stable, None, 6),
            Err(RootError::UnknownVersion(_))
        );
        assert_eq!(root.history.len(), 1);
    }

    #[test]
    fn deprecation_is_terminal() {
        let mut root = root();
        let successor = RootId::new("root-work-2").unwrap();

        assert_matches!(
            root.deprecate(Some(root.root_id.clone()), None, 2),
            Err(RootError::SelfSuccessor(_))
        );
        root.deprecate(Some(successor.clone()), None, 2).unwrap();
        assert!(root.is_deprecated);
        assert_eq!(root.successor_root_id, Some(successor));
        assert_matches!(root.deprecate(None, None, 3), Err(RootError::Deprecated(_)));
    }

    #[test]
    fn rename_keeps_aliases() {
        let mut root = root();
        assert!(root.rename(Slug::new("work-together").unwrap(), 2));
        assert!(!root.rename(Slug::new("work-together").unwrap(), 3));
        assert_eq!(root.aliases, vec![Slug::new("work").unwrap()]);

        // Renaming back removes the slug from the aliases.
        assert!(root.rename(Slug::new("work").unwrap(), 4));
        assert_eq!(root.aliases, vec![Slug::new("work-together").unwrap()]);
    }

    #[test]
    fn counters_and_needs() {
        let mut root = root();
        root.increment(MarkVerb::Adopt);
        root.decrement(MarkVerb::Adopt);
        root.decrement(MarkVerb::Adopt);
        assert_eq!(root.count(MarkVerb::Adopt), 0);

        let need = RootRecord::new(
            DocumentKind::Need,
            Slug::new("need").unwrap(),
            &record(Version::new(0, 1), "Need", 1),
            Stage::Draft,
        );
        assert!(need.accepts(MarkVerb::Follow));
        assert!(!need.accepts(MarkVerb::Adopt));
    }

    #[test]
    fn camel_case_serialization() {
        let value = serde_json::to_value(root()).unwrap();
        assert_eq!(value["rootId"], json!("root-work"));
        assert_eq!(value["latestVersion"], json!("0.1"));
        assert_eq!(value["versions"]["0.1"]["stage"], json!("draft"));
        assert_eq!(value["hasUnpublishedChanges"], json!(true));

        let value = serde_json::to_value(record(Version::new(0, 1), "Work", 1)).unwrap();
        assert_eq!(value["parentId"], json!("root-work"));
        assert!(value.get("rootId").is_none());
        assert_eq!(value["stage"], json!("draft"));
        let record: VersionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.root_id.as_str(), "root-work");
    }
}
