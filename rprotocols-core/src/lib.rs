// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data types of the rProtocols document registry.
//!
//! Documents ("protocols", "needs" and "suites") are identified by a stable [`RootId`] and resolve
//! to immutable, content-addressed versions. This crate holds everything which does not need any
//! I/O:
//!
//! - [`canonical`]: deterministic byte representation of JSON-shaped document payloads,
//! - [`cid`]: content identifiers derived from canonical bytes,
//! - [`version`] and [`stage`]: `major.minor` numbers and the lifecycle state machine,
//! - [`document`] and [`mark`]: root, version and mark records.
//!
//! Storage, orchestration and the repository interface live in `rprotocols-store`.
//!
//! ## Example
//!
//! ```
//! use rprotocols_core::{Stage, Version, address_of};
//! use serde_json::json;
//!
//! let a = address_of(&json!({ "title": "Open protocols", "language": "en" })).unwrap();
//! let b = address_of(&json!({ "language": "en", "title": "Open protocols" })).unwrap();
//! assert_eq!(a, b);
//!
//! let version = Version::first_draft();
//! assert_eq!(Stage::initial(&version, None).unwrap(), Stage::Draft);
//! ```
pub mod canonical;
pub mod cid;
pub mod document;
pub mod ids;
pub mod mark;
mod serde;
pub mod stage;
pub mod version;

pub use canonical::{CanonicalError, canonical_bytes, canonicalize};
pub use cid::{Cid, CidError, address_of, verify};
pub use document::{
    ForkRef, HistoryChange, HistoryNote, Release, RootError, RootRecord, Selector, VersionEntry,
    VersionRecord,
};
pub use ids::{ActorId, DocumentKind, IdError, RootId, Slug};
pub use mark::{Mark, MarkId, MarkKey, MarkSet, MarkStatus, MarkVerb};
pub use stage::{Stage, StageError};
pub use version::{Version, VersionError, VersionRange};
