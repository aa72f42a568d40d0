// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage, orchestration and the repository interface of the rProtocols document registry.
//!
//! The registry keeps needs, suites and protocols as roots with a lineage of immutable,
//! content-addressed versions. Actors follow or adopt roots with marks.
//!
//! ## Backends
//!
//! Storage is split into capabilities, each one an async trait with a thread-safe and a local
//! variant:
//!
//! - [`VersionStore`](versions::VersionStore): version records and their canonical content,
//! - [`RootStore`](roots::RootStore): root entries and slug claims,
//! - [`MarkStore`](marks::MarkStore): follow and adopt marks.
//!
//! [`MemoryStore`](memory::MemoryStore) implements all of them. Marks can also be kept in the
//! repositories of the marking actors on a remote ledger with
//! [`LedgerMarkStore`](ledger::LedgerMarkStore).
//!
//! ## Registry
//!
//! [`Registry`](registry::Registry) enforces the rules across backends: immutable versions,
//! unbroken lineages, forward-only lifecycle stages and at most one live mark per actor, subject
//! and verb. Applications talk to it through the [`RepositoryRead`](port::RepositoryRead) and
//! [`RepositoryWrite`](port::RepositoryWrite) traits.
//!
//! ```
//! use rprotocols_core::{DocumentKind, RootId, Selector, Stage, Version};
//! use rprotocols_store::memory::MemoryStore;
//! use rprotocols_store::registry::{Publish, Registry};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let registry = Registry::builder(store.clone(), store).open().await?;
//!
//! let root_id = RootId::new("root-open-protocols")?;
//! registry
//!     .publish(
//!         Publish::new(root_id.clone(), Version::new(1, 0), json!({ "title": "Open protocols" }))
//!             .kind(DocumentKind::Protocol),
//!     )
//!     .await?;
//!
//! let head = registry.get_head(&root_id, Selector::Published).await?.unwrap();
//! assert_eq!(head.stage, Stage::Stable);
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod marks;
#[cfg(feature = "memory")]
pub mod memory;
pub mod port;
pub mod registry;
pub mod roots;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod versions;

pub use config::{MarkRetention, RegistryConfig};
pub use error::{ErrorKind, RegistryError};
pub use port::{RepositoryRead, RepositoryWrite, SplitRepository};
pub use registry::{CreateDocument, Fork, Publish, Registry, RegistryBuilder, SetMark};
