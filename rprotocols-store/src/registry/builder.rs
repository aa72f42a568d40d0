// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::locks::KeyedLocks;
use crate::marks::MarkStore;
use crate::registry::{Publish, Registry};
use crate::roots::RootStore;
use crate::versions::VersionStore;

/// Builder to configure and open a [`Registry`].
///
/// Seed documents get published when the registry is opened. Publishing is idempotent, opening a
/// registry again on the same backends with the same seeds does not change anything.
#[derive(Debug)]
pub struct RegistryBuilder<D, M> {
    documents: D,
    marks: M,
    config: RegistryConfig,
    seeds: Vec<Publish>,
}

impl<D, M> RegistryBuilder<D, M> {
    pub fn new(documents: D, marks: M) -> Self {
        Self {
            documents,
            marks,
            config: RegistryConfig::default(),
            seeds: Vec::new(),
        }
    }

    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish this version when the registry gets opened.
    pub fn seed(mut self, publish: Publish) -> Self {
        self.seeds.push(publish);
        self
    }

    pub fn seeds(mut self, seeds: impl IntoIterator<Item = Publish>) -> Self {
        self.seeds.extend(seeds);
        self
    }
}

impl<D, M> RegistryBuilder<D, M>
where
    D: VersionStore + RootStore + Sync,
    M: MarkStore + Sync,
    RegistryError: From<<D as VersionStore>::Error>
        + From<<D as RootStore>::Error>
        + From<<M as MarkStore>::Error>,
{
    /// Publish all seeds and return the ready registry.
    pub async fn open(self) -> Result<Registry<D, M>, RegistryError> {
        let registry = Registry {
            documents: self.documents,
            marks: self.marks,
            config: self.config,
            root_locks: KeyedLocks::new(),
            mark_locks: KeyedLocks::new(),
        };

        let seeds = self.seeds.len();
        for publish in self.seeds {
            registry.publish(publish).await?;
        }
        debug!(seeds, "opened registry");

        Ok(registry)
    }
}
