// SPDX-License-Identifier: MIT OR Apache-2.0

use std::convert::Infallible;

use rprotocols_core::{Cid, RootId, Version, VersionRecord};
use serde_json::Value;

use crate::memory::MemoryStore;
use crate::versions::VersionStore;

impl VersionStore for MemoryStore {
    type Error = Infallible;

    async fn insert_version(
        &self,
        record: &VersionRecord,
    ) -> Result<Option<VersionRecord>, Self::Error> {
        let mut store = self.write_store();

        let versions = store.versions.entry(record.root_id.clone()).or_default();
        if let Some(existing) = versions.get(&record.version) {
            return Ok(Some(existing.clone()));
        }
        versions.insert(record.version, record.clone());

        store
            .contents
            .entry(record.cid)
            .or_insert_with(|| record.content.clone());

        Ok(None)
    }

    async fn get_version(
        &self,
        root_id: &RootId,
        version: &Version,
    ) -> Result<Option<VersionRecord>, Self::Error> {
        let store = self.read_store();
        Ok(store
            .versions
            .get(root_id)
            .and_then(|versions| versions.get(version))
            .cloned())
    }

    async fn get_content(&self, cid: &Cid) -> Result<Option<Value>, Self::Error> {
        Ok(self.read_store().contents.get(cid).cloned())
    }

    async fn versions(&self, root_id: &RootId) -> Result<Vec<VersionRecord>, Self::Error> {
        let store = self.read_store();
        Ok(store
            .versions
            .get(root_id)
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn latest_version(
        &self,
        root_id: &RootId,
    ) -> Result<Option<VersionRecord>, Self::Error> {
        let store = self.read_store();
        Ok(store
            .versions
            .get(root_id)
            .and_then(|versions| versions.last_key_value())
            .map(|(_, record)| record.clone()))
    }
}
