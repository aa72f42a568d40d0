// SPDX-License-Identifier: MIT OR Apache-2.0

use rprotocols_core::{Release, RootId, Stage, Version};
use tracing::debug;

use crate::error::RegistryError;
use crate::marks::MarkStore;
use crate::registry::{Registry, current_timestamp, root_error};
use crate::roots::RootStore;
use crate::versions::{self, VersionStore};

impl<D, M> Registry<D, M>
where
    D: VersionStore + RootStore + Sync,
    M: MarkStore + Sync,
    RegistryError: From<<D as VersionStore>::Error>
        + From<<D as RootStore>::Error>
        + From<<M as MarkStore>::Error>,
{
    /// Move a version of a root forward in its lifecycle.
    ///
    /// Only the stage in the root entry changes, the version record and its identifier stay as
    /// they are. The change is appended to the history of the root.
    pub async fn promote(
        &self,
        root_id: &RootId,
        version: &Version,
        to: Stage,
        note: Option<String>,
    ) -> Result<Release, RegistryError> {
        let _guard = self.root_locks.lock(root_id).await;
        let mut root = self.require_root(root_id).await?;

        let record = versions::get_by_root_version(
            &self.documents,
            root_id,
            version,
            self.config.verify_content,
        )
        .await?
        .ok_or_else(|| RegistryError::UnknownVersion(root_id.clone(), *version))?;

        let change = root
            .promote(version, to, note, current_timestamp())
            .map_err(|err| root_error(root_id, err))?;
        self.documents.put_root(&root).await?;
        debug!(root_id = %root_id, version = %version, change = ?change.change, "promoted version");

        Ok(Release { record, stage: to })
    }
}
