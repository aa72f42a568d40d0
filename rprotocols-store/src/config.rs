// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration of a `Registry`.
use serde::{Deserialize, Serialize};

/// Default number of records requested per page from a remote ledger.
pub const DEFAULT_LEDGER_PAGE_SIZE: usize = 100;

/// What happens to a mark when it gets cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkRetention {
    /// Keep the mark with status `ended`.
    #[default]
    Retain,

    /// Remove the mark from the backend.
    Delete,
}

/// Configuration parameters of the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Handling of cleared marks.
    pub mark_retention: MarkRetention,

    /// Re-address content whenever it is read by cid or version and fail with
    /// `RegistryError::AddressMismatch` if it does not match.
    ///
    /// Useful when the backend is not trusted to keep content intact.
    pub verify_content: bool,

    /// Walk the whole lineage of a root after every publish and compare it with the version order.
    pub check_lineage: bool,

    /// Records requested per page when listing marks from a remote ledger.
    pub ledger_page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mark_retention: MarkRetention::default(),
            verify_content: false,
            check_lineage: cfg!(debug_assertions),
            ledger_page_size: DEFAULT_LEDGER_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkRetention, RegistryConfig};

    #[test]
    fn partial_config() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{ "markRetention": "delete", "verifyContent": true }"#).unwrap();
        assert_eq!(config.mark_retention, MarkRetention::Delete);
        assert!(config.verify_content);
        assert_eq!(config.ledger_page_size, 100);
    }
}
