// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for tests of the registry and its backends.

/// Print traces of the registry when `RUST_LOG` is set.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Macro to run the same test logic against all mark store implementations.
///
/// This macro takes a closure that will be executed against each store type:
/// - In-memory store (`MemoryStore`)
/// - Ledger-backed store (`LedgerMarkStore`) over a `MemoryLedger`, with a page size of two
///   records so listings span multiple pages
///
/// ## Example
///
/// ```rust
/// # use rprotocols_store::assert_all_mark_stores;
/// # use rprotocols_store::marks::MarkStore;
/// # use rprotocols_core::ActorId;
/// # async fn run() {
/// assert_all_mark_stores!(|store| async {
///     let actor = ActorId::new("did:plc:alice").unwrap();
///     assert!(store.list_marks(&actor, None).await.unwrap().is_empty());
/// });
/// # }
/// ```
#[macro_export]
macro_rules! assert_all_mark_stores {
    (|$store:ident| $test_body:expr) => {
        // Test with MemoryStore.
        {
            let $store = $crate::memory::MemoryStore::new();
            $test_body.await;
        }

        // Test with LedgerMarkStore.
        {
            let $store =
                $crate::ledger::LedgerMarkStore::new($crate::ledger::MemoryLedger::new())
                    .page_size(2);
            $test_body.await;
        }
    };
}
