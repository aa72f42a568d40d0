// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_matches::assert_matches;
use rprotocols_core::{ActorId, DocumentKind, MarkKey, MarkStatus, MarkVerb, RootId};
use serde_json::json;

use crate::config::RegistryConfig;
use crate::error::{ErrorKind, RegistryError};
use crate::ledger::{
    LedgerClient, LedgerError, LedgerMarkStore, MARK_COLLECTION, MemoryLedger, RecordUri,
};
use crate::marks::{MarkStore, NewMark};

fn follow(actor: &ActorId, subject: &str, created_at: u64) -> NewMark {
    NewMark {
        actor: actor.clone(),
        verb: MarkVerb::Follow,
        subject_kind: DocumentKind::Protocol,
        subject_root_id: RootId::new(subject).unwrap(),
        subject_version: None,
        status: MarkStatus::Active,
        context: None,
        created_at,
    }
}

#[tokio::test]
async fn list_records_in_pages() {
    let ledger = MemoryLedger::new();
    let alice = ActorId::new("did:plc:alice").unwrap();

    for i in 0..5 {
        ledger
            .create_record(&alice, MARK_COLLECTION, json!({ "n": i }))
            .await
            .unwrap();
    }
    assert_eq!(ledger.len(&alice, MARK_COLLECTION), 5);

    let mut values = Vec::new();
    let mut cursor = None;
    let mut pages = 0;
    loop {
        let page = ledger
            .list_records(&alice, MARK_COLLECTION, 2, cursor)
            .await
            .unwrap();
        pages += 1;
        values.extend(page.records.into_iter().map(|record| record.value));
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(pages, 3);
    assert_eq!(
        values,
        (0..5).map(|i| json!({ "n": i })).collect::<Vec<_>>()
    );

    // Unknown collections are empty.
    let page = ledger
        .list_records(&alice, "org.rp.other", 2, None)
        .await
        .unwrap();
    assert!(page.records.is_empty());
    assert!(page.cursor.is_none());
}

#[tokio::test]
async fn sessions_write_only_to_their_repository() {
    let ledger = MemoryLedger::new();
    let alice = ActorId::new("did:plc:alice").unwrap();
    let bob = ActorId::new("did:plc:bob").unwrap();
    let session = ledger.session(alice.clone());

    let record = session
        .create_record(&alice, MARK_COLLECTION, json!({}))
        .await
        .unwrap();
    assert_eq!(record.uri.repo, alice);

    let result = session
        .create_record(&bob, MARK_COLLECTION, json!({}))
        .await;
    assert_matches!(result, Err(LedgerError::Unauthorized(repo)) if repo == bob);

    let result = ledger
        .session(bob.clone())
        .delete_record(&alice, MARK_COLLECTION, &record.uri.rkey)
        .await;
    assert_matches!(result, Err(LedgerError::Unauthorized(_)));

    // Reads are not restricted.
    let page = ledger
        .session(bob)
        .list_records(&alice, MARK_COLLECTION, 10, None)
        .await
        .unwrap();
    assert_eq!(page.records.len(), 1);

    let err = RegistryError::from(LedgerError::Unauthorized(alice));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = RegistryError::from(LedgerError::Request("timeout".into()));
    assert_eq!(err.kind(), ErrorKind::Backend);
}

#[tokio::test]
async fn marks_are_addressed_by_record_uri() {
    let ledger = MemoryLedger::new();
    let config = RegistryConfig {
        ledger_page_size: 1,
        ..Default::default()
    };
    let store = LedgerMarkStore::from_config(ledger.clone(), &config);
    let alice = ActorId::new("did:plc:alice").unwrap();

    let mark = store
        .insert_mark(follow(&alice, "root-a", 1))
        .await
        .unwrap();
    let uri: RecordUri = mark.id.as_str().parse().unwrap();
    assert_eq!(uri.repo, alice);
    assert_eq!(uri.collection, MARK_COLLECTION);

    let page = ledger
        .list_records(&alice, MARK_COLLECTION, 10, None)
        .await
        .unwrap();
    assert_eq!(page.records[0].value["$type"], "org.rp.mark");
    assert_eq!(page.records[0].value["subject"]["uri"], "root-a");
    assert_eq!(page.records[0].value["verb"], "follow");
    assert_eq!(page.records[0].value["createdAt"], 1);

    assert!(store.delete_mark(&mark.id).await.unwrap());
    assert!(!store.delete_mark(&mark.id).await.unwrap());
    assert_eq!(ledger.len(&alice, MARK_COLLECTION), 0);
}

#[tokio::test]
async fn malformed_records_are_skipped() {
    let ledger = MemoryLedger::new();
    let store = LedgerMarkStore::new(ledger.clone()).page_size(1);
    let alice = ActorId::new("did:plc:alice").unwrap();

    store
        .insert_mark(follow(&alice, "root-a", 1))
        .await
        .unwrap();
    ledger
        .create_record(&alice, MARK_COLLECTION, json!({ "verb": "shout" }))
        .await
        .unwrap();
    store
        .insert_mark(follow(&alice, "root-b", 2))
        .await
        .unwrap();

    let marks = store.list_marks(&alice, None).await.unwrap();
    assert_eq!(marks.len(), 2);

    let key = MarkKey::new(alice, RootId::new("root-b").unwrap(), MarkVerb::Follow);
    assert!(store.find_mark(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn marks_of_other_actors_are_unauthorized() {
    let ledger = MemoryLedger::new();
    let alice = ActorId::new("did:plc:alice").unwrap();
    let bob = ActorId::new("did:plc:bob").unwrap();
    let store = LedgerMarkStore::new(ledger.session(alice));

    let result = store.insert_mark(follow(&bob, "root-a", 1)).await;
    assert_matches!(result, Err(LedgerError::Unauthorized(_)));
}
