// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_matches::assert_matches;
use rprotocols_core::{Cid, RootId, Stage, Version, VersionRecord, address_of};
use serde_json::{Value, json};

use crate::error::RegistryError;
use crate::memory::MemoryStore;
use crate::versions::{NewVersion, VersionStore, chain, get_by_cid, get_by_root_version, put};

fn new_version(root_id: &str, version: Version, content: Value, prev_cid: Option<Cid>) -> NewVersion {
    NewVersion {
        root_id: RootId::new(root_id).unwrap(),
        version,
        content,
        prev_cid,
        fork_of: None,
        stage: Stage::Draft,
        author: None,
        notes: None,
    }
}

#[tokio::test]
async fn put_is_idempotent_and_immutable() {
    let store = MemoryStore::new();
    let v01 = Version::new(0, 1);

    let first = put(
        &store,
        new_version("root-a", v01, json!({ "title": "A", "body": "x\r\ny" }), None),
        1,
    )
    .await
    .unwrap();
    assert_eq!(first.cid, address_of(&json!({ "body": "x\ny", "title": "A" })).unwrap());
    assert_eq!(first.content, json!({ "body": "x\ny", "title": "A" }));

    // Same content in a different key order and line ending style is the same version.
    let again = put(
        &store,
        new_version("root-a", v01, json!({ "body": "x\ny", "title": "A" }), None),
        2,
    )
    .await
    .unwrap();
    assert_eq!(again, first);
    assert_eq!(again.created_at, 1);

    let result = put(
        &store,
        new_version("root-a", v01, json!({ "title": "B" }), None),
        3,
    )
    .await;
    assert_matches!(
        result,
        Err(RegistryError::ImmutableConflict { existing, .. }) if existing == first.cid
    );

    let stored = store
        .get_version(&RootId::new("root-a").unwrap(), &v01)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
async fn lineage_rules() {
    let store = MemoryStore::new();

    let v01 = put(&store, new_version("root-a", Version::new(0, 1), json!("one"), None), 1)
        .await
        .unwrap();

    // Only the first version has no previous cid.
    assert_matches!(
        put(&store, new_version("root-a", Version::new(0, 2), json!("two"), None), 2).await,
        Err(RegistryError::PreviousMismatch { expected: Some(cid), found: None, .. }) if cid == v01.cid
    );

    let v02 = put(
        &store,
        new_version("root-a", Version::new(0, 2), json!("two"), Some(v01.cid)),
        2,
    )
    .await
    .unwrap();
    assert_eq!(v02.prev_cid, Some(v01.cid));

    // Taken slots are immutable and versions strictly increase.
    assert_matches!(
        put(&store, new_version("root-a", Version::new(0, 1), json!("other"), Some(v02.cid)), 3).await,
        Err(RegistryError::ImmutableConflict { .. })
    );
    put(&store, new_version("root-b", Version::new(1, 0), json!("b"), None), 3)
        .await
        .unwrap();
    assert_matches!(
        put(&store, new_version("root-b", Version::new(0, 9), json!("older"), None), 4).await,
        Err(RegistryError::StaleVersion { latest, .. }) if latest == Version::new(1, 0)
    );

    // Pointing at anything but the newest version is rejected.
    assert_matches!(
        put(&store, new_version("root-a", Version::new(0, 3), json!("three"), Some(v01.cid)), 5).await,
        Err(RegistryError::PreviousMismatch { .. })
    );

    // Going back to earlier content would loop the chain.
    assert_matches!(
        put(&store, new_version("root-a", Version::new(0, 3), json!("one"), Some(v02.cid)), 6).await,
        Err(RegistryError::LineageCycle { cid, .. }) if cid == v01.cid
    );
}

#[tokio::test]
async fn identical_content_across_roots_shares_cid() {
    let store = MemoryStore::new();

    let a = put(&store, new_version("root-a", Version::new(0, 1), json!({ "t": 1 }), None), 1)
        .await
        .unwrap();
    let b = put(&store, new_version("root-b", Version::new(0, 1), json!({ "t": 1.0 }), None), 1)
        .await
        .unwrap();

    assert_eq!(a.cid, b.cid);
    assert_eq!(
        get_by_cid(&store, &a.cid, true).await.unwrap(),
        Some(json!({ "t": 1 }))
    );
}

#[tokio::test]
async fn chain_walks_lineage() {
    let store = MemoryStore::new();
    let root_id = RootId::new("root-a").unwrap();

    assert!(chain(&store, &root_id).await.unwrap().is_empty());

    let mut prev_cid = None;
    for (index, version) in [Version::new(0, 1), Version::new(0, 2), Version::new(1, 0)]
        .into_iter()
        .enumerate()
    {
        let record = put(
            &store,
            new_version("root-a", version, json!({ "n": index }), prev_cid),
            index as u64,
        )
        .await
        .unwrap();
        prev_cid = Some(record.cid);
    }

    let lineage = chain(&store, &root_id).await.unwrap();
    let versions: Vec<Version> = lineage.iter().map(|record| record.version).collect();
    assert_eq!(
        versions,
        vec![Version::new(0, 1), Version::new(0, 2), Version::new(1, 0)]
    );
    assert_eq!(lineage[0].prev_cid, None);
    assert_eq!(lineage[2].prev_cid, Some(lineage[1].cid));
}

#[tokio::test]
async fn chain_detects_broken_lineage() {
    let store = MemoryStore::new();
    let root_id = RootId::new("root-a").unwrap();

    let first = put(&store, new_version("root-a", Version::new(0, 1), json!("one"), None), 1)
        .await
        .unwrap();

    // A backend write bypassing `put` which starts a second chain.
    let content = json!("detached");
    let detached = VersionRecord {
        root_id: root_id.clone(),
        version: Version::new(0, 2),
        cid: address_of(&content).unwrap(),
        prev_cid: None,
        content,
        fork_of: None,
        stage: Stage::Draft,
        created_at: 2,
        author: None,
        notes: None,
    };
    assert!(store.insert_version(&detached).await.unwrap().is_none());
    assert_matches!(
        chain(&store, &root_id).await,
        Err(RegistryError::BrokenLineage(_))
    );

    // A record pointing at unknown content.
    let store = MemoryStore::new();
    put(&store, new_version("root-a", Version::new(0, 1), json!("one"), None), 1)
        .await
        .unwrap();
    let content = json!("dangling");
    let dangling = VersionRecord {
        version: Version::new(0, 2),
        cid: address_of(&content).unwrap(),
        prev_cid: Some(address_of(&json!("nowhere")).unwrap()),
        content,
        ..first
    };
    store.insert_version(&dangling).await.unwrap();
    assert_matches!(
        chain(&store, &root_id).await,
        Err(RegistryError::BrokenLineage(_))
    );
}

#[tokio::test]
async fn verify_detects_tampered_content() {
    let store = MemoryStore::new();
    let root_id = RootId::new("root-a").unwrap();
    let version = Version::new(0, 1);

    let record = put(&store, new_version("root-a", version, json!({ "title": "A" }), None), 1)
        .await
        .unwrap();

    {
        let mut inner = store.write_store();
        inner
            .contents
            .insert(record.cid, json!({ "title": "Tampered" }));
        if let Some(stored) = inner
            .versions
            .get_mut(&root_id)
            .and_then(|versions| versions.get_mut(&version))
        {
            stored.content = json!({ "title": "Tampered" });
        }
    }

    // Without verification the backend is trusted.
    assert!(get_by_cid(&store, &record.cid, false).await.unwrap().is_some());

    assert_matches!(
        get_by_cid(&store, &record.cid, true).await,
        Err(RegistryError::AddressMismatch { expected, .. }) if expected == record.cid
    );
    assert_matches!(
        get_by_root_version(&store, &root_id, &version, true).await,
        Err(RegistryError::AddressMismatch { .. })
    );
    assert_matches!(
        get_by_root_version(&store, &root_id, &Version::new(9, 0), true).await,
        Ok(None)
    );
}
