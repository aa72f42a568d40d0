// SPDX-License-Identifier: MIT OR Apache-2.0

use rprotocols_core::{
    ActorId, DocumentKind, MarkKey, MarkSet, MarkStatus, MarkVerb, RootId, Version,
};

use crate::assert_all_mark_stores;
use crate::marks::{MarkStore, NewMark};
use crate::test_utils::setup_logging;

fn new_mark(actor: &str, subject: &str, verb: MarkVerb, created_at: u64) -> NewMark {
    NewMark {
        actor: ActorId::new(actor).unwrap(),
        verb,
        subject_kind: DocumentKind::Protocol,
        subject_root_id: RootId::new(subject).unwrap(),
        subject_version: match verb {
            MarkVerb::Adopt => Some(Version::new(1, 0)),
            MarkVerb::Follow => None,
        },
        status: MarkStatus::Active,
        context: None,
        created_at,
    }
}

#[tokio::test]
async fn insert_and_find() {
    setup_logging();

    assert_all_mark_stores!(|store| async {
        let mark = store
            .insert_mark(new_mark("did:plc:alice", "root-a", MarkVerb::Follow, 1))
            .await
            .unwrap();
        assert!(mark.is_active());
        assert_eq!(mark.updated_at, None);

        let found = store.find_mark(&mark.key()).await.unwrap();
        assert_eq!(found, Some(mark.clone()));

        // Slots are separate per verb, subject and actor.
        for key in [
            MarkKey::new(mark.actor.clone(), mark.subject_root_id.clone(), MarkVerb::Adopt),
            MarkKey::new(
                mark.actor.clone(),
                RootId::new("root-b").unwrap(),
                MarkVerb::Follow,
            ),
            MarkKey::new(
                ActorId::new("did:plc:bob").unwrap(),
                mark.subject_root_id.clone(),
                MarkVerb::Follow,
            ),
        ] {
            assert_eq!(store.find_mark(&key).await.unwrap(), None);
        }
    });
}

#[tokio::test]
async fn ended_marks_free_their_slot() {
    assert_all_mark_stores!(|store| async {
        let mut mark = store
            .insert_mark(new_mark("did:plc:alice", "root-a", MarkVerb::Follow, 1))
            .await
            .unwrap();

        mark.status = MarkStatus::Paused;
        mark.updated_at = Some(2);
        assert!(store.update_mark(&mark).await.unwrap());
        let found = store.find_mark(&mark.key()).await.unwrap().unwrap();
        assert_eq!(found.status, MarkStatus::Paused);
        assert_eq!(found.updated_at, Some(2));

        mark.status = MarkStatus::Ended;
        mark.updated_at = Some(3);
        assert!(store.update_mark(&mark).await.unwrap());
        assert_eq!(store.find_mark(&mark.key()).await.unwrap(), None);

        // The ended mark is still listed.
        let marks = store.list_marks(&mark.actor, None).await.unwrap();
        assert_eq!(marks, vec![mark.clone()]);

        let next = store
            .insert_mark(new_mark("did:plc:alice", "root-a", MarkVerb::Follow, 4))
            .await
            .unwrap();
        assert_ne!(next.id, mark.id);
        assert_eq!(store.find_mark(&mark.key()).await.unwrap(), Some(next));
    });
}

#[tokio::test]
async fn update_and_delete_unknown_marks() {
    assert_all_mark_stores!(|store| async {
        let mark = store
            .insert_mark(new_mark("did:plc:alice", "root-a", MarkVerb::Follow, 1))
            .await
            .unwrap();
        assert!(store.delete_mark(&mark.id).await.unwrap());
        assert!(!store.delete_mark(&mark.id).await.unwrap());
        assert!(!store.update_mark(&mark).await.unwrap());
        assert_eq!(store.find_mark(&mark.key()).await.unwrap(), None);
        assert!(store.list_marks(&mark.actor, None).await.unwrap().is_empty());
    });
}

#[tokio::test]
async fn list_marks_of_actor() {
    assert_all_mark_stores!(|store| async {
        let alice = ActorId::new("did:plc:alice").unwrap();
        for (i, (subject, verb)) in [
            ("root-a", MarkVerb::Follow),
            ("root-a", MarkVerb::Adopt),
            ("root-b", MarkVerb::Follow),
            ("root-c", MarkVerb::Follow),
            ("root-c", MarkVerb::Adopt),
        ]
        .into_iter()
        .enumerate()
        {
            store
                .insert_mark(new_mark(alice.as_str(), subject, verb, i as u64))
                .await
                .unwrap();
        }
        store
            .insert_mark(new_mark("did:plc:bob", "root-a", MarkVerb::Follow, 9))
            .await
            .unwrap();

        let marks = store.list_marks(&alice, None).await.unwrap();
        assert_eq!(marks.len(), 5);
        assert!(marks.windows(2).all(|w| w[0].created_at < w[1].created_at));

        let adopted = store
            .list_marks(&alice, Some(MarkVerb::Adopt))
            .await
            .unwrap();
        let subjects: Vec<&str> = adopted
            .iter()
            .map(|mark| mark.subject_root_id.as_str())
            .collect();
        assert_eq!(subjects, ["root-a", "root-c"]);
        assert!(adopted
            .iter()
            .all(|mark| mark.subject_version == Some(Version::new(1, 0))));

        let set: MarkSet = marks.iter().collect();
        assert_eq!(set.len(), 5);
        assert!(set.contains(&RootId::new("root-b").unwrap(), MarkVerb::Follow));
        assert!(!set.contains(&RootId::new("root-b").unwrap(), MarkVerb::Adopt));
    });
}
