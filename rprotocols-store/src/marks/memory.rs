// SPDX-License-Identifier: MIT OR Apache-2.0

use std::convert::Infallible;

use rprotocols_core::{ActorId, Mark, MarkId, MarkKey, MarkVerb};

use crate::marks::{MarkStore, NewMark};
use crate::memory::{InnerMemoryStore, MemoryStore};

impl InnerMemoryStore {
    fn index_mark(&mut self, mark: &Mark) {
        let key = mark.key();
        if mark.is_ended() {
            if self.mark_slots.get(&key) == Some(&mark.id) {
                self.mark_slots.remove(&key);
            }
        } else {
            self.mark_slots.insert(key, mark.id.clone());
        }
    }
}

impl MarkStore for MemoryStore {
    type Error = Infallible;

    async fn insert_mark(&self, mark: NewMark) -> Result<Mark, Self::Error> {
        let id = MarkId::new(hex::encode(rand::random::<[u8; 16]>()));
        let mark = mark.into_mark(id);

        let mut store = self.write_store();
        store.index_mark(&mark);
        store.marks.insert(mark.id.clone(), mark.clone());
        Ok(mark)
    }

    async fn update_mark(&self, mark: &Mark) -> Result<bool, Self::Error> {
        let mut store = self.write_store();
        if !store.marks.contains_key(&mark.id) {
            return Ok(false);
        }
        store.index_mark(mark);
        store.marks.insert(mark.id.clone(), mark.clone());
        Ok(true)
    }

    async fn delete_mark(&self, id: &MarkId) -> Result<bool, Self::Error> {
        let mut store = self.write_store();
        let Some(mark) = store.marks.remove(id) else {
            return Ok(false);
        };
        let key = mark.key();
        if store.mark_slots.get(&key) == Some(id) {
            store.mark_slots.remove(&key);
        }
        Ok(true)
    }

    async fn find_mark(&self, key: &MarkKey) -> Result<Option<Mark>, Self::Error> {
        let store = self.read_store();
        Ok(store
            .mark_slots
            .get(key)
            .and_then(|id| store.marks.get(id))
            .cloned())
    }

    async fn list_marks(
        &self,
        actor: &ActorId,
        verb: Option<MarkVerb>,
    ) -> Result<Vec<Mark>, Self::Error> {
        let store = self.read_store();
        let mut marks: Vec<Mark> = store
            .marks
            .values()
            .filter(|mark| &mark.actor == actor && verb.is_none_or(|verb| mark.verb == verb))
            .cloned()
            .collect();
        marks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(marks)
    }
}
