//! Generic rank-ordered entity collection.

use crate::{Note, NoteId, NotePatch, Section, SectionId, SectionPatch, Tag, TagId, TagPatch};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

/// Gap left between a new entity's rank and the current maximum.
pub const RANK_STEP: i64 = 10_000;

/// Iteration direction over `rank`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankOrder {
    Ascending,
    Descending,
}

/// A record an [`EntityStore`] can hold.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned {
    type Id: Copy + Ord + Debug + Display + Serialize + DeserializeOwned;
    type Patch;

    const ORDER: RankOrder;

    fn id(&self) -> Self::Id;

    fn rank(&self) -> i64;

    /// Parent section, `None` for top-level entities.
    fn scope(&self) -> Option<SectionId>;

    /// Merge the populated fields of `patch` onto `self`.
    fn apply(&mut self, patch: &Self::Patch);
}

impl Entity for Section {
    type Id = SectionId;
    type Patch = SectionPatch;

    const ORDER: RankOrder = RankOrder::Ascending;

    fn id(&self) -> SectionId {
        self.id
    }

    fn rank(&self) -> i64 {
        self.rank
    }

    fn scope(&self) -> Option<SectionId> {
        None
    }

    fn apply(&mut self, patch: &SectionPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(rank) = patch.rank {
            self.rank = rank;
        }
    }
}

impl Entity for Tag {
    type Id = TagId;
    type Patch = TagPatch;

    const ORDER: RankOrder = RankOrder::Ascending;

    fn id(&self) -> TagId {
        self.id
    }

    fn rank(&self) -> i64 {
        self.rank
    }

    fn scope(&self) -> Option<SectionId> {
        Some(self.section)
    }

    fn apply(&mut self, patch: &TagPatch) {
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        if let Some(rank) = patch.rank {
            self.rank = rank;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
    }
}

impl Entity for Note {
    type Id = NoteId;
    type Patch = NotePatch;

    const ORDER: RankOrder = RankOrder::Descending;

    fn id(&self) -> NoteId {
        self.id
    }

    fn rank(&self) -> i64 {
        self.rank
    }

    fn scope(&self) -> Option<SectionId> {
        Some(self.section)
    }

    fn apply(&mut self, patch: &NotePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(rank) = patch.rank {
            self.rank = rank;
        }
        if let Some(tag_set) = &patch.tag_set {
            self.tag_set = tag_set.clone();
        }
    }
}

/// Collection of entities keyed by id.
///
/// Removal is idempotent. Iteration follows `E::ORDER` over rank with ties
/// broken by ascending id, so equal ranks still iterate deterministically.
#[derive(Clone, Debug)]
pub struct EntityStore<E: Entity> {
    entities: BTreeMap<E::Id, E>,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: E::Id) -> Option<&E> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: E::Id) -> Option<&mut E> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.entities.contains_key(&id)
    }

    /// Ids in key order (not rank order).
    pub fn ids(&self) -> impl Iterator<Item = E::Id> + '_ {
        self.entities.keys().copied()
    }

    /// Insert `entity`, replacing any record with the same id.
    ///
    /// Upserts carry complete records (server responses, fresh drafts), so
    /// every field is authoritative. Partial updates go through
    /// [`patch`](Self::patch), which leaves unspecified fields alone.
    pub fn upsert_one(&mut self, entity: E) {
        self.entities.insert(entity.id(), entity);
    }

    pub fn upsert_many(&mut self, entities: impl IntoIterator<Item = E>) {
        for entity in entities {
            self.upsert_one(entity);
        }
    }

    /// Merge `patch` onto an existing record. Returns false if `id` is absent.
    pub fn patch(&mut self, id: E::Id, patch: &E::Patch) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Remove one record, returning it if it was present.
    pub fn remove_one(&mut self, id: E::Id) -> Option<E> {
        self.entities.remove(&id)
    }

    pub fn remove_many(&mut self, ids: impl IntoIterator<Item = E::Id>) -> Vec<E> {
        ids.into_iter().filter_map(|id| self.remove_one(id)).collect()
    }

    /// Wholesale replacement of the collection.
    pub fn set_all(&mut self, entities: impl IntoIterator<Item = E>) {
        self.entities = entities.into_iter().map(|e| (e.id(), e)).collect();
    }

    /// Replace every record of `scope` with `incoming`: remove-then-upsert, so
    /// records missing from `incoming` disappear. Other scopes are untouched.
    /// Returns the records that were dropped.
    pub fn replace_scope(
        &mut self,
        scope: Option<SectionId>,
        incoming: impl IntoIterator<Item = E>,
    ) -> Vec<E> {
        let incoming: BTreeMap<E::Id, E> = incoming.into_iter().map(|e| (e.id(), e)).collect();

        let stale: Vec<E::Id> = self
            .entities
            .values()
            .filter(|e| e.scope() == scope && !incoming.contains_key(&e.id()))
            .map(|e| e.id())
            .collect();
        let dropped = self.remove_many(stale);

        self.entities.extend(incoming);
        dropped
    }

    /// Remove every record in `scope`.
    pub fn remove_scope(&mut self, scope: SectionId) -> Vec<E> {
        let ids: Vec<E::Id> = self
            .entities
            .values()
            .filter(|e| e.scope() == Some(scope))
            .map(|e| e.id())
            .collect();
        self.remove_many(ids)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// All records in rank order.
    pub fn sorted(&self) -> Vec<&E> {
        let mut all: Vec<&E> = self.entities.values().collect();
        all.sort_by(|a, b| compare::<E>(a, b));
        all
    }

    /// Records of one scope in rank order.
    pub fn sorted_in(&self, scope: SectionId) -> Vec<&E> {
        let mut all: Vec<&E> = self
            .entities
            .values()
            .filter(|e| e.scope() == Some(scope))
            .collect();
        all.sort_by(|a, b| compare::<E>(a, b));
        all
    }

    /// Rank for a new record appended to `scope`, strictly above every
    /// existing rank in that scope.
    pub fn next_rank(&self, scope: Option<SectionId>) -> i64 {
        self.entities
            .values()
            .filter(|e| e.scope() == scope)
            .map(|e| e.rank())
            .fold(0, i64::max)
            + RANK_STEP
    }
}

fn compare<E: Entity>(a: &E, b: &E) -> Ordering {
    let by_rank = match E::ORDER {
        RankOrder::Ascending => a.rank().cmp(&b.rank()),
        RankOrder::Descending => b.rank().cmp(&a.rank()),
    };
    by_rank.then_with(|| a.id().cmp(&b.id()))
}

impl<E: Entity> Serialize for EntityStore<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entities.values())
    }
}

impl<'de, E: Entity> Deserialize<'de> for EntityStore<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entities = Vec::<E>::deserialize(deserializer)?;
        let mut store = Self::new();
        store.set_all(entities);
        Ok(store)
    }
}
