//! Normalized entity collections for the notebook client.
//!
//! Sections, tags and notes each live in their own [`EntityStore`], keyed by
//! id and iterated in rank order. The tag/note membership is stored on both
//! sides (`Tag::notes`, `Note::tag_set`); this crate only holds the data,
//! keeping the two sides in step is the sync engine's job.
//!
//! [`StoreTree`] bundles the three stores with the per-section filter state
//! and is the unit that gets persisted.

mod ids;
mod model;
mod store;
mod tree;

pub use ids::{NoteId, SectionId, TagId};
pub use model::{
    FilterMeta, NewNote, NewSection, NewTag, Note, NotePatch, Section, SectionPatch, Tag,
    TagPatch,
};
pub use store::{Entity, EntityStore, RankOrder, RANK_STEP};
pub use tree::StoreTree;
