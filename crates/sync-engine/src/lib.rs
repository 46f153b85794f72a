//! Optimistic mutation and reconciliation engine.
//!
//! The UI collaborator dispatches [`Intent`]s into an [`Engine`]. Each intent
//! is authorized through the session guard, applied to the entity stores
//! (optimistically, or after the server confirms), fanned out through the
//! [`RelationMaintainer`] so tag and note membership stay symmetric, and
//! reflected in the [`SyncStatus`].
//!
//! Store state sits behind a mutex that is only held between suspension
//! points, so every step between two network calls runs to completion
//! without interleaving with another intent.

mod coordinator;
mod engine;
mod error;
mod filter;
mod health;
mod intent;
mod relations;
mod state;
mod status;
mod throttle;
mod view;

pub use engine::{Engine, EngineSettings};
pub use error::{EngineError, EngineResult, ErrorKind, ErrorSignal};
pub use filter::FilterEngine;
pub use intent::Intent;
pub use relations::{Asymmetry, RelationMaintainer};
pub use status::SyncStatus;
pub use throttle::ThrottledField;
pub use view::{NoteTags, SectionView, SessionView};

#[cfg(test)]
mod tests;
