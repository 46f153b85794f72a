//! Engine scenario tests.
//!
//! - `harness.rs`     - scripted remote authority and engine builders
//! - `relations.rs`   - tag/note membership stays symmetric
//! - `deletes.rs`     - optimistic, idempotent deletes and section cascade
//! - `fetches.rs`     - latest-wins fetch-all and read availability
//! - `field_edits.rs` - throttled field updates
//! - `filters.rs`     - filter intersection driven through intents
//! - `guest.rs`       - guest mode and sign-in isolation
//! - `session.rs`     - token refresh and forced sign-out
//! - `connectivity.rs` - health monitor

mod deletes;
mod filters;
mod relations;
