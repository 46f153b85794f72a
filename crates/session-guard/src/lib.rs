//! Session Guard: owns the access/refresh credential pair and gates every
//! authenticated request behind a freshness check.
//!
//! The guard is the only writer of the remote client's bearer token. Callers
//! invoke [`SessionGuard::authorize`] immediately before each authenticated
//! call instead of caching the token.

mod auth_fsm;
mod error;
mod guard;
mod session;

pub use auth_fsm::{
    AuthMachine, AuthMachineInput, AuthMachineState, AuthState, AuthStateChangedPayload,
};
pub use error::{AuthError, AuthResult};
pub use guard::{AuthStateCallback, ResetHook, SessionGuard};
pub use session::{Session, SessionPolicy};
