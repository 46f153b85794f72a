//! Authentication state machine using rust-fsm.
//!
//! ```text
//!            SignInAttempt                SignInSuccess
//! SignedOut ──────────────► SigningIn ──────────────► SignedIn ◄──┐
//!     ▲  ▲                    │   │ SignInAborted        ▲  │      │ RefreshSuccess
//!     │  └────────────────────┘   └──────────────────────┘  │      │ RefreshAborted
//!     │       SignInFailed                                  │ AccessExpired
//!     │                                                     ▼      │
//!     │ SignOutComplete        SignOutRequested          Refreshing┘
//!     └──────────── SigningOut ◄───────────────── (SignedIn | Refreshing)
//!
//! RefreshExpired (from SignedIn or Refreshing) ──► SignedOut
//! Restored (from SignedOut, persisted session) ──► SignedIn
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(SignedOut)

    SignedOut => {
        SignInAttempt => SigningIn,
        Restored => SignedIn
    },
    SigningIn => {
        SignInSuccess => SignedIn,
        SignInFailed => SignedOut,
        // a failed attempt to switch accounts keeps the prior session
        SignInAborted => SignedIn
    },
    SignedIn => {
        SignInAttempt => SigningIn,
        AccessExpired => Refreshing,
        RefreshExpired => SignedOut,
        SignOutRequested => SigningOut
    },
    Refreshing => {
        RefreshSuccess => SignedIn,
        RefreshAborted => SignedIn,
        RefreshExpired => SignedOut,
        SignOutRequested => SigningOut
    },
    SigningOut => {
        SignOutComplete => SignedOut
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Simplified view of the FSM state for the read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    SignedOut,
    SigningIn,
    SignedIn,
    Refreshing,
    SigningOut,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn | AuthState::Refreshing)
    }

    /// Returns true if the state is an in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::SigningIn | AuthState::Refreshing | AuthState::SigningOut
        )
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::SignedOut => AuthState::SignedOut,
            AuthMachineState::SigningIn => AuthState::SigningIn,
            AuthMachineState::SignedIn => AuthState::SignedIn,
            AuthMachineState::Refreshing => AuthState::Refreshing,
            AuthMachineState::SigningOut => AuthState::SigningOut,
        }
    }
}

/// Payload for auth state change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    pub state: AuthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_signed_out() {
        let machine = AuthMachine::new();
        assert_eq!(*machine.state(), AuthMachineState::SignedOut);
    }

    #[test]
    fn test_sign_in_flow() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::SignInAttempt).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::SigningIn);

        machine.consume(&AuthMachineInput::SignInSuccess).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::SignedIn);
    }

    #[test]
    fn test_failed_account_switch_returns_to_signed_in() {
        let mut machine = AuthMachine::new();
        machine.consume(&AuthMachineInput::Restored).unwrap();

        machine.consume(&AuthMachineInput::SignInAttempt).unwrap();
        machine.consume(&AuthMachineInput::SignInAborted).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::SignedIn);
    }

    #[test]
    fn test_refresh_outcomes() {
        let mut machine = AuthMachine::new();
        machine.consume(&AuthMachineInput::Restored).unwrap();

        machine.consume(&AuthMachineInput::AccessExpired).unwrap();
        machine.consume(&AuthMachineInput::RefreshAborted).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::SignedIn);

        machine.consume(&AuthMachineInput::AccessExpired).unwrap();
        machine.consume(&AuthMachineInput::RefreshExpired).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::SignedOut);
    }

    #[test]
    fn test_invalid_transition() {
        let mut machine = AuthMachine::new();
        assert!(machine.consume(&AuthMachineInput::RefreshSuccess).is_err());
        assert!(machine.consume(&AuthMachineInput::SignOutComplete).is_err());
        assert_eq!(*machine.state(), AuthMachineState::SignedOut);
    }

    #[test]
    fn test_auth_state_flags() {
        assert!(AuthState::SignedIn.is_authenticated());
        assert!(AuthState::Refreshing.is_authenticated());
        assert!(!AuthState::SigningIn.is_authenticated());
        assert!(AuthState::SigningOut.is_transient());
        assert!(!AuthState::SignedOut.is_transient());
    }
}
