//! Session record and token lifetime policy.

use chrono::{DateTime, Duration, Utc};
use notebook_config_and_utils::Config;
use remote_authority::{AuthGrant, UserIdentity};
use serde::{Deserialize, Serialize};

/// Lifetimes the client assumes for issued credentials.
///
/// The server does not report expiries, so they are derived locally from the
/// moment a credential is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
    /// An access credential this close to expiry counts as expired.
    pub expiry_margin: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_lifetime: Duration::seconds(config.access_token_lifetime_secs),
            refresh_lifetime: Duration::seconds(config.refresh_token_lifetime_secs),
            expiry_margin: Duration::seconds(config.token_expiry_margin_secs),
        }
    }
}

/// Identity and credentials of the current user.
///
/// The default value is the guest session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub email: String,
    pub access_token: Option<String>,
    pub access_expiry: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub refresh_expiry: Option<DateTime<Utc>>,
    pub authenticated: bool,
}

impl Session {
    /// Build an authenticated session from a sign-in/sign-up grant received at `now`.
    pub fn from_grant(grant: &AuthGrant, policy: &SessionPolicy, now: DateTime<Utc>) -> Self {
        Self {
            username: grant.user.username.clone(),
            email: grant.user.email.clone(),
            access_token: Some(grant.access_token.clone()),
            access_expiry: Some(now + policy.access_lifetime),
            refresh_token: Some(grant.refresh_token.clone()),
            refresh_expiry: Some(now + policy.refresh_lifetime),
            authenticated: true,
        }
    }

    /// Whether the access credential has reached its expiry threshold.
    pub fn access_expired(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match (&self.access_token, self.access_expiry) {
            (Some(_), Some(expiry)) => now + margin >= expiry,
            _ => true,
        }
    }

    pub fn refresh_expired(&self, now: DateTime<Utc>) -> bool {
        match (&self.refresh_token, self.refresh_expiry) {
            (Some(_), Some(expiry)) => now >= expiry,
            _ => true,
        }
    }

    /// Install a refreshed access credential received at `now`.
    pub fn install_access(&mut self, token: String, policy: &SessionPolicy, now: DateTime<Utc>) {
        self.access_token = Some(token);
        self.access_expiry = Some(now + policy.access_lifetime);
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.authenticated.then(|| UserIdentity {
            username: self.username.clone(),
            email: self.email.clone(),
        })
    }
}
