use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::IdentityId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialProfile {
    /// Short-lived proof of the confirmer's identity; only good for one
    /// confirmation call.
    Login,
    /// Long-lived proof handed to the poller once its challenge is confirmed.
    Session,
}

impl CredentialProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialProfile::Login => "login",
            CredentialProfile::Session => "session",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "login" => Some(CredentialProfile::Login),
            "session" => Some(CredentialProfile::Session),
            _ => None,
        }
    }
}

/// Decoded bearer credential. Never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Credential {
    pub subject: IdentityId,
    pub handle: Option<String>,
    pub profile: CredentialProfile,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A signed credential ready to hand to a client.
#[derive(Clone, Debug, PartialEq)]
pub struct IssuedCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CredentialPolicy {
    pub login_ttl: TimeDelta,
    pub session_ttl: TimeDelta,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            login_ttl: TimeDelta::minutes(5),
            session_ttl: TimeDelta::days(7),
        }
    }
}

impl CredentialPolicy {
    pub fn ttl_for(&self, profile: CredentialProfile) -> TimeDelta {
        match profile {
            CredentialProfile::Login => self.login_ttl,
            CredentialProfile::Session => self.session_ttl,
        }
    }

    /// Builds the claims for a new credential. Times are truncated to whole
    /// seconds since that is all the wire format carries.
    pub fn issue(
        &self,
        profile: CredentialProfile,
        subject: IdentityId,
        handle: Option<String>,
        now: DateTime<Utc>,
    ) -> Credential {
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        Credential {
            subject,
            handle,
            profile,
            issued_at,
            expires_at: issued_at + self.ttl_for(profile),
        }
    }
}
