use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::IdentityId;

/// Opaque, unguessable identifier of one cross-device login attempt.
///
/// Always held in canonical hyphenated lowercase UUID form, so the string is
/// usable directly as a storage key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChallengeToken(String);

impl ChallengeToken {
    /// Fresh token from a v4 UUID (122 random bits from the OS RNG).
    pub fn generate() -> Self {
        ChallengeToken(uuid::Uuid::new_v4().as_hyphenated().to_string())
    }

    /// Accepts any textual UUID form and normalizes it. Anything else is
    /// rejected, and callers report that exactly like an unknown token.
    pub fn parse(raw: &str) -> Option<Self> {
        uuid::Uuid::try_parse(raw.trim())
            .ok()
            .map(|uuid| ChallengeToken(uuid.as_hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines; the full token is a bearer secret until
    /// it expires.
    pub fn log_prefix(&self) -> &str {
        &self.0[..8]
    }
}

impl std::fmt::Display for ChallengeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status as persisted. `Expired` is deliberately absent: it is derived from
/// `expires_at` at read time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeStatus {
    Pending,
    Confirmed,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ChallengeStatus::Pending),
            "confirmed" => Some(ChallengeStatus::Confirmed),
            _ => None,
        }
    }
}

/// Storage-level row. Nothing about it is trusted until converted with
/// [`ChallengeRecord::into_session`].
#[derive(Clone, Debug, PartialEq)]
pub struct ChallengeRecord {
    pub token: ChallengeToken,
    pub status: ChallengeStatus,
    pub bound_identity: Option<IdentityId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeRecord {
    pub fn new_pending(token: ChallengeToken, created_at: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            token,
            status: ChallengeStatus::Pending,
            bound_identity: None,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn into_session(self) -> Result<ChallengeSession, IntegrityFault> {
        let state = match (self.status, self.bound_identity) {
            (ChallengeStatus::Pending, None) => ChallengeState::Pending,
            (ChallengeStatus::Confirmed, Some(bound_identity)) => {
                ChallengeState::Confirmed { bound_identity }
            }
            (ChallengeStatus::Confirmed, None) => {
                return Err(IntegrityFault {
                    token: self.token,
                    detail: "confirmed challenge without a bound identity",
                });
            }
            (ChallengeStatus::Pending, Some(_)) => {
                return Err(IntegrityFault {
                    token: self.token,
                    detail: "pending challenge with a bound identity",
                });
            }
        };
        Ok(ChallengeSession {
            token: self.token,
            state,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeState {
    Pending,
    Confirmed { bound_identity: IdentityId },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChallengeSession {
    pub token: ChallengeToken,
    pub state: ChallengeState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A stored row that breaks the "bound identity iff confirmed" invariant.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegrityFault {
    pub token: ChallengeToken,
    pub detail: &'static str,
}

impl std::fmt::Display for IntegrityFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "integrity fault on challenge {}…: {}",
            self.token.log_prefix(),
            self.detail
        )
    }
}

/// What the poller gets back from `createChallenge`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewChallenge {
    pub token: ChallengeToken,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: ChallengeStatus, bound_identity: Option<IdentityId>) -> ChallengeRecord {
        let created_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        ChallengeRecord {
            token: ChallengeToken::generate(),
            status,
            bound_identity,
            created_at,
            expires_at: created_at + TimeDelta::minutes(10),
        }
    }

    #[test]
    fn test_generated_tokens_are_unique_v4() {
        let a = ChallengeToken::generate();
        let b = ChallengeToken::generate();
        assert_ne!(a, b);
        let parsed = uuid::Uuid::parse_str(a.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_parse_normalizes_and_rejects_garbage() {
        let token = ChallengeToken::generate();
        let upper = token.as_str().to_ascii_uppercase();
        assert_eq!(ChallengeToken::parse(&upper), Some(token.clone()));
        assert_eq!(ChallengeToken::parse(&format!(" {} ", token)), Some(token));
        assert_eq!(ChallengeToken::parse("Hello, World!"), None);
        assert_eq!(ChallengeToken::parse(""), None);
    }

    #[test]
    fn test_liveness_boundary() {
        let rec = record(ChallengeStatus::Pending, None);
        assert!(rec.is_live(rec.created_at));
        assert!(rec.is_live(rec.expires_at - TimeDelta::milliseconds(1)));
        assert!(!rec.is_live(rec.expires_at));
        assert!(!rec.is_live(rec.expires_at + TimeDelta::seconds(1)));
    }

    #[test]
    fn test_new_pending_expiry() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let rec = ChallengeRecord::new_pending(ChallengeToken::generate(), now, TimeDelta::minutes(10));
        assert_eq!(rec.status, ChallengeStatus::Pending);
        assert_eq!(rec.bound_identity, None);
        assert_eq!(rec.expires_at - rec.created_at, TimeDelta::minutes(10));
    }

    #[test]
    fn test_into_session_valid_states() {
        let pending = record(ChallengeStatus::Pending, None).into_session().unwrap();
        assert_eq!(pending.state, ChallengeState::Pending);

        let confirmed = record(ChallengeStatus::Confirmed, Some(IdentityId(7)))
            .into_session()
            .unwrap();
        assert_eq!(
            confirmed.state,
            ChallengeState::Confirmed {
                bound_identity: IdentityId(7)
            }
        );
    }

    #[test]
    fn test_into_session_integrity_faults() {
        let fault = record(ChallengeStatus::Confirmed, None)
            .into_session()
            .unwrap_err();
        assert!(fault.detail.contains("without a bound identity"));

        assert!(
            record(ChallengeStatus::Pending, Some(IdentityId(1)))
                .into_session()
                .is_err()
        );
    }

    #[test]
    fn test_status_strings() {
        for status in [ChallengeStatus::Pending, ChallengeStatus::Confirmed] {
            assert_eq!(ChallengeStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ChallengeStatus::parse("expired"), None);
    }
}
