//! In-process adapters. State lives only as long as the process, which makes
//! them suitable for tests and single-node demos.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use qr_login_app::{
    domain::{
        IdentityId, RepoCreateError, RepoError,
        challenge::{ChallengeRecord, ChallengeStatus, ChallengeToken},
        identity::{Identity, normalize_handle},
    },
    ports::{
        challenge::{ChallengeRepository, ConfirmOutcome},
        identity::IdentityRepository,
    },
};

#[derive(Clone, Default)]
pub struct MemoryChallengeRepository {
    records: Arc<DashMap<String, ChallengeRecord>>,
}

impl MemoryChallengeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ChallengeRepository for MemoryChallengeRepository {
    async fn insert(&self, record: &ChallengeRecord) -> Result<(), RepoCreateError> {
        match self.records.entry(record.token.as_str().to_string()) {
            Entry::Occupied(_) => Err(RepoCreateError::Conflict),
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find(&self, token: &ChallengeToken) -> Result<Option<ChallengeRecord>, RepoError> {
        Ok(self
            .records
            .get(token.as_str())
            .map(|record| record.value().clone()))
    }

    async fn confirm_if_pending(
        &self,
        token: &ChallengeToken,
        identity: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, RepoError> {
        // The shard write lock is held until `record` drops, so the check and
        // the flip cannot interleave with another confirmation of this token.
        let Some(mut record) = self.records.get_mut(token.as_str()) else {
            return Ok(ConfirmOutcome::NotFound);
        };
        if !record.is_live(now) {
            return Ok(ConfirmOutcome::NotFound);
        }
        Ok(match record.status {
            ChallengeStatus::Confirmed => ConfirmOutcome::AlreadyConfirmed,
            ChallengeStatus::Pending => {
                record.status = ChallengeStatus::Confirmed;
                record.bound_identity = Some(identity);
                ConfirmOutcome::Applied
            }
        })
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let live = record.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        Ok(removed)
    }
}

pub struct MemoryIdentityRepository {
    identities: DashMap<String, Identity>,
    next_id: AtomicI64,
}

impl Default for MemoryIdentityRepository {
    fn default() -> Self {
        Self {
            identities: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, RepoError> {
        Ok(self
            .identities
            .get(&normalize_handle(handle))
            .map(|identity| identity.value().clone()))
    }

    async fn create(
        &self,
        handle: &str,
        secret_verifier: &str,
    ) -> Result<IdentityId, RepoCreateError> {
        match self.identities.entry(normalize_handle(handle)) {
            Entry::Occupied(_) => Err(RepoCreateError::Conflict),
            Entry::Vacant(entry) => {
                let id = IdentityId(self.next_id.fetch_add(1, Ordering::SeqCst));
                let handle = entry.key().clone();
                entry.insert(Identity {
                    id,
                    handle,
                    secret_verifier: secret_verifier.to_string(),
                });
                Ok(id)
            }
        }
    }
}
