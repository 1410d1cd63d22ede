use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Utc};

use crate::{
    domain::{
        IdentityId, RepoCreateError, RepoError,
        challenge::{ChallengeRecord, ChallengeStatus, ChallengeToken},
        credential::Credential,
        identity::{Identity, normalize_handle},
    },
    ports::{
        challenge::{ChallengeRepository, ConfirmOutcome},
        credential::{CredentialCodec, CredentialSignError, CredentialVerifyError},
        identity::IdentityRepository,
    },
};

#[derive(Default, Clone)]
pub struct MockChallengeRepository {
    pub records: Arc<Mutex<HashMap<String, ChallengeRecord>>>,
    pub fail_storage: Arc<AtomicBool>,
}

impl MockChallengeRepository {
    pub fn get(&self, token: &ChallengeToken) -> Option<ChallengeRecord> {
        self.records.lock().unwrap().get(token.as_str()).cloned()
    }

    /// Writes a row as-is, bypassing every invariant.
    pub fn put_raw(&self, record: ChallengeRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.token.as_str().to_string(), record);
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(RepoError::StorageError("storage offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChallengeRepository for MockChallengeRepository {
    async fn insert(&self, record: &ChallengeRecord) -> Result<(), RepoCreateError> {
        self.check()
            .map_err(|RepoError::StorageError(e)| RepoCreateError::StorageError(e))?;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(record.token.as_str()) {
            return Err(RepoCreateError::Conflict);
        }
        records.insert(record.token.as_str().to_string(), record.clone());
        Ok(())
    }

    async fn find(&self, token: &ChallengeToken) -> Result<Option<ChallengeRecord>, RepoError> {
        self.check()?;
        Ok(self.get(token))
    }

    async fn confirm_if_pending(
        &self,
        token: &ChallengeToken,
        identity: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, RepoError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(token.as_str()) else {
            return Ok(ConfirmOutcome::NotFound);
        };
        if !record.is_live(now) {
            return Ok(ConfirmOutcome::NotFound);
        }
        match record.status {
            ChallengeStatus::Confirmed => Ok(ConfirmOutcome::AlreadyConfirmed),
            ChallengeStatus::Pending => {
                record.status = ChallengeStatus::Confirmed;
                record.bound_identity = Some(identity);
                Ok(ConfirmOutcome::Applied)
            }
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, record| record.is_live(now));
        Ok((before - records.len()) as u64)
    }
}

#[derive(Default, Clone)]
pub struct MockIdentityRepository {
    pub identities: Arc<Mutex<Vec<Identity>>>,
}

impl MockIdentityRepository {
    /// Seeds an identity with a cheap bcrypt cost so tests stay fast.
    pub fn with_identity(self, id: i64, handle: &str, secret: &str) -> Self {
        let secret_verifier = bcrypt::hash(secret, 4).unwrap();
        self.identities.lock().unwrap().push(Identity {
            id: IdentityId(id),
            handle: normalize_handle(handle),
            secret_verifier,
        });
        self
    }
}

#[async_trait::async_trait]
impl IdentityRepository for MockIdentityRepository {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, RepoError> {
        let handle = normalize_handle(handle);
        Ok(self
            .identities
            .lock()
            .unwrap()
            .iter()
            .find(|identity| identity.handle == handle)
            .cloned())
    }

    async fn create(
        &self,
        handle: &str,
        secret_verifier: &str,
    ) -> Result<IdentityId, RepoCreateError> {
        let handle = normalize_handle(handle);
        let mut identities = self.identities.lock().unwrap();
        if identities.iter().any(|identity| identity.handle == handle) {
            return Err(RepoCreateError::Conflict);
        }
        let id = IdentityId(identities.len() as i64 + 1);
        identities.push(Identity {
            id,
            handle,
            secret_verifier: secret_verifier.to_string(),
        });
        Ok(id)
    }
}

/// Codec that keeps issued credentials in memory and hands out opaque ids.
/// Tampering is modelled by presenting any id it never issued.
#[derive(Default, Clone)]
pub struct MockCredentialCodec {
    issued: Arc<Mutex<HashMap<String, Credential>>>,
    next: Arc<AtomicU64>,
}

impl MockCredentialCodec {
    pub fn issued_count(&self) -> usize {
        self.issued.lock().unwrap().len()
    }
}

impl CredentialCodec for MockCredentialCodec {
    fn sign(&self, credential: &Credential) -> Result<String, CredentialSignError> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let token = format!("mock.{}.{}", credential.profile.as_str(), n);
        self.issued
            .lock()
            .unwrap()
            .insert(token.clone(), credential.clone());
        Ok(token)
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Credential, CredentialVerifyError> {
        if !token.starts_with("mock.") {
            return Err(CredentialVerifyError::Malformed);
        }
        let credential = self
            .issued
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(CredentialVerifyError::BadSignature)?;
        if !credential.is_valid_at(now) {
            return Err(CredentialVerifyError::Expired);
        }
        Ok(credential)
    }
}
