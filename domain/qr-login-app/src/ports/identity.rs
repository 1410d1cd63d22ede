use crate::domain::{IdentityId, RepoCreateError, RepoError, identity::Identity};

/// The external credential store. Implementations normalize handles with
/// [`crate::domain::identity::normalize_handle`] on both lookup and insert.
#[async_trait::async_trait]
pub trait IdentityRepository {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, RepoError>;
    async fn create(
        &self,
        handle: &str,
        secret_verifier: &str,
    ) -> Result<IdentityId, RepoCreateError>;
}
