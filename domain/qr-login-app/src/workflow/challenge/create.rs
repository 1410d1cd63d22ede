use std::sync::Arc;

use crate::{
    domain::challenge::NewChallenge,
    services::session_store::{SessionStore, SessionStoreError},
};

#[async_trait::async_trait]
pub trait CreateChallengeUseCase {
    async fn create_challenge(&self) -> Result<NewChallenge, CreateChallengeError>;
}

#[derive(Debug)]
pub enum CreateChallengeError {
    StorageError(String),
}

pub struct CreateChallengeUseCaseImpl<S: SessionStore> {
    session_store: Arc<S>,
}

impl<S: SessionStore> CreateChallengeUseCaseImpl<S> {
    pub fn new(session_store: Arc<S>) -> Self {
        Self { session_store }
    }
}

#[async_trait::async_trait]
impl<S: SessionStore + Send + Sync + 'static> CreateChallengeUseCase
    for CreateChallengeUseCaseImpl<S>
{
    async fn create_challenge(&self) -> Result<NewChallenge, CreateChallengeError> {
        self.session_store
            .create_challenge()
            .await
            .map_err(|SessionStoreError::StorageError(e)| CreateChallengeError::StorageError(e))
    }
}
