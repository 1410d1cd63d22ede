use std::{sync::Arc, time::Duration};

use crate::ports::{challenge::ChallengeRepository, clock::Clock};

/// Deletes challenge rows past their expiry. Liveness never depends on it:
/// expired rows are already invisible to every read.
pub struct PurgeExpiredChallengesJob<R: ChallengeRepository, C: Clock> {
    challenge_repository: Arc<R>,
    clock: Arc<C>,
    interval: Duration,
}

impl<R: ChallengeRepository + Send + Sync + 'static, C: Clock + Send + Sync + 'static>
    PurgeExpiredChallengesJob<R, C>
{
    pub fn new(challenge_repository: Arc<R>, clock: Arc<C>, interval: Duration) -> Self {
        Self {
            challenge_repository,
            clock,
            interval,
        }
    }

    pub async fn purge_once(&self) -> u64 {
        match self
            .challenge_repository
            .purge_expired(self.clock.now())
            .await
        {
            Ok(0) => 0,
            Ok(removed) => {
                log::info!("Purged {} expired challenges", removed);
                removed
            }
            Err(e) => {
                log::error!("Failed to purge expired challenges: {}", e);
                0
            }
        }
    }

    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            interval.tick().await;
            self.purge_once().await;
        }
    }
}
