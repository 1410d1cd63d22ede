//! Behaviour every storage adapter has to share, run against each of them.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta};
use qr_login_app::{
    domain::{
        IdentityId, RepoCreateError,
        challenge::{ChallengeRecord, ChallengeStatus, ChallengeToken},
    },
    ports::{
        challenge::{ChallengeRepository, ConfirmOutcome},
        identity::IdentityRepository,
    },
};

pub async fn challenge_repository_contract<R: ChallengeRepository>(
    repo: &R,
    first: IdentityId,
    second: IdentityId,
) {
    let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let ttl = TimeDelta::minutes(10);
    let record = ChallengeRecord::new_pending(ChallengeToken::generate(), start, ttl);

    repo.insert(&record).await.unwrap();
    assert!(matches!(
        repo.insert(&record).await,
        Err(RepoCreateError::Conflict)
    ));
    assert_eq!(repo.find(&record.token).await.unwrap(), Some(record.clone()));
    assert_eq!(repo.find(&ChallengeToken::generate()).await.unwrap(), None);

    // Expired rows refuse confirmation but are still physically present.
    let stale = ChallengeRecord::new_pending(ChallengeToken::generate(), start, ttl);
    repo.insert(&stale).await.unwrap();
    assert_eq!(
        repo.confirm_if_pending(&stale.token, first, start + ttl)
            .await
            .unwrap(),
        ConfirmOutcome::NotFound
    );
    assert_eq!(
        repo.find(&stale.token).await.unwrap().unwrap().status,
        ChallengeStatus::Pending
    );

    let now = start + TimeDelta::minutes(1);
    assert_eq!(
        repo.confirm_if_pending(&ChallengeToken::generate(), first, now)
            .await
            .unwrap(),
        ConfirmOutcome::NotFound
    );
    assert_eq!(
        repo.confirm_if_pending(&record.token, first, now)
            .await
            .unwrap(),
        ConfirmOutcome::Applied
    );
    assert_eq!(
        repo.confirm_if_pending(&record.token, second, now)
            .await
            .unwrap(),
        ConfirmOutcome::AlreadyConfirmed
    );

    let stored = repo.find(&record.token).await.unwrap().unwrap();
    assert_eq!(stored.status, ChallengeStatus::Confirmed);
    assert_eq!(stored.bound_identity, Some(first));

    let fresh = ChallengeRecord::new_pending(ChallengeToken::generate(), start + ttl, ttl);
    repo.insert(&fresh).await.unwrap();
    assert_eq!(repo.purge_expired(start + ttl).await.unwrap(), 2);
    assert_eq!(repo.find(&record.token).await.unwrap(), None);
    assert_eq!(repo.find(&stale.token).await.unwrap(), None);
    assert!(repo.find(&fresh.token).await.unwrap().is_some());
}

pub async fn challenge_repository_race<R: ChallengeRepository + Send + Sync + 'static>(
    repo: Arc<R>,
    contenders: Vec<IdentityId>,
) {
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let record = ChallengeRecord::new_pending(ChallengeToken::generate(), now, TimeDelta::minutes(10));
    repo.insert(&record).await.unwrap();

    let handles = contenders
        .into_iter()
        .map(|identity| {
            let repo = repo.clone();
            let token = record.token.clone();
            tokio::spawn(async move {
                (
                    identity,
                    repo.confirm_if_pending(&token, identity, now).await.unwrap(),
                )
            })
        })
        .collect::<Vec<_>>();

    let mut winners = Vec::new();
    for handle in handles {
        let (identity, outcome) = handle.await.unwrap();
        match outcome {
            ConfirmOutcome::Applied => winners.push(identity),
            other => assert_eq!(other, ConfirmOutcome::AlreadyConfirmed),
        }
    }

    assert_eq!(winners.len(), 1);
    let stored = repo.find(&record.token).await.unwrap().unwrap();
    assert_eq!(stored.bound_identity, Some(winners[0]));
}

pub async fn identity_repository_contract<R: IdentityRepository>(repo: &R) {
    let id = repo.create("User@X.com", "verifier").await.unwrap();
    assert!(matches!(
        repo.create(" user@x.com ", "other").await,
        Err(RepoCreateError::Conflict)
    ));
    let other = repo.create("other@x.com", "verifier").await.unwrap();
    assert_ne!(id, other);

    let identity = repo.find_by_handle("USER@x.com").await.unwrap().unwrap();
    assert_eq!(identity.id, id);
    assert_eq!(identity.handle, "user@x.com");
    assert_eq!(identity.secret_verifier, "verifier");

    assert!(repo.find_by_handle("nobody@x.com").await.unwrap().is_none());
}
