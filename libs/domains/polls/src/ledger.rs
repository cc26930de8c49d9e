//! Vote Ledger: append-only record of accepted votes

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PollError, PollResult};
use crate::models::Vote;

/// Repository trait for vote persistence.
///
/// Implementations must reject a second vote for the same
/// `(poll_id, voter_id)` with `AlreadyVoted`, even under concurrent appends.
/// Poll existence and option legality are checked before append, not here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteRepository: Send + Sync {
    async fn append(&self, vote: Vote) -> PollResult<Vote>;

    async fn find_by_poll(&self, poll_id: Uuid) -> PollResult<Vec<Vote>>;

    /// Votes for any of the given polls, fetched in one round trip
    async fn find_by_polls(&self, poll_ids: &[Uuid]) -> PollResult<Vec<Vote>>;

    /// 0 or 1 votes
    async fn find_by_poll_and_voter(&self, poll_id: Uuid, voter_id: &str)
    -> PollResult<Vec<Vote>>;

    /// Returns the number of votes removed
    async fn delete_by_poll(&self, poll_id: Uuid) -> PollResult<u64>;

    /// Returns whether a vote was removed
    async fn delete_one(&self, vote_id: Uuid) -> PollResult<bool>;

    /// Votes across all polls
    async fn count(&self) -> PollResult<u64>;
}

/// In-memory vote store.
///
/// The duplicate check and the insert share one write lock, which gives the
/// same guarantee as a unique index on `(poll_id, voter_id)`.
#[derive(Clone, Default)]
pub struct InMemoryVoteRepository {
    votes: Arc<RwLock<Vec<Vote>>>,
}

impl InMemoryVoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoteRepository for InMemoryVoteRepository {
    async fn append(&self, vote: Vote) -> PollResult<Vote> {
        let mut votes = self.votes.write().await;

        if let Some(existing) = votes
            .iter()
            .find(|v| v.poll_id == vote.poll_id && v.voter_id == vote.voter_id)
        {
            return Err(PollError::AlreadyVoted {
                option: existing.option.clone(),
            });
        }
        votes.push(vote.clone());

        tracing::debug!(vote_id = %vote.id, poll_id = %vote.poll_id, "Appended vote");
        Ok(vote)
    }

    async fn find_by_poll(&self, poll_id: Uuid) -> PollResult<Vec<Vote>> {
        let votes = self.votes.read().await;
        Ok(votes.iter().filter(|v| v.poll_id == poll_id).cloned().collect())
    }

    async fn find_by_polls(&self, poll_ids: &[Uuid]) -> PollResult<Vec<Vote>> {
        let votes = self.votes.read().await;
        Ok(votes
            .iter()
            .filter(|v| poll_ids.contains(&v.poll_id))
            .cloned()
            .collect())
    }

    async fn find_by_poll_and_voter(
        &self,
        poll_id: Uuid,
        voter_id: &str,
    ) -> PollResult<Vec<Vote>> {
        let votes = self.votes.read().await;
        Ok(votes
            .iter()
            .filter(|v| v.poll_id == poll_id && v.voter_id == voter_id)
            .cloned()
            .collect())
    }

    async fn delete_by_poll(&self, poll_id: Uuid) -> PollResult<u64> {
        let mut votes = self.votes.write().await;
        let before = votes.len();
        votes.retain(|v| v.poll_id != poll_id);
        let removed = (before - votes.len()) as u64;

        tracing::info!(poll_id = %poll_id, removed, "Deleted votes for poll");
        Ok(removed)
    }

    async fn delete_one(&self, vote_id: Uuid) -> PollResult<bool> {
        let mut votes = self.votes.write().await;
        let before = votes.len();
        votes.retain(|v| v.id != vote_id);
        Ok(votes.len() < before)
    }

    async fn count(&self) -> PollResult<u64> {
        Ok(self.votes.read().await.len() as u64)
    }
}
