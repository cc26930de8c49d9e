//! Poll Registry: ownership of poll definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::error::{PollError, PollResult};
use crate::models::{CreatePoll, Poll, PollFilter, PollStatus};

/// Validate and normalize creation input into a new active poll.
///
/// Every [`PollRepository::insert`] caller goes through this, so stored polls
/// always satisfy the question/option rules.
pub fn new_poll(input: CreatePoll) -> PollResult<Poll> {
    let input = input.normalized();
    input.validate()?;
    Ok(Poll::new(input))
}

/// Repository trait for poll persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PollRepository: Send + Sync {
    /// Store a poll built by [`new_poll`]
    async fn insert(&self, poll: Poll) -> PollResult<Poll>;

    /// Fails with `NotFound` when absent
    async fn get(&self, id: Uuid) -> PollResult<Poll>;

    /// Polls matching the filter, newest first
    async fn list(&self, filter: PollFilter) -> PollResult<Vec<Poll>>;

    /// Move an active poll to closed.
    ///
    /// `NotFound` when absent, `AlreadyClosed` when it is not active.
    async fn close(&self, id: Uuid, closed_at: DateTime<Utc>) -> PollResult<Poll>;

    /// Remove the poll record only; votes are the caller's concern
    async fn delete(&self, id: Uuid) -> PollResult<()>;
}

/// In-memory poll store for tests and database-less local runs
#[derive(Clone, Default)]
pub struct InMemoryPollRepository {
    polls: Arc<RwLock<HashMap<Uuid, Poll>>>,
}

impl InMemoryPollRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollRepository for InMemoryPollRepository {
    async fn insert(&self, poll: Poll) -> PollResult<Poll> {
        let mut polls = self.polls.write().await;
        if polls.contains_key(&poll.id) {
            return Err(PollError::Internal(format!("Duplicate poll id {}", poll.id)));
        }
        polls.insert(poll.id, poll.clone());

        tracing::info!(poll_id = %poll.id, "Created poll");
        Ok(poll)
    }

    async fn get(&self, id: Uuid) -> PollResult<Poll> {
        let polls = self.polls.read().await;
        polls.get(&id).cloned().ok_or(PollError::NotFound(id))
    }

    async fn list(&self, filter: PollFilter) -> PollResult<Vec<Poll>> {
        let polls = self.polls.read().await;

        let mut result: Vec<Poll> = polls
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        // v7 ids are time ordered, which breaks ties on equal timestamps
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn close(&self, id: Uuid, closed_at: DateTime<Utc>) -> PollResult<Poll> {
        let mut polls = self.polls.write().await;
        let poll = polls.get_mut(&id).ok_or(PollError::NotFound(id))?;

        if poll.status != PollStatus::Active {
            return Err(PollError::AlreadyClosed(id));
        }
        poll.close(closed_at);

        tracing::info!(poll_id = %id, "Closed poll");
        Ok(poll.clone())
    }

    async fn delete(&self, id: Uuid) -> PollResult<()> {
        let mut polls = self.polls.write().await;
        polls.remove(&id).ok_or(PollError::NotFound(id))?;

        tracing::info!(poll_id = %id, "Deleted poll");
        Ok(())
    }
}
