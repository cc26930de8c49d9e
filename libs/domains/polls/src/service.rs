//! Poll Service - the caller-facing facade over registry, ledger and engine

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::engine;
use crate::error::{PollError, PollResult};
use crate::ledger::VoteRepository;
use crate::models::{
    CastVote, CategoryCount, CreatePoll, DeleteSummary, Poll, PollFilter, PollStats,
    PollWithResults, Vote, VoteOutcome, VoteResults,
};
use crate::registry::{self, PollRepository};

/// Poll service composing the poll registry and the vote ledger.
///
/// Both stores are passed in explicitly; the service holds no other state.
pub struct PollService<P: PollRepository, V: VoteRepository> {
    polls: Arc<P>,
    votes: Arc<V>,
}

impl<P: PollRepository, V: VoteRepository> PollService<P, V> {
    pub fn new(polls: P, votes: V) -> Self {
        Self {
            polls: Arc::new(polls),
            votes: Arc::new(votes),
        }
    }

    /// Polls with `total_votes` and `vote_counts`, newest first
    #[instrument(skip(self))]
    pub async fn list_polls(&self, filter: PollFilter) -> PollResult<Vec<PollWithResults>> {
        let polls = self.polls.list(filter).await?;

        let ids: Vec<Uuid> = polls.iter().map(|p| p.id).collect();
        let mut by_poll: HashMap<Uuid, Vec<Vote>> = HashMap::new();
        for vote in self.votes.find_by_polls(&ids).await? {
            by_poll.entry(vote.poll_id).or_default().push(vote);
        }

        let mut results = Vec::with_capacity(polls.len());
        for poll in polls {
            let votes = by_poll.remove(&poll.id).unwrap_or_default();
            let tally = engine::tally(&poll, &votes);
            results.push(PollWithResults {
                poll,
                total_votes: tally.total_votes,
                vote_counts: tally.vote_counts,
                vote_percentages: None,
            });
        }
        Ok(results)
    }

    /// One poll with counts and percentages
    #[instrument(skip(self))]
    pub async fn get_poll(&self, id: Uuid) -> PollResult<PollWithResults> {
        let poll = self.polls.get(id).await?;
        let votes = self.votes.find_by_poll(id).await?;
        let tally = engine::tally(&poll, &votes);
        let percentages = engine::percentages(&tally.vote_counts, tally.total_votes);

        Ok(PollWithResults {
            poll,
            total_votes: tally.total_votes,
            vote_counts: tally.vote_counts,
            vote_percentages: Some(percentages),
        })
    }

    /// Validate, store and return the new poll with a zeroed tally
    #[instrument(skip(self, input), fields(question = %input.question))]
    pub async fn create_poll(&self, input: CreatePoll) -> PollResult<PollWithResults> {
        let poll = self.polls.insert(registry::new_poll(input)?).await?;
        let tally = engine::tally(&poll, &[]);

        Ok(PollWithResults {
            poll,
            total_votes: tally.total_votes,
            vote_counts: tally.vote_counts,
            vote_percentages: None,
        })
    }

    /// Accept a vote and return the updated results.
    ///
    /// The ledger enforces one vote per voter even when two requests pass the
    /// engine check at the same time.
    #[instrument(skip(self, input), fields(voter_id = %input.voter_id))]
    pub async fn vote(&self, poll_id: Uuid, input: CastVote) -> PollResult<VoteOutcome> {
        let input = input.normalized();
        input.validate()?;

        let poll = self.polls.get(poll_id).await?;
        let existing = self
            .votes
            .find_by_poll_and_voter(poll_id, &input.voter_id)
            .await?;

        let vote = engine::submit_vote(
            &poll,
            &existing,
            &input.option,
            &input.voter_id,
            Utc::now(),
        )?;
        let vote = self.votes.append(vote).await?;

        let votes = self.votes.find_by_poll(poll_id).await?;
        let tally = engine::tally(&poll, &votes);
        let vote_percentages = engine::percentages(&tally.vote_counts, tally.total_votes);

        tracing::info!(vote_id = %vote.id, option = %vote.option, "Vote recorded");
        Ok(VoteOutcome {
            vote,
            results: VoteResults {
                total_votes: tally.total_votes,
                vote_counts: tally.vote_counts,
                vote_percentages,
            },
        })
    }

    #[instrument(skip(self))]
    pub async fn close_poll(&self, id: Uuid) -> PollResult<Poll> {
        self.polls.close(id, Utc::now()).await
    }

    /// Delete the poll's votes, then the poll.
    ///
    /// If the poll record cannot be removed after its votes were, the error is
    /// [`PollError::PartialDelete`] carrying the number of votes removed.
    #[instrument(skip(self))]
    pub async fn delete_poll(&self, id: Uuid) -> PollResult<DeleteSummary> {
        self.polls.get(id).await?;

        let votes_removed = self.votes.delete_by_poll(id).await?;

        match self.polls.delete(id).await {
            // A concurrent delete already removed the record
            Ok(()) | Err(PollError::NotFound(_)) => Ok(DeleteSummary {
                poll_id: id,
                votes_removed,
            }),
            Err(e) => {
                tracing::error!(
                    poll_id = %id,
                    votes_removed,
                    error = %e,
                    "Votes removed but poll record could not be deleted"
                );
                Err(PollError::PartialDelete {
                    poll_id: id,
                    votes_removed,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Category counts plus the total number of polls
    #[instrument(skip(self))]
    pub async fn categories(&self) -> PollResult<(Vec<CategoryCount>, u64)> {
        let polls = self.polls.list(PollFilter::default()).await?;
        Ok((engine::category_summary(&polls), polls.len() as u64))
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> PollResult<PollStats> {
        let polls = self.polls.list(PollFilter::default()).await?;
        let total_votes = self.votes.count().await?;
        Ok(engine::poll_stats(&polls, total_votes))
    }
}
