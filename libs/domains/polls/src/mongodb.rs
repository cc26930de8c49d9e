//! MongoDB implementations of PollRepository and VoteRepository
//!
//! Records are stored through document structs with string ids and BSON
//! datetimes, so the collections stay readable from the mongo shell.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc},
    options::{FindOptions, IndexOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{PollError, PollResult, is_duplicate_key};
use crate::ledger::VoteRepository;
use crate::models::{Poll, PollFilter, PollStatus, Vote};
use crate::registry::PollRepository;

pub const POLLS_COLLECTION: &str = "polls";
pub const VOTES_COLLECTION: &str = "votes";

/// Name of the unique `(poll_id, voter_id)` index
pub const VOTER_UNIQUE_INDEX: &str = "poll_voter_unique";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub category: String,
    pub status: PollStatus,
    pub created_at: bson::DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<bson::DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub poll_id: String,
    pub voter_id: String,
    pub option: String,
    pub voted_at: bson::DateTime,
}

fn to_bson_datetime(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_datetime(dt: bson::DateTime) -> PollResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(dt.timestamp_millis())
        .ok_or_else(|| PollError::Internal(format!("Timestamp out of range: {}", dt)))
}

fn parse_id(id: &str) -> PollResult<Uuid> {
    Uuid::parse_str(id).map_err(|e| PollError::Internal(format!("Invalid stored id {}: {}", id, e)))
}

impl From<&Poll> for PollDocument {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id.to_string(),
            question: poll.question.clone(),
            options: poll.options.clone(),
            category: poll.category.clone(),
            status: poll.status,
            created_at: to_bson_datetime(poll.created_at),
            closed_at: poll.closed_at.map(to_bson_datetime),
        }
    }
}

impl TryFrom<PollDocument> for Poll {
    type Error = PollError;

    fn try_from(doc: PollDocument) -> PollResult<Self> {
        Ok(Self {
            id: parse_id(&doc.id)?,
            question: doc.question,
            options: doc.options,
            category: doc.category,
            status: doc.status,
            created_at: from_bson_datetime(doc.created_at)?,
            closed_at: doc.closed_at.map(from_bson_datetime).transpose()?,
        })
    }
}

impl From<&Vote> for VoteDocument {
    fn from(vote: &Vote) -> Self {
        Self {
            id: vote.id.to_string(),
            poll_id: vote.poll_id.to_string(),
            voter_id: vote.voter_id.clone(),
            option: vote.option.clone(),
            voted_at: to_bson_datetime(vote.voted_at),
        }
    }
}

impl TryFrom<VoteDocument> for Vote {
    type Error = PollError;

    fn try_from(doc: VoteDocument) -> PollResult<Self> {
        Ok(Self {
            id: parse_id(&doc.id)?,
            poll_id: parse_id(&doc.poll_id)?,
            voter_id: doc.voter_id,
            option: doc.option,
            voted_at: from_bson_datetime(doc.voted_at)?,
        })
    }
}

/// Create the indexes both repositories rely on.
///
/// Idempotent; call once at startup before serving requests.
/// - `votes`: unique `{poll_id, voter_id}`, plus `{poll_id}`
/// - `polls`: `{category, created_at desc}`
#[instrument(skip(db), fields(database = %db.name()))]
pub async fn create_indexes(db: &Database) -> PollResult<()> {
    let votes = db.collection::<VoteDocument>(VOTES_COLLECTION);
    votes
        .create_indexes([
            IndexModel::builder()
                .keys(doc! { "poll_id": 1, "voter_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(VOTER_UNIQUE_INDEX.to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder().keys(doc! { "poll_id": 1 }).build(),
        ])
        .await?;

    let polls = db.collection::<PollDocument>(POLLS_COLLECTION);
    polls
        .create_index(
            IndexModel::builder()
                .keys(doc! { "category": 1, "created_at": -1 })
                .build(),
        )
        .await?;

    tracing::info!("Poll and vote indexes ready");
    Ok(())
}

/// MongoDB implementation of the PollRepository
pub struct MongoPollRepository {
    collection: Collection<PollDocument>,
}

impl MongoPollRepository {
    /// ```ignore
    /// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
    /// let repo = MongoPollRepository::new(client.database("polls"));
    /// ```
    pub fn new(db: Database) -> Self {
        Self::with_collection(db, POLLS_COLLECTION)
    }

    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<PollDocument>(collection_name),
        }
    }

    pub fn collection(&self) -> &Collection<PollDocument> {
        &self.collection
    }

    fn build_filter(filter: &PollFilter) -> Document {
        let mut doc = doc! {};

        if let Some(ref category) = filter.category {
            doc.insert("category", category.as_str());
        }

        if let Some(status) = filter.status {
            doc.insert("status", status.to_string());
        }

        doc
    }
}

#[async_trait]
impl PollRepository for MongoPollRepository {
    #[instrument(skip(self, poll), fields(poll_id = %poll.id))]
    async fn insert(&self, poll: Poll) -> PollResult<Poll> {
        self.collection.insert_one(PollDocument::from(&poll)).await?;

        tracing::info!(poll_id = %poll.id, "Poll created successfully");
        Ok(poll)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> PollResult<Poll> {
        self.collection
            .find_one(doc! { "_id": id.to_string() })
            .await?
            .ok_or(PollError::NotFound(id))?
            .try_into()
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: PollFilter) -> PollResult<Vec<Poll>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();

        let cursor = self
            .collection
            .find(Self::build_filter(&filter))
            .with_options(options)
            .await?;
        let docs: Vec<PollDocument> = cursor.try_collect().await?;

        docs.into_iter().map(Poll::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn close(&self, id: Uuid, closed_at: DateTime<Utc>) -> PollResult<Poll> {
        // Only an active poll matches, so concurrent closes cannot both succeed
        let filter = doc! {
            "_id": id.to_string(),
            "status": PollStatus::Active.to_string(),
        };
        let update = doc! {
            "$set": {
                "status": PollStatus::Closed.to_string(),
                "closed_at": to_bson_datetime(closed_at),
            }
        };

        let updated = self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;

        match updated {
            Some(doc) => {
                tracing::info!(poll_id = %id, "Poll closed successfully");
                doc.try_into()
            }
            // Distinguish a missing poll from one that is already closed
            None => {
                self.get(id).await?;
                Err(PollError::AlreadyClosed(id))
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> PollResult<()> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id.to_string() })
            .await?;

        if result.deleted_count == 0 {
            return Err(PollError::NotFound(id));
        }

        tracing::info!(poll_id = %id, "Poll deleted successfully");
        Ok(())
    }
}

/// MongoDB implementation of the VoteRepository.
///
/// Duplicate votes are rejected by the unique index from [`create_indexes`].
pub struct MongoVoteRepository {
    collection: Collection<VoteDocument>,
}

impl MongoVoteRepository {
    pub fn new(db: Database) -> Self {
        Self::with_collection(db, VOTES_COLLECTION)
    }

    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<VoteDocument>(collection_name),
        }
    }

    pub fn collection(&self) -> &Collection<VoteDocument> {
        &self.collection
    }

    async fn find(&self, filter: Document) -> PollResult<Vec<Vote>> {
        let cursor = self.collection.find(filter).await?;
        let docs: Vec<VoteDocument> = cursor.try_collect().await?;
        docs.into_iter().map(Vote::try_from).collect()
    }
}

#[async_trait]
impl VoteRepository for MongoVoteRepository {
    #[instrument(skip(self, vote), fields(poll_id = %vote.poll_id, voter_id = %vote.voter_id))]
    async fn append(&self, vote: Vote) -> PollResult<Vote> {
        match self.collection.insert_one(VoteDocument::from(&vote)).await {
            Ok(_) => Ok(vote),
            Err(e) if is_duplicate_key(&e) => {
                let existing = self
                    .collection
                    .find_one(doc! {
                        "poll_id": vote.poll_id.to_string(),
                        "voter_id": vote.voter_id.as_str(),
                    })
                    .await?;

                match existing {
                    Some(existing) => Err(PollError::AlreadyVoted {
                        option: existing.option,
                    }),
                    // The conflicting vote was removed between insert and lookup
                    None => Err(PollError::Database(e.to_string())),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_poll(&self, poll_id: Uuid) -> PollResult<Vec<Vote>> {
        self.find(doc! { "poll_id": poll_id.to_string() }).await
    }

    #[instrument(skip(self, poll_ids), fields(polls = poll_ids.len()))]
    async fn find_by_polls(&self, poll_ids: &[Uuid]) -> PollResult<Vec<Vote>> {
        if poll_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = poll_ids.iter().map(Uuid::to_string).collect();
        self.find(doc! { "poll_id": { "$in": ids } }).await
    }

    #[instrument(skip(self))]
    async fn find_by_poll_and_voter(
        &self,
        poll_id: Uuid,
        voter_id: &str,
    ) -> PollResult<Vec<Vote>> {
        self.find(doc! { "poll_id": poll_id.to_string(), "voter_id": voter_id })
            .await
    }

    #[instrument(skip(self))]
    async fn delete_by_poll(&self, poll_id: Uuid) -> PollResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "poll_id": poll_id.to_string() })
            .await?;

        tracing::info!(poll_id = %poll_id, removed = result.deleted_count, "Votes deleted");
        Ok(result.deleted_count)
    }

    #[instrument(skip(self))]
    async fn delete_one(&self, vote_id: Uuid) -> PollResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": vote_id.to_string() })
            .await?;
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> PollResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}
