//! Polls Domain
//!
//! Poll creation, one-vote-per-voter ballots and live result aggregation,
//! backed by MongoDB or by in-memory stores.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Query facade: composes the pieces below
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┬─────────────┐
//! │  Registry   │   Ledger    │  ← Poll definitions / accepted votes
//! └──────┬──────┴──────┬──────┘
//!        │             │
//! ┌──────▼─────────────▼──────┐
//! │          Engine           │  ← Pure tally, percentages, vote gate
//! └───────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_polls::{
//!     handlers,
//!     mongodb::{MongoPollRepository, MongoVoteRepository, create_indexes},
//!     service::PollService,
//! };
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("polls");
//! create_indexes(&db).await?;
//!
//! let service = PollService::new(
//!     MongoPollRepository::new(db.clone()),
//!     MongoVoteRepository::new(db),
//! );
//!
//! let router = handlers::router(service);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod mongodb;
pub mod registry;
pub mod service;

pub use error::{ErrorKind, PollError, PollResult};
pub use handlers::ApiDoc;
pub use ledger::{InMemoryVoteRepository, VoteRepository};
pub use models::{
    CastVote, CategoryCount, CreatePoll, DeleteSummary, Poll, PollFilter, PollStats, PollStatus,
    PollWithResults, Tally, Vote, VoteOutcome, VoteResults,
};
pub use crate::mongodb::{MongoPollRepository, MongoVoteRepository, create_indexes};
pub use registry::{InMemoryPollRepository, PollRepository};
pub use service::PollService;
