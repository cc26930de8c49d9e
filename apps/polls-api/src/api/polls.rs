//! Polls API routes
//!
//! Wires the polls domain to HTTP routes over the configured storage.

use axum::Router;
use domain_polls::{MongoPollRepository, MongoVoteRepository, PollService, handlers};

use crate::state::{AppState, Storage};

/// Create polls router
pub fn router(state: &AppState) -> Router {
    match &state.storage {
        Storage::Mongo { db, .. } => handlers::router(PollService::new(
            MongoPollRepository::new(db.clone()),
            MongoVoteRepository::new(db.clone()),
        )),
        Storage::Memory { polls, votes } => {
            handlers::router(PollService::new(polls.clone(), votes.clone()))
        }
    }
}
