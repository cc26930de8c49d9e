//! Application state management.
//!
//! The shared state passed to route builders and the readiness handler:
//! - Configuration
//! - The storage backend the poll and vote stores live in

use domain_polls::{InMemoryPollRepository, InMemoryVoteRepository, create_indexes};
use mongodb::{Client, Database};
use tracing::info;

use crate::config::{Config, StorageBackend};

/// Connected storage, one variant per [`StorageBackend`]
#[derive(Clone)]
pub enum Storage {
    Mongo {
        /// Cloneable, shares the underlying connection pool
        client: Client,
        db: Database,
    },
    Memory {
        polls: InMemoryPollRepository,
        votes: InMemoryVoteRepository,
    },
}

impl Storage {
    /// Connect (with retry) and prepare indexes for the configured backend
    pub async fn connect(config: &Config) -> eyre::Result<Self> {
        match config.storage {
            StorageBackend::Mongodb => {
                let mongo_config = config
                    .mongodb
                    .as_ref()
                    .ok_or_else(|| eyre::eyre!("MongoDB backend selected without MongoDB config"))?;

                info!("Connecting to MongoDB at {}", mongo_config.redacted_url());
                let client =
                    database::mongodb::connect_from_config_with_retry(mongo_config, None).await?;
                let db = client.database(mongo_config.database());

                create_indexes(&db)
                    .await
                    .map_err(|e| eyre::eyre!("Failed to create poll indexes: {}", e))?;

                info!(
                    "Successfully connected to MongoDB database: {}",
                    mongo_config.database()
                );
                Ok(Storage::Mongo { client, db })
            }
            StorageBackend::Memory => {
                info!("Using in-memory storage; data is lost on restart");
                Ok(Storage::memory())
            }
        }
    }

    pub fn memory() -> Self {
        Storage::Memory {
            polls: InMemoryPollRepository::new(),
            votes: InMemoryVoteRepository::new(),
        }
    }

    /// Close connections during graceful shutdown
    pub async fn shutdown(self) {
        if let Storage::Mongo { client, .. } = self {
            info!("Shutting down: closing MongoDB connections");
            client.shutdown().await;
            info!("MongoDB connection closed successfully");
        }
    }
}

/// Shared application state.
///
/// Cloned for each handler (inexpensive Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: Config,
    pub storage: Storage,
}
