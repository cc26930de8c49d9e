//! Database library providing the MongoDB connector used by the polls service
//!
//! The polls domain treats MongoDB as an opaque collection store: two named
//! collections (`polls`, `votes`) accessed by filter-based insert/query/update/delete.
//! This crate only owns getting a healthy `Client` for it.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB connector, configuration and health checks
//! - `config` - `core_config::FromEnv` support for `MongoConfig`
//! - `all` - All features
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "polls");
//! let client = connect_from_config_with_retry(&config, None).await?;
//! let db = client.database(config.database());
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::{DatabaseError, DatabaseResult};
