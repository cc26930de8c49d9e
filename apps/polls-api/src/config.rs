use core_config::{AppInfo, FromEnv, app_info, env_parse_or, server::ServerConfig};
use strum::{Display, EnumString};

// Import MongoDB config from the database library
use database::mongodb::MongoConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Where polls and votes are kept, from `POLLS_STORAGE`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    Mongodb,
    /// Process-local stores, lost on restart
    Memory,
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub storage: StorageBackend,
    /// Only loaded for the MongoDB backend
    pub mongodb: Option<MongoConfig>,
    pub server: ServerConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let app = app_info!();
        let environment = Environment::from_env();
        let storage = env_parse_or("POLLS_STORAGE", StorageBackend::Mongodb)?;
        let mongodb = match storage {
            StorageBackend::Mongodb => {
                let mongodb = MongoConfig::from_env()?;
                // MONGODB_APP_NAME wins; otherwise the server sees the package name
                Some(match mongodb.app_name {
                    Some(_) => mongodb,
                    None => mongodb.with_app_name(app.name),
                })
            }
            StorageBackend::Memory => None,
        };
        let server = ServerConfig::from_env()?;

        Ok(Self {
            app,
            storage,
            mongodb,
            server,
            environment,
        })
    }
}
