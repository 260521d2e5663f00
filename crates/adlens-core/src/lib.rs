use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod records;
pub mod roster;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{BrandNode, ProductRef, Segment, SiteNode, StatEntry, StatRecord};
pub use roster::{load_roster, PolicyToggles, RosterFile, TrackedBrand};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read roster file {path}: {source}")]
    RosterIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse roster file: {0}")]
    RosterParse(#[from] serde_yaml::Error),

    #[error("invalid roster: {0}")]
    Validation(String),
}
