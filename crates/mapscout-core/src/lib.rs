mod app_config;
mod config;
pub mod places;
pub mod search;

pub use app_config::{AppConfig, Environment, DEFAULT_USER_AGENTS};
pub use config::{load_app_config, load_app_config_from_env, MAX_RUN_DEADLINE_SECS};
pub use places::{Coordinates, OpeningHours, PlaceRecord, ScrapeResponse};
pub use search::{ExtractionDepth, SearchRequest, MAX_PLACES_LIMIT};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("max_places must be between 1 and {max}, got {got}")]
    MaxPlacesOutOfRange { got: u32, max: u32 },

    #[error("invalid language tag: {0:?}")]
    InvalidLanguage(String),
}
