use thiserror::Error;

/// Startup failures: configuration, database connectivity, completion client.
#[derive(Error, Debug)]
pub enum VidstatError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Completion client error: {0}")]
    Translation(#[from] crate::translator::TranslationError),
}
