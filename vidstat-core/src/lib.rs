pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod guard;
pub mod models;
pub mod schema;
pub mod translator;

pub use config::VidstatConfig;
pub use error::VidstatError;
pub use executor::{execute, ExecutionError, PgExecutor, QueryRunner, Scalar};
pub use guard::{validate, GuardError, SafeQuery};
pub use schema::SCHEMA_DESCRIPTION;
pub use translator::{
    strip_code_fences, translate, CandidateSql, CompletionBackend, OpenAiCompatClient,
    TranslationError,
};
