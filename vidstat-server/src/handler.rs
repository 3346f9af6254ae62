//! Conversation handler: question in, one reply out.
//!
//! Every message runs translate, then validate, then execute, with no state
//! carried between messages. Failures collapse into two user-facing replies;
//! the detail goes to the log.

use std::sync::Arc;
use thiserror::Error;
use vidstat_core::{
    translate, validate, CompletionBackend, ExecutionError, GuardError, OpenAiCompatClient,
    PgExecutor, QueryRunner, Scalar, TranslationError, VidstatConfig, VidstatError,
    SCHEMA_DESCRIPTION,
};

pub const GREETING: &str = "Привет! Я готов отвечать на вопросы";
pub const NOT_UNDERSTOOD: &str = "Не удалось понять запрос";
pub const EXECUTION_FAILED: &str = "Ошибка выполнения запроса";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("Query rejected: {0}")]
    Guard(#[from] GuardError),

    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

/// What happened to one question.
#[derive(Debug)]
pub struct QueryIntent {
    pub text: String,
    /// Candidate SQL, once translation succeeded.
    pub sql: Option<String>,
    pub outcome: Result<Scalar, PipelineError>,
}

impl QueryIntent {
    pub fn reply(&self) -> String {
        match &self.outcome {
            Ok(value) => value.to_string(),
            Err(PipelineError::Execution(_)) => EXECUTION_FAILED.to_string(),
            Err(_) => NOT_UNDERSTOOD.to_string(),
        }
    }

    pub fn is_answered(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Collaborators shared by every transport. Read-only after construction.
pub struct AppContext {
    completion: Arc<dyn CompletionBackend>,
    runner: Arc<dyn QueryRunner>,
    schema_description: String,
}

impl AppContext {
    pub fn new(
        completion: Arc<dyn CompletionBackend>,
        runner: Arc<dyn QueryRunner>,
        schema_description: impl Into<String>,
    ) -> Self {
        Self {
            completion,
            runner,
            schema_description: schema_description.into(),
        }
    }

    /// Production wiring: OpenAI-compatible client plus the pooled executor.
    pub fn from_config(config: &VidstatConfig, pool: sqlx::PgPool) -> Result<Self, VidstatError> {
        let client = OpenAiCompatClient::new(config.completion.clone(), None)?;
        tracing::info!(
            backend = client.name(),
            model = %config.completion.model,
            "Completion client ready"
        );

        let runner = PgExecutor::new(pool, config.database.statement_timeout_ms);
        Ok(Self::new(
            Arc::new(client),
            Arc::new(runner),
            SCHEMA_DESCRIPTION,
        ))
    }

    /// Run the full pipeline for one question.
    pub async fn process(&self, text: &str) -> QueryIntent {
        let mut intent = QueryIntent {
            text: text.to_string(),
            sql: None,
            outcome: Ok(Scalar::NEUTRAL),
        };

        intent.outcome = self.run(text, &mut intent.sql).await;
        log_intent(&intent);
        intent
    }

    /// Reply text for one question.
    pub async fn on_message(&self, text: &str) -> String {
        self.process(text).await.reply()
    }

    async fn run(&self, text: &str, sql: &mut Option<String>) -> Result<Scalar, PipelineError> {
        let candidate = translate(self.completion.as_ref(), text, &self.schema_description).await?;
        *sql = Some(candidate.as_str().to_string());

        let query = validate(candidate.as_str())?;
        Ok(self.runner.fetch_scalar(&query).await?)
    }
}

fn log_intent(intent: &QueryIntent) {
    let sql = intent.sql.as_deref().unwrap_or("");
    match &intent.outcome {
        Ok(value) => tracing::info!(
            question = %intent.text,
            sql = sql,
            result = %value,
            "Question answered"
        ),
        Err(PipelineError::Translation(e)) => tracing::warn!(
            question = %intent.text,
            error = %e,
            "Translation failed"
        ),
        Err(PipelineError::Guard(e)) => tracing::warn!(
            question = %intent.text,
            sql = sql,
            reason = e.reason_code(),
            "Generated SQL rejected"
        ),
        Err(PipelineError::Execution(e)) => tracing::error!(
            question = %intent.text,
            sql = sql,
            error = %e,
            "Query execution failed"
        ),
    }
}
