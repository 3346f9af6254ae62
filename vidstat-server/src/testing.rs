//! Test doubles for the completion endpoint and the database.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vidstat_core::{
    CompletionBackend, ExecutionError, QueryRunner, SafeQuery, Scalar, TranslationError,
};

use crate::handler::AppContext;

/// Completion backend returning a canned answer, or `EmptyCompletion` when
/// constructed with `None`.
pub struct FakeCompletion {
    answer: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeCompletion {
    pub fn answering(sql: &str) -> Self {
        Self {
            answer: Some(sql.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionBackend for FakeCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().ok_or(TranslationError::EmptyCompletion)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Query runner recording every query it receives.
pub struct FakeRunner {
    result: Option<Scalar>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn returning(value: Scalar) -> Self {
        Self {
            result: Some(value),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryRunner for FakeRunner {
    async fn fetch_scalar(&self, query: &SafeQuery) -> Result<Scalar, ExecutionError> {
        self.queries.lock().unwrap().push(query.as_str().to_string());
        self.result
            .ok_or(ExecutionError::Database(sqlx::Error::PoolTimedOut))
    }
}

pub fn context(completion: Arc<FakeCompletion>, runner: Arc<FakeRunner>) -> AppContext {
    AppContext::new(completion, runner, vidstat_core::SCHEMA_DESCRIPTION)
}
