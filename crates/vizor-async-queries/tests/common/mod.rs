//! Common test infrastructure for async query integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use vizor_async_queries::{AsyncQueryManager, AsyncQueryResult, TaskQueue};
use vizor_cache::InMemoryStreamBackend;
use vizor_config::{AsyncQueriesConfig, SameSitePolicy};

pub const SECRET: &str = "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";
pub const COOKIE_NAME: &str = "superset_async_jwt";

/// A task captured by [`RecordingQueue`].
#[derive(Debug, Clone)]
pub struct SentTask {
    pub task: String,
    pub args: Vec<Value>,
}

/// Task queue that records what it is sent.
#[derive(Default)]
pub struct RecordingQueue {
    sent: Mutex<Vec<SentTask>>,
}

impl RecordingQueue {
    pub fn sent(&self) -> Vec<SentTask> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn send_task(&self, task: &str, args: Vec<Value>) -> AsyncQueryResult<String> {
        let mut sent = self.sent.lock();
        sent.push(SentTask {
            task: task.to_string(),
            args,
        });
        Ok(format!("task-{}", sent.len()))
    }
}

/// A manager wired to in-process components.
pub struct TestHarness {
    pub manager: Arc<AsyncQueryManager>,
    pub backend: Arc<InMemoryStreamBackend>,
    pub queue: Arc<RecordingQueue>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: AsyncQueriesConfig) -> Self {
        let backend = Arc::new(InMemoryStreamBackend::new());
        let queue = Arc::new(RecordingQueue::default());
        let manager = AsyncQueryManager::with_components(config, backend.clone(), queue.clone())
            .expect("Failed to build manager");

        Self {
            manager: Arc::new(manager),
            backend,
            queue,
        }
    }
}

/// Configuration used across the scenarios.
pub fn config() -> AsyncQueriesConfig {
    AsyncQueriesConfig {
        jwt_secret: SECRET.to_string(),
        jwt_cookie_name: COOKIE_NAME.to_string(),
        jwt_cookie_samesite: Some(SameSitePolicy::Lax),
        ..AsyncQueriesConfig::default()
    }
}
