//! Redis list-backed task queue.

use crate::error::{AsyncQueryError, AsyncQueryResult};
use crate::queue::TaskQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use vizor_config::TaskQueueConfig;

/// Create a Redis connection pool.
pub async fn create_pool(config: &TaskQueueConfig) -> AsyncQueryResult<Pool> {
    info!("Creating Redis connection pool for task queue...");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| AsyncQueryError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| AsyncQueryError::Configuration(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Redis key builder for task queues.
#[derive(Debug, Clone)]
pub struct QueueKeys {
    prefix: String,
}

impl QueueKeys {
    /// Create a new key builder with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// List key for a task.
    pub fn queue(&self, task: &str) -> String {
        format!("{}:queue:{}", self.prefix, task)
    }
}

/// What workers pop off a task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Task id.
    pub id: String,
    /// Task name.
    pub task: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Enqueue time.
    pub created_at: DateTime<Utc>,
}

impl TaskEnvelope {
    /// Wraps `args` for `task` with a fresh id.
    #[must_use]
    pub fn new(task: &str, args: Vec<Value>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            task: task.to_string(),
            args,
            created_at: Utc::now(),
        }
    }
}

/// Task queue pushing envelopes onto per-task Redis lists.
pub struct RedisTaskQueue {
    pool: Pool,
    keys: QueueKeys,
}

impl RedisTaskQueue {
    /// Creates a queue over an existing pool.
    pub fn new(pool: Pool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            keys: QueueKeys::new(key_prefix),
        }
    }

    /// Connects using `config`.
    pub async fn connect(config: &TaskQueueConfig) -> AsyncQueryResult<Self> {
        let pool = create_pool(config).await?;
        Ok(Self::new(pool, &config.key_prefix))
    }

    async fn conn(&self) -> AsyncQueryResult<Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn send_task(&self, task: &str, args: Vec<Value>) -> AsyncQueryResult<String> {
        let envelope = TaskEnvelope::new(task, args);
        let payload = serde_json::to_string(&envelope)?;
        let key = self.keys.queue(task);

        let mut conn = self.conn().await?;
        let _: () = conn.lpush(&key, &payload).await?;

        debug!(task_id = %envelope.id, task = %task, queue = %key, "Enqueued task");

        Ok(envelope.id)
    }
}
