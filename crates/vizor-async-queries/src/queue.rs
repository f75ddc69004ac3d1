//! Worker task queue interface.

use crate::error::AsyncQueryResult;
use async_trait::async_trait;
use serde_json::Value;

/// Task that loads chart data into the results cache.
pub const LOAD_CHART_DATA_TASK: &str = "load_chart_data_into_cache";
/// Task that loads legacy explore JSON into the results cache.
pub const LOAD_EXPLORE_JSON_TASK: &str = "load_explore_json_into_cache";

/// Queue the workers consume tasks from.
///
/// Implementations only enqueue; execution happens in a separate worker fleet
/// which reports progress back through `update_job`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues `task` with positional `args`, returning the queued task id.
    async fn send_task(&self, task: &str, args: Vec<Value>) -> AsyncQueryResult<String>;
}
