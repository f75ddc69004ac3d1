//! # Vizor Async Queries
//!
//! Asynchronous chart queries with per-channel event streams.
//!
//! ```text
//!  browser ──cookie──▶ web ──send_task──▶ worker queue ──▶ worker
//!     ▲                 │                                    │
//!     │            read_events                          update_job
//!     │                 ▼                                    ▼
//!     └──── poll ── <prefix><channel>  ◀──── XADD ────  stream backend
//!                   <prefix>full (firehose)
//! ```
//!
//! Each browser session is bound to a channel through a signed cookie. Jobs
//! are dispatched to workers, which publish status changes to the channel's
//! stream and to a firehose stream shared by every channel. Clients poll
//! their channel for events after the last id they have seen.

pub mod error;
pub mod factory;
pub mod job;
pub mod manager;
pub mod metrics;
pub mod middleware;
pub mod queue;
pub mod redis_queue;
pub mod session;
pub mod stream_id;
pub mod token;

pub use error::{AsyncQueryError, AsyncQueryResult};
pub use factory::{async_query_manager, AsyncQueryManagerFactory, DEFAULT_MANAGER_CLASS};
pub use job::{build_job_metadata, Event, JobMetadata, JobStatus};
pub use manager::{
    AsyncQueryManager, AsyncQueryManagerInterface, ManagerContext, MAX_EVENT_COUNT,
};
pub use metrics::{register_metrics, AsyncQueryMetrics};
pub use middleware::async_channel_middleware;
pub use queue::{TaskQueue, LOAD_CHART_DATA_TASK, LOAD_EXPLORE_JSON_TASK};
pub use redis_queue::RedisTaskQueue;
pub use session::{CurrentUser, Session, SESSION_CHANNEL_KEY, SESSION_USER_KEY};
pub use stream_id::increment_id;
pub use token::{ChannelClaims, ChannelTokenCodec};
